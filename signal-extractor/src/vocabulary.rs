//! Fixed vocabularies the extractors match against. All entries are lowercase.

/// Technology/business tags, in priority order.
pub const TECH_KEYWORDS: &[&str] = &[
    "api",
    "saas",
    "app",
    "tool",
    "software",
    "platform",
    "dashboard",
    "automation",
    "ai",
    "ml",
    "analytics",
    "integration",
    "workflow",
    "database",
    "cloud",
    "mobile",
    "web",
    "startup",
    "product",
    "marketing",
    "sales",
    "crm",
    "erp",
    "fintech",
    "ecommerce",
    "subscription",
    "billing",
    "payment",
    "notification",
    "email",
    "slack",
    "discord",
    "notion",
    "airtable",
    "zapier",
    "stripe",
];

/// Request and complaint phrases, one point each.
pub const PAIN_PHRASES: &[&str] = &[
    "i wish there was",
    "i wish",
    "i need",
    "we need",
    "need a way to",
    "looking for",
    "frustrated",
    "frustrating",
    "annoying",
    "tired of",
    "struggling",
    "hate when",
    "why isn't there",
    "why is there no",
    "is there a tool",
    "is there an app",
    "does anyone know",
    "anyone recommend",
    "can't find",
    "any alternatives to",
    "pain point",
    "waste of time",
    "too expensive",
    "would pay",
    "someone should build",
];

/// Commercial-intent phrases, two points each.
pub const HIGH_VALUE_PHRASES: &[&str] = &[
    "would pay",
    "take my money",
    "no good solution",
    "shut up and take",
    "willing to pay",
    "paying for",
    "nothing exists",
    "doesn't exist",
];

pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "need", "i", "you", "he", "she", "it", "we", "they", "this", "that", "these", "those",
    "what", "which", "who", "whom", "when", "where", "why", "how", "all", "each", "every",
    "both", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own",
    "same", "so", "than", "too", "very", "just", "also", "now", "here", "there", "then", "any",
    "my", "your", "his", "her", "its", "our", "their", "me", "him", "us", "them",
];
