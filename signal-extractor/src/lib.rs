//! Text signals computed from a post: vocabulary tags, the pain score and
//! free-text keyword frequencies.

pub mod keywords;
pub mod pain_score;
pub mod vocabulary;

pub use keywords::{extract_keywords, keyword_tags, KeywordCount};
pub use pain_score::{pain_score, PainBreakdown};

use painpoint_core::RawPost;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub keywords: Vec<String>,
    pub pain_score: i64,
}

pub fn analyze(raw: &RawPost) -> Signals {
    let body = raw.text.as_deref().unwrap_or("");
    Signals {
        keywords: keyword_tags(&raw.analysis_text()),
        pain_score: pain_score(&raw.title, body, raw.score, raw.comment_count),
    }
}

/// Lowercase with typographic apostrophes folded to ASCII.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase().replace('\u{2019}', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use painpoint_core::{Source, MAX_PAIN_SCORE};

    fn raw(title: &str, text: Option<&str>, score: i64, comments: i64) -> RawPost {
        RawPost {
            source: Source::Reddit,
            source_id: "t3_abc".to_string(),
            subreddit: Some("SaaS".to_string()),
            title: title.to_string(),
            text: text.map(str::to_string),
            url: "https://reddit.com/r/SaaS/comments/abc".to_string(),
            score,
            comment_count: comments,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_analyze_combines_title_and_body() {
        let post = raw(
            "I wish there was a better CRM",
            Some("Our sales team would pay for Slack integration"),
            10,
            3,
        );
        let signals = analyze(&post);

        assert_eq!(signals.keywords, vec!["integration", "sales", "crm", "slack"]);
        // i wish there was, i wish, would pay (1 each) + would pay (2)
        assert_eq!(signals.pain_score, 5);
    }

    #[test]
    fn test_analyze_bounds() {
        let post = raw("", None, 0, 0);
        let signals = analyze(&post);
        assert!(signals.keywords.is_empty());
        assert_eq!(signals.pain_score, 0);

        let loud = raw(
            "Ask HN: take my money?",
            Some("i wish there was, i need, we need, frustrated, annoying, nothing exists, willing to pay, paying for"),
            1000,
            1000,
        );
        assert_eq!(analyze(&loud).pain_score, MAX_PAIN_SCORE);
    }
}
