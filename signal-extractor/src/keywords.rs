use crate::normalize;
use crate::vocabulary::{STOP_WORDS, TECH_KEYWORDS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MAX_TAGS: usize = 5;
pub const MAX_FREQUENT_KEYWORDS: usize = 10;

/// Vocabulary tags found in `text`, at most five, in vocabulary order.
pub fn keyword_tags(text: &str) -> Vec<String> {
    let lower = normalize(text);
    TECH_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .take(MAX_TAGS)
        .map(|keyword| keyword.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Most frequent free-text words, stop words and short tokens removed.
///
/// Ties keep the order in which the words first appeared.
pub fn extract_keywords(text: &str) -> Vec<KeywordCount> {
    let lower = text.to_lowercase();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for token in lower.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            first_seen.push(token);
        }
        *count += 1;
    }

    let mut ranked: Vec<KeywordCount> = first_seen
        .into_iter()
        .map(|word| KeywordCount {
            word: word.to_string(),
            count: counts[word],
        })
        .collect();

    // stable sort keeps first-occurrence order for equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(MAX_FREQUENT_KEYWORDS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_in_vocabulary_order() {
        let tags = keyword_tags("Stripe billing for my SaaS API");
        assert_eq!(tags, vec!["api", "saas", "billing", "stripe"]);
    }

    #[test]
    fn test_tags_capped_at_five() {
        let tags = keyword_tags("api saas app tool software platform dashboard");
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags, vec!["api", "saas", "app", "tool", "software"]);
    }

    #[test]
    fn test_tags_are_substrings() {
        // "email" also contains "ai"
        let text = "Looking for an email tool";
        let tags = keyword_tags(text);
        assert_eq!(tags, vec!["tool", "ai", "email"]);
        for tag in &tags {
            assert!(text.to_lowercase().contains(tag.as_str()));
        }
    }

    #[test]
    fn test_no_tags() {
        assert!(keyword_tags("").is_empty());
        assert!(keyword_tags("hello there").is_empty());
    }

    #[test]
    fn test_extract_keywords_counts_and_filters() {
        let text = "Invoicing is painful. Invoicing tools are expensive, and the tools break.";
        let keywords = extract_keywords(text);

        assert_eq!(keywords[0].word, "invoicing");
        assert_eq!(keywords[0].count, 2);
        assert_eq!(keywords[1].word, "tools");
        assert_eq!(keywords[1].count, 2);
        assert!(keywords.iter().all(|k| k.word != "the" && k.word != "is"));
    }

    #[test]
    fn test_extract_keywords_ties_keep_first_occurrence() {
        let keywords = extract_keywords("zebra apple mango apple zebra mango");
        let words: Vec<&str> = keywords.iter().map(|k| k.word.as_str()).collect();
        assert_eq!(words, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_extract_keywords_top_ten() {
        let text = (0..15)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let keywords = extract_keywords(&text);
        assert_eq!(keywords.len(), MAX_FREQUENT_KEYWORDS);
        assert_eq!(keywords[0].word, "word0");
    }

    #[test]
    fn test_extract_keywords_drops_short_tokens() {
        assert!(extract_keywords("ab cd ef").is_empty());
    }
}
