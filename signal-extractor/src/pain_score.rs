use crate::normalize;
use crate::vocabulary::{HIGH_VALUE_PHRASES, PAIN_PHRASES};
use painpoint_core::MAX_PAIN_SCORE;
use serde::{Deserialize, Serialize};

const PAIN_PHRASE_CAP: i64 = 5;
const HIGH_VALUE_CAP: i64 = 6;

/// Per-component breakdown of a pain score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainBreakdown {
    pub pain_phrases: i64,
    pub high_value_phrases: i64,
    pub comment_bonus: i64,
    pub score_bonus: i64,
    pub question_bonus: i64,
    pub ask_hn_bonus: i64,
}

impl PainBreakdown {
    pub fn compute(title: &str, body: &str, score: i64, comments: i64) -> Self {
        let text = normalize(&format!("{} {}", title, body));
        let title_norm = normalize(title);

        Self {
            pain_phrases: count_distinct(&text, PAIN_PHRASES).min(PAIN_PHRASE_CAP),
            high_value_phrases: (count_distinct(&text, HIGH_VALUE_PHRASES) * 2).min(HIGH_VALUE_CAP),
            comment_bonus: tiered_bonus(comments),
            score_bonus: tiered_bonus_at(score, 50, 200),
            question_bonus: i64::from(title.contains('?')),
            ask_hn_bonus: if title_norm.trim_start().starts_with("ask hn") {
                2
            } else {
                0
            },
        }
    }

    pub fn total(&self) -> i64 {
        let sum = self.pain_phrases
            + self.high_value_phrases
            + self.comment_bonus
            + self.score_bonus
            + self.question_bonus
            + self.ask_hn_bonus;
        sum.clamp(0, MAX_PAIN_SCORE)
    }
}

/// Pain score in `[0, 20]` for a post.
pub fn pain_score(title: &str, body: &str, score: i64, comments: i64) -> i64 {
    PainBreakdown::compute(title, body, score, comments).total()
}

fn count_distinct(text: &str, phrases: &[&str]) -> i64 {
    phrases.iter().filter(|p| text.contains(*p)).count() as i64
}

fn tiered_bonus(comments: i64) -> i64 {
    tiered_bonus_at(comments, 10, 50)
}

// +1 at `low`, +2 more at `high`
fn tiered_bonus_at(value: i64, low: i64, high: i64) -> i64 {
    let mut bonus = 0;
    if value >= low {
        bonus += 1;
    }
    if value >= high {
        bonus += 2;
    }
    bonus
}
