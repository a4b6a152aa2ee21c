use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Posts scoring at or above this are considered pain points.
pub const PAIN_THRESHOLD: i64 = 3;

/// Upper bound of the pain score scale.
pub const MAX_PAIN_SCORE: i64 = 20;

/// Platform a post was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Reddit,
    HackerNews,
    /// Reserved; no adapter exists yet.
    Twitter,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::HackerNews => "hackernews",
            Source::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(Source::Reddit),
            "hackernews" | "hn" => Ok(Source::HackerNews),
            "twitter" => Ok(Source::Twitter),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown source '{other}'"),
            }),
        }
    }
}

/// A post as returned by a source adapter, before any scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub source: Source,
    pub source_id: String,
    pub subreddit: Option<String>,
    pub title: String,
    pub text: Option<String>,
    pub url: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

impl RawPost {
    /// `title + " " + body`, the text every signal is computed over.
    pub fn analysis_text(&self) -> String {
        format!("{} {}", self.title, self.text.as_deref().unwrap_or(""))
    }
}

/// A scored candidate ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub source: Source,
    pub source_id: String,
    pub subreddit: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub score: i64,
    pub comments_count: i64,
    pub keywords: Vec<String>,
    pub pain_score: i64,
    pub source_created_at: DateTime<Utc>,
}

impl NewPost {
    pub fn from_raw(raw: RawPost, keywords: Vec<String>, pain_score: i64) -> Self {
        Self {
            source: raw.source,
            source_id: raw.source_id,
            subreddit: raw.subreddit,
            title: raw.title,
            body: raw.text.filter(|t| !t.trim().is_empty()),
            url: raw.url,
            score: raw.score.max(0),
            comments_count: raw.comment_count.max(0),
            keywords,
            pain_score: pain_score.clamp(0, MAX_PAIN_SCORE),
            source_created_at: raw.created_at,
        }
    }

    pub fn key(&self) -> (Source, &str) {
        (self.source, self.source_id.as_str())
    }
}

/// Canonical stored record ("idea").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub source: Source,
    pub source_id: String,
    pub subreddit: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub score: i64,
    pub comments_count: i64,
    pub keywords: Vec<String>,
    pub pain_score: i64,
    pub source_created_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_pain_point(&self) -> bool {
        self.pain_score >= PAIN_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub keyword: String,
    pub snapshot_date: NaiveDate,
    pub mention_count: i64,
    pub avg_score: f64,
}

/// Alert definition owned by an external collaborator. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub subreddits: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn matches(&self, post: &Post) -> bool {
        self.matches_fields(post.subreddit.as_deref(), &post.title, post.body.as_deref())
    }

    /// Any keyword is a case-insensitive substring of `title + body`, and the
    /// subreddit is in scope when a scope is set.
    pub fn matches_fields(&self, subreddit: Option<&str>, title: &str, body: Option<&str>) -> bool {
        if !self.subreddits.is_empty() {
            let in_scope = subreddit.is_some_and(|sub| {
                self.subreddits
                    .iter()
                    .any(|scope| scope.eq_ignore_ascii_case(sub))
            });
            if !in_scope {
                return false;
            }
        }

        let text = format!("{} {}", title, body.unwrap_or("")).to_lowercase();
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && text.contains(&k))
    }
}

/// Filters for the ideas listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaQuery {
    pub limit: i64,
    pub offset: i64,
    pub source: Option<Source>,
    pub subreddit: Option<String>,
    pub days: Option<i64>,
    pub min_pain_score: Option<i64>,
    pub pain_only: bool,
}

impl Default for IdeaQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            source: None,
            subreddit: None,
            days: None,
            min_pain_score: None,
            pain_only: false,
        }
    }
}

impl IdeaQuery {
    pub const MAX_LIMIT: i64 = 100;

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.limit < 1 || self.limit > Self::MAX_LIMIT {
            return Err(CoreError::InvalidInput {
                message: format!("limit must be between 1 and {}", Self::MAX_LIMIT),
            });
        }
        if self.offset < 0 {
            return Err(CoreError::InvalidInput {
                message: "offset must not be negative".to_string(),
            });
        }
        if let Some(days) = self.days {
            if days < 1 {
                return Err(CoreError::InvalidInput {
                    message: "days must be at least 1".to_string(),
                });
            }
        }
        if let Some(min) = self.min_pain_score {
            if !(0..=MAX_PAIN_SCORE).contains(&min) {
                return Err(CoreError::InvalidInput {
                    message: format!("min_pain_score must be between 0 and {MAX_PAIN_SCORE}"),
                });
            }
        }
        Ok(())
    }

    /// Lowest pain score a row must have, folding in `pain_only`.
    pub fn effective_min_pain_score(&self) -> Option<i64> {
        match (self.min_pain_score, self.pain_only) {
            (Some(min), true) => Some(min.max(PAIN_THRESHOLD)),
            (None, true) => Some(PAIN_THRESHOLD),
            (min, false) => min,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeasPage {
    pub posts: Vec<Post>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl IdeasPage {
    pub fn new(posts: Vec<Post>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            posts,
            total,
            limit,
            offset,
            has_more: total > offset + limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub posts_this_week: i64,
    pub active_communities: i64,
    pub top_keyword: Option<String>,
    pub active_alerts: i64,
    pub recent_posts: Vec<Post>,
}
