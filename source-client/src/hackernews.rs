use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::rate_limiter::SourceRateLimiter;
use crate::status::{error_for_send, error_for_status};
use crate::SourceAdapter;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, StreamExt};
use painpoint_core::{CoreError, HackerNewsConfig, RawPost, Source, SourceApiError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const ASK_STORIES_TAKE: usize = 50;
const TOP_STORIES_TAKE: usize = 30;
const NEW_STORIES_TAKE: usize = 30;

/// Coarse pre-filter for stories. Unrelated to the pain score.
pub const HN_PAIN_INDICATORS: &[&str] = &[
    "wish",
    "frustrated",
    "looking for",
    "need",
    "want",
    "problem",
    "annoying",
    "difficult",
    "hard to",
    "cant find",
    "doesnt exist",
    "why isnt",
    "someone should",
    "would pay",
    "startup idea",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnItem {
    pub id: u64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub descendants: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl HnItem {
    /// A titled story whose text carries at least one pain indicator.
    pub fn is_candidate(&self) -> bool {
        let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) else {
            return false;
        };
        self.kind.as_deref() == Some("story")
            && matches_pain_indicators(title, self.text.as_deref())
    }
}

impl From<HnItem> for RawPost {
    fn from(item: HnItem) -> Self {
        let created_at = item
            .time
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now);

        Self {
            source: Source::HackerNews,
            source_id: item.id.to_string(),
            subreddit: None,
            title: item.title.unwrap_or_default(),
            text: item.text.filter(|t| !t.is_empty()),
            url: format!("https://news.ycombinator.com/item?id={}", item.id),
            score: item.score.unwrap_or(0),
            comment_count: item.descendants.unwrap_or(0),
            created_at,
        }
    }
}

pub fn matches_pain_indicators(title: &str, text: Option<&str>) -> bool {
    let content = format!("{} {}", title, text.unwrap_or("")).to_lowercase();
    HN_PAIN_INDICATORS
        .iter()
        .any(|indicator| content.contains(indicator))
}

/// `ask[..50] ++ top[..30] ++ new[..30]`, first occurrence kept, capped.
pub fn merge_candidate_ids(ask: &[u64], top: &[u64], new: &[u64], max: usize) -> Vec<u64> {
    let mut seen = HashSet::new();
    ask.iter()
        .take(ASK_STORIES_TAKE)
        .chain(top.iter().take(TOP_STORIES_TAKE))
        .chain(new.iter().take(NEW_STORIES_TAKE))
        .copied()
        .filter(|id| seen.insert(*id))
        .take(max)
        .collect()
}

#[derive(Debug)]
pub struct HackerNewsAdapter {
    http: Client,
    config: HackerNewsConfig,
    limiter: Arc<SourceRateLimiter>,
    metrics: Arc<MetricsCollector>,
}

impl HackerNewsAdapter {
    pub fn new(config: HackerNewsConfig, limiter: Arc<SourceRateLimiter>) -> Result<Self, CoreError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            config,
            limiter,
            metrics: Arc::new(MetricsCollector::new(Source::HackerNews)),
        })
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub async fn fetch_pain_stories(&self) -> Result<Vec<RawPost>, CoreError> {
        let (ask, top, new) = tokio::join!(
            self.story_ids("askstories"),
            self.story_ids("topstories"),
            self.story_ids("newstories"),
        );
        let candidates = merge_candidate_ids(&ask?, &top?, &new?, self.config.max_candidates);
        debug!("Fetching {} Hacker News items", candidates.len());

        // Every request waits on the shared limiter, so items go one at a time.
        let items: Vec<HnItem> = stream::iter(candidates)
            .then(|id| self.item(id))
            .filter_map(|item| async move { item })
            .collect()
            .await;

        let fetched = items.len();
        let mut posts: Vec<RawPost> = items
            .into_iter()
            .filter(HnItem::is_candidate)
            .map(RawPost::from)
            .collect();

        posts.sort_by(|a, b| b.score.cmp(&a.score));
        posts.truncate(self.config.max_results);

        info!(
            fetched,
            kept = posts.len(),
            "Hacker News pain story scan finished"
        );
        Ok(posts)
    }

    async fn story_ids(&self, list: &str) -> Result<Vec<u64>, CoreError> {
        let path = format!("/{}.json", list);
        self.get_json::<Vec<u64>>(&path, &path).await
    }

    /// One item; failures and deleted (`null`) items are skipped.
    async fn item(&self, id: u64) -> Option<HnItem> {
        let path = format!("/item/{}.json", id);
        match self.get_json::<Option<HnItem>>(&path, "/item").await {
            Ok(Some(item)) => Some(item),
            Ok(None) => {
                warn!(id, "Hacker News item is null, skipping");
                None
            }
            Err(e) => {
                warn!(id, "Failed to fetch Hacker News item, skipping: {}", e);
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        endpoint: &str,
    ) -> Result<T, CoreError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        self.limiter
            .execute(|| self.send_json::<T>(&url, endpoint))
            .await
    }

    async fn send_json<T: DeserializeOwned>(&self, url: &str, endpoint: &str) -> Result<T, CoreError> {
        let start_time = Instant::now();

        let (status_code, result) = match self.http.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                let result = if status.is_success() {
                    response.json::<T>().await.map_err(|e| {
                        CoreError::from(SourceApiError::InvalidResponse {
                            details: format!("Failed to parse {}: {}", url, e),
                        })
                    })
                } else {
                    Err(error_for_status(
                        Source::HackerNews,
                        status,
                        response.headers(),
                        endpoint,
                        None,
                    ))
                };
                (Some(status.as_u16()), result)
            }
            Err(e) => (None, Err(error_for_send(e))),
        };

        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: result.is_ok(),
                rate_limited: status_code == Some(429),
            })
            .await;

        result
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn fetch_posts(&self) -> Result<Vec<RawPost>, CoreError> {
        self.fetch_pain_stories().await
    }

    fn metrics(&self) -> Option<Arc<MetricsCollector>> {
        Some(self.metrics.clone())
    }
}
