use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::rate_limiter::SourceRateLimiter;
use crate::status::{error_for_send, error_for_status};
use crate::SourceAdapter;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use painpoint_core::{
    ConfigError, CoreError, RawPost, RedditAuthMode, RedditConfig, Source, SourceApiError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";
pub const REDDIT_OAUTH_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

pub const SINGLE_SEARCH_LIMIT: u32 = 25;
pub const COMBINED_SEARCH_LIMIT: u32 = 50;
const MAX_LISTING_LIMIT: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
}

impl From<RedditPostData> for RawPost {
    fn from(post_data: RedditPostData) -> Self {
        let created_at = Utc
            .timestamp_opt(post_data.created_utc as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            source: Source::Reddit,
            url: format!("https://reddit.com{}", post_data.permalink),
            source_id: post_data.id,
            subreddit: Some(post_data.subreddit).filter(|s| !s.is_empty()),
            title: post_data.title,
            text: Some(post_data.selftext).filter(|s| !s.is_empty()),
            score: post_data.score,
            comment_count: post_data.num_comments,
            created_at,
        }
    }
}

/// What to ask Reddit for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedditQuery {
    /// Every (subreddit, phrase) pair searched separately and merged.
    PainSearch {
        subreddits: Vec<String>,
        phrases: Vec<String>,
        limit_per_search: u32,
    },
    Search {
        subreddit: String,
        query: String,
        limit: u32,
    },
    /// A single request over `r/a+b+c` with the phrases OR-ed together.
    Combined {
        subreddits: Vec<String>,
        phrases: Vec<String>,
        limit: u32,
    },
    New {
        subreddit: String,
        limit: u32,
    },
}

impl RedditQuery {
    pub fn pain_search(config: &RedditConfig) -> Self {
        RedditQuery::PainSearch {
            subreddits: config.subreddits.clone(),
            phrases: config.search_phrases.clone(),
            limit_per_search: config.limit_per_search,
        }
    }

    pub fn search(subreddit: impl Into<String>, query: impl Into<String>) -> Self {
        RedditQuery::Search {
            subreddit: subreddit.into(),
            query: query.into(),
            limit: SINGLE_SEARCH_LIMIT,
        }
    }

    pub fn combined(config: &RedditConfig) -> Self {
        RedditQuery::Combined {
            subreddits: config.subreddits.clone(),
            phrases: config.search_phrases.clone(),
            limit: COMBINED_SEARCH_LIMIT,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let blank = |s: &String| s.trim().is_empty();
        let invalid = |message: &str| {
            Err(CoreError::InvalidInput {
                message: message.to_string(),
            })
        };

        let limit = match self {
            RedditQuery::PainSearch {
                subreddits,
                phrases,
                limit_per_search,
            }
            | RedditQuery::Combined {
                subreddits,
                phrases,
                limit: limit_per_search,
            } => {
                if subreddits.is_empty() || subreddits.iter().any(blank) {
                    return invalid("subreddit list must not be empty or contain blank names");
                }
                if phrases.is_empty() || phrases.iter().any(blank) {
                    return invalid("search phrases must not be empty");
                }
                *limit_per_search
            }
            RedditQuery::Search {
                subreddit,
                query,
                limit,
            } => {
                if blank(subreddit) {
                    return invalid("subreddit is required");
                }
                if blank(query) {
                    return invalid("search query is required");
                }
                *limit
            }
            RedditQuery::New { subreddit, limit } => {
                if blank(subreddit) {
                    return invalid("subreddit is required");
                }
                *limit
            }
        };

        if limit == 0 || limit > MAX_LISTING_LIMIT {
            return invalid("limit must be between 1 and 100");
        }
        Ok(())
    }
}

/// Where requests go. Public mode uses the `.json` listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditEndpoints {
    pub api_base: String,
    pub authorize_url: String,
    pub token_url: String,
    pub json_suffix: bool,
}

impl RedditEndpoints {
    pub fn for_mode(mode: RedditAuthMode) -> Self {
        match mode {
            RedditAuthMode::Public => Self {
                api_base: REDDIT_PUBLIC_BASE.to_string(),
                authorize_url: REDDIT_AUTHORIZE_URL.to_string(),
                token_url: REDDIT_TOKEN_URL.to_string(),
                json_suffix: true,
            },
            RedditAuthMode::OAuth => Self {
                api_base: REDDIT_OAUTH_BASE.to_string(),
                authorize_url: REDDIT_AUTHORIZE_URL.to_string(),
                token_url: REDDIT_TOKEN_URL.to_string(),
                json_suffix: false,
            },
        }
    }

    /// Everything served from one base URL, e.g. a local mock server.
    pub fn local(base: &str, mode: RedditAuthMode) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: base.to_string(),
            authorize_url: format!("{}/api/v1/authorize", base),
            token_url: format!("{}/api/v1/access_token", base),
            json_suffix: mode == RedditAuthMode::Public,
        }
    }

    fn listing_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, CoreError> {
        let suffix = if self.json_suffix { ".json" } else { "" };
        let mut url = Url::parse(&format!("{}{}{}", self.api_base, path, suffix)).map_err(|e| {
            CoreError::InvalidInput {
                message: format!("invalid Reddit URL for {}: {}", path, e),
            }
        })?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Reddit source adapter, public JSON or app-only OAuth.
#[derive(Debug)]
pub struct RedditAdapter {
    http: Client,
    config: RedditConfig,
    endpoints: RedditEndpoints,
    limiter: Arc<SourceRateLimiter>,
    metrics: Arc<MetricsCollector>,
    oauth: Option<BasicClient>,
    token: Mutex<Option<CachedToken>>,
}

impl RedditAdapter {
    pub fn new(config: RedditConfig, limiter: Arc<SourceRateLimiter>) -> Result<Self, CoreError> {
        let endpoints = RedditEndpoints::for_mode(config.auth);
        Self::with_endpoints(config, endpoints, limiter)
    }

    pub fn with_endpoints(
        config: RedditConfig,
        endpoints: RedditEndpoints,
        limiter: Arc<SourceRateLimiter>,
    ) -> Result<Self, CoreError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let oauth = match config.auth {
            RedditAuthMode::Public => None,
            RedditAuthMode::OAuth => Some(build_oauth_client(&config, &endpoints)?),
        };

        Ok(Self {
            http,
            config,
            endpoints,
            limiter,
            metrics: Arc::new(MetricsCollector::new(Source::Reddit)),
            oauth,
            token: Mutex::new(None),
        })
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub async fn fetch(&self, query: &RedditQuery) -> Result<Vec<RawPost>, CoreError> {
        query.validate()?;

        match query {
            RedditQuery::PainSearch {
                subreddits,
                phrases,
                limit_per_search,
            } => {
                self.search_pain_points(subreddits, phrases, *limit_per_search)
                    .await
            }
            RedditQuery::Search {
                subreddit,
                query,
                limit,
            } => self.search_subreddit(subreddit, query, *limit).await,
            RedditQuery::Combined {
                subreddits,
                phrases,
                limit,
            } => self.search_combined(subreddits, phrases, *limit).await,
            RedditQuery::New { subreddit, limit } => self.new_posts(subreddit, *limit).await,
        }
    }

    async fn search_pain_points(
        &self,
        subreddits: &[String],
        phrases: &[String],
        limit_per_search: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for subreddit in subreddits {
            for phrase in phrases {
                match self.search_subreddit(subreddit, phrase, limit_per_search).await {
                    Ok(posts) => {
                        for post in posts {
                            if seen.insert(post.source_id.clone()) {
                                results.push(post);
                            }
                        }
                    }
                    // Credentials will not get better on the next pair
                    Err(e) if !e.is_transport() => return Err(e),
                    Err(e) => {
                        warn!(
                            subreddit = %subreddit,
                            phrase = %phrase,
                            "Reddit search failed, skipping: {}",
                            e
                        );
                    }
                }
            }
        }

        results.sort_by(|a, b| b.score.cmp(&a.score));
        info!(
            count = results.len(),
            searches = subreddits.len() * phrases.len(),
            "Reddit pain point search finished"
        );
        Ok(results)
    }

    async fn search_subreddit(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let path = format!("/r/{}/search", subreddit);
        let params = [
            ("q", query.to_string()),
            ("restrict_sr", "1".to_string()),
            ("sort", "new".to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_listing(&path, &params, subreddit).await
    }

    async fn search_combined(
        &self,
        subreddits: &[String],
        phrases: &[String],
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        let joined = subreddits.join("+");
        let query = phrases
            .iter()
            .map(|p| p.trim())
            .collect::<Vec<_>>()
            .join(" OR ");
        let path = format!("/r/{}/search", joined);
        let params = [
            ("q", query),
            ("sort", "new".to_string()),
            ("limit", limit.to_string()),
            ("restrict_sr", "1".to_string()),
        ];
        self.get_listing(&path, &params, &joined).await
    }

    async fn new_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<RawPost>, CoreError> {
        let path = format!("/r/{}/new", subreddit);
        let params = [("limit", limit.to_string())];
        self.get_listing(&path, &params, subreddit).await
    }

    async fn get_listing(
        &self,
        path: &str,
        params: &[(&str, String)],
        subreddit: &str,
    ) -> Result<Vec<RawPost>, CoreError> {
        let url = self.endpoints.listing_url(path, params)?;
        let token = self.access_token().await?;

        let listing = match self
            .limiter
            .execute(|| self.send_listing(&url, token.as_deref(), subreddit))
            .await
        {
            Err(CoreError::SourceApi(SourceApiError::InvalidToken)) if token.is_some() => {
                warn!("Reddit rejected the access token, requesting a new one");
                self.invalidate_token().await;
                let token = self.access_token().await?;
                self.limiter
                    .execute(|| self.send_listing(&url, token.as_deref(), subreddit))
                    .await?
            }
            result => result?,
        };

        let posts: Vec<RawPost> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect();

        debug!("Retrieved {} posts from {}", posts.len(), path);
        Ok(posts)
    }

    async fn send_listing(
        &self,
        url: &Url,
        token: Option<&str>,
        subreddit: &str,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = url.path().to_string();
        let start_time = Instant::now();

        let mut request = self.http.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!("Making Reddit request: GET {}", endpoint);
        let (status_code, result) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let result = if status.is_success() {
                    response
                        .json::<RedditListing<RedditPostData>>()
                        .await
                        .map_err(|e| {
                            CoreError::from(SourceApiError::InvalidResponse {
                                details: format!("Failed to parse listing for {}: {}", endpoint, e),
                            })
                        })
                } else {
                    warn!("Reddit request failed with status {} for {}", status, endpoint);
                    Err(error_for_status(
                        Source::Reddit,
                        status,
                        response.headers(),
                        &endpoint,
                        Some(subreddit),
                    ))
                };
                (Some(status.as_u16()), result)
            }
            Err(e) => {
                warn!("Network error for {}: {}", endpoint, e);
                (None, Err(error_for_send(e)))
            }
        };

        self.metrics
            .record_request(RequestMetrics {
                endpoint,
                status_code,
                response_time: start_time.elapsed(),
                success: result.is_ok(),
                rate_limited: status_code == Some(429),
            })
            .await;

        result
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Bearer token in OAuth mode, refreshed shortly before it expires.
    async fn access_token(&self) -> Result<Option<String>, CoreError> {
        let Some(oauth) = &self.oauth else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(Some(token.access_token.clone()));
            }
            debug!("Reddit access token expiring, refreshing");
        }

        let http = self.http.clone();
        let response = oauth
            .exchange_client_credentials()
            .request_async(|request| send_token_request(http, request))
            .await
            .map_err(|e| SourceApiError::AuthenticationFailed {
                reason: e.to_string(),
            })?;

        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let access_token = response.access_token().secret().clone();
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        info!(expires_in = lifetime.as_secs(), "Obtained Reddit access token");
        Ok(Some(access_token))
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source(&self) -> Source {
        Source::Reddit
    }

    async fn fetch_posts(&self) -> Result<Vec<RawPost>, CoreError> {
        self.fetch(&RedditQuery::pain_search(&self.config)).await
    }

    fn metrics(&self) -> Option<Arc<MetricsCollector>> {
        Some(self.metrics.clone())
    }
}

fn build_oauth_client(
    config: &RedditConfig,
    endpoints: &RedditEndpoints,
) -> Result<BasicClient, CoreError> {
    let client_id = config
        .client_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: "reddit.client_id".to_string(),
        })?;
    let client_secret = config
        .client_secret
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: "reddit.client_secret".to_string(),
        })?;

    let auth_url =
        AuthUrl::new(endpoints.authorize_url.clone()).map_err(|e| ConfigError::InvalidValue {
            field: "reddit.authorize_url".to_string(),
            value: e.to_string(),
        })?;
    let token_url =
        TokenUrl::new(endpoints.token_url.clone()).map_err(|e| ConfigError::InvalidValue {
            field: "reddit.token_url".to_string(),
            value: e.to_string(),
        })?;

    Ok(BasicClient::new(
        ClientId::new(client_id),
        Some(ClientSecret::new(client_secret)),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(AuthType::BasicAuth))
}

// Token requests go through our own client so they carry the configured User-Agent.
async fn send_token_request(
    http: Client,
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(oauth2::HttpResponse {
        status_code,
        headers,
        body,
    })
}
