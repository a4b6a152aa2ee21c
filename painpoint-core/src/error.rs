use crate::types::Source;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Source API error: {0}")]
    SourceApi(#[from] SourceApiError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// Failures that cost a source its contribution to a sync pass but
    /// must not abort the pass.
    pub fn is_transport(&self) -> bool {
        match self {
            CoreError::SourceApi(e) => e.is_transport(),
            CoreError::Network(_) | CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            CoreError::SourceApi(SourceApiError::RateLimitExceeded { .. })
        )
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CoreError::SourceApi(e) if e.is_degraded())
    }
}

#[derive(Error, Debug, Clone)]
pub enum SourceApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Rate limit retries exhausted for {source_name} after {attempts} attempts")]
    RetriesExhausted { source_name: Source, attempts: u32 },

    #[error("Requests to {source_name} are being blocked (status {status_code})")]
    Blocked {
        source_name: Source,
        status_code: u16,
    },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected status {status_code} from {endpoint}")]
    HttpStatus { status_code: u16, endpoint: String },
}

impl SourceApiError {
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            SourceApiError::AuthenticationFailed { .. } | SourceApiError::InvalidToken
        )
    }

    /// The remote refused to serve us; callers may fall back to fixtures in tests.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceApiError::Blocked { .. })
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Query execution failed: {query}")]
    QueryFailed { query: String },

    #[error("Constraint violation: {constraint}")]
    ConstraintViolation { constraint: String },

    #[error("Corrupt row in {table}: {details}")]
    CorruptRow { table: String, details: String },

    #[error("Database locked")]
    DatabaseLocked,

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Database(DatabaseError::Sql(e))
    }
}
