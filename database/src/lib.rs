pub mod alerts;
pub mod posts;
pub mod store;
pub mod trends;
pub mod upsert;

#[cfg(test)]
mod tests;

pub use store::{AlertSource, PostStore, TrendStore};
pub use upsert::{UpsertEngine, UpsertReport, MAX_REPORTED_ERRORS};

use chrono::{DateTime, TimeZone, Utc};
use painpoint_core::{CoreError, DatabaseError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store for posts, alerts, communities and trend snapshots.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("invalid database url '{}': {}", database_url, e),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to database at {}", database_url);
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn timestamp_to_datetime(
    table: &str,
    column: &str,
    secs: i64,
) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
        DatabaseError::CorruptRow {
            table: table.to_string(),
            details: format!("{} out of range: {}", column, secs),
        }
        .into()
    })
}

pub(crate) fn decode_string_list(
    table: &str,
    column: &str,
    raw: &str,
) -> Result<Vec<String>, CoreError> {
    serde_json::from_str(raw).map_err(|e| {
        DatabaseError::CorruptRow {
            table: table.to_string(),
            details: format!("{} is not a JSON string array: {}", column, e),
        }
        .into()
    })
}
