use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use painpoint_core::{CoreError, DatabaseError, Post, TrendSnapshot};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::TrendStore;
use crate::Database;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, FromRow)]
struct SnapshotRow {
    keyword: String,
    snapshot_date: String,
    mention_count: i64,
    avg_score: f64,
}

impl TryFrom<SnapshotRow> for TrendSnapshot {
    type Error = CoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let snapshot_date = NaiveDate::parse_from_str(&row.snapshot_date, DATE_FORMAT)
            .map_err(|e| DatabaseError::CorruptRow {
                table: "trend_snapshots".to_string(),
                details: format!("bad snapshot_date '{}': {}", row.snapshot_date, e),
            })?;

        Ok(TrendSnapshot {
            keyword: row.keyword,
            snapshot_date,
            mention_count: row.mention_count,
            avg_score: row.avg_score,
        })
    }
}

impl Database {
    /// Write the snapshot for `(keyword, snapshot_date)`, replacing any earlier one.
    pub async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO trend_snapshots (id, keyword, snapshot_date, mention_count, avg_score, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(keyword, snapshot_date) DO UPDATE SET
                mention_count = excluded.mention_count,
                avg_score = excluded.avg_score
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&snapshot.keyword)
        .bind(snapshot.snapshot_date.format(DATE_FORMAT).to_string())
        .bind(snapshot.mention_count)
        .bind(snapshot.avg_score)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn snapshots_for_date(&self, date: NaiveDate) -> Result<Vec<TrendSnapshot>, CoreError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT keyword, snapshot_date, mention_count, avg_score FROM trend_snapshots \
             WHERE snapshot_date = ? ORDER BY mention_count DESC, keyword ASC",
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrendSnapshot::try_from).collect()
    }

    /// Keyword of the highest-count snapshot dated on or after `since`.
    pub async fn top_snapshot_keyword_since(
        &self,
        since: NaiveDate,
    ) -> Result<Option<String>, CoreError> {
        let keyword: Option<String> = sqlx::query_scalar(
            "SELECT keyword FROM trend_snapshots WHERE snapshot_date >= ? \
             ORDER BY mention_count DESC, snapshot_date DESC, keyword ASC LIMIT 1",
        )
        .bind(since.format(DATE_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(keyword)
    }
}

#[async_trait]
impl TrendStore for Database {
    async fn posts_since(&self, since: DateTime<Utc>) -> Result<Vec<Post>, CoreError> {
        Database::posts_since(self, since).await
    }

    async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<(), CoreError> {
        Database::upsert_snapshot(self, snapshot).await
    }
}
