use async_trait::async_trait;
use painpoint_core::{Alert, CoreError};
use sqlx::FromRow;

use crate::store::AlertSource;
use crate::{decode_string_list, timestamp_to_datetime, Database};

#[derive(Debug, FromRow)]
struct AlertRow {
    id: String,
    user_id: String,
    name: String,
    keywords: String,
    subreddits: String,
    is_active: bool,
    created_at: i64,
}

impl TryFrom<AlertRow> for Alert {
    type Error = CoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            keywords: decode_string_list("alerts", "keywords", &row.keywords)?,
            subreddits: decode_string_list("alerts", "subreddits", &row.subreddits)?,
            is_active: row.is_active,
            created_at: timestamp_to_datetime("alerts", "created_at", row.created_at)?,
        })
    }
}

impl Database {
    /// Alerts are owned by other tools; this exists for seeding and tests.
    pub async fn insert_alert(&self, alert: &Alert) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO alerts (id, user_id, name, keywords, subreddits, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&alert.id)
        .bind(&alert.user_id)
        .bind(&alert.name)
        .bind(serde_json::to_string(&alert.keywords)?)
        .bind(serde_json::to_string(&alert.subreddits)?)
        .bind(alert.is_active)
        .bind(alert.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn active_alerts(&self) -> Result<Vec<Alert>, CoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT id, user_id, name, keywords, subreddits, is_active, created_at \
             FROM alerts WHERE is_active = 1 ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    pub async fn count_active_alerts(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_active_communities(&self) -> Result<i64, CoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM communities WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl AlertSource for Database {
    async fn active_alerts(&self) -> Result<Vec<Alert>, CoreError> {
        Database::active_alerts(self).await
    }
}
