//! SQLite implementation of [`SatelliteRepository`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::TownResult;
use crate::domain::models::{EscalationMetadata, ReviewMetadata, Severity};
use crate::domain::ports::SatelliteRepository;

pub struct SqliteSatelliteRepository {
    pool: SqlitePool,
}

impl SqliteSatelliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SatelliteRepository for SqliteSatelliteRepository {
    async fn create_review_metadata(&self, meta: ReviewMetadata) -> TownResult<()> {
        sqlx::query(
            "INSERT INTO review_metadata (bead_id, branch, target_branch, merge_commit, pr_url, retry_count)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&meta.bead_id)
        .bind(&meta.branch)
        .bind(&meta.target_branch)
        .bind(&meta.merge_commit)
        .bind(&meta.pr_url)
        .bind(meta.retry_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_review_metadata(&self, bead_id: &str) -> TownResult<Option<ReviewMetadata>> {
        let row = sqlx::query("SELECT * FROM review_metadata WHERE bead_id = ?")
            .bind(bead_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(ReviewMetadata {
                bead_id: row.try_get("bead_id")?,
                branch: row.try_get("branch")?,
                target_branch: row.try_get("target_branch")?,
                merge_commit: row.try_get("merge_commit")?,
                pr_url: row.try_get("pr_url")?,
                retry_count: row.try_get::<i64, _>("retry_count")? as u32,
            })
        })
        .transpose()
    }

    async fn update_review_metadata(&self, meta: ReviewMetadata) -> TownResult<()> {
        sqlx::query(
            "UPDATE review_metadata SET branch = ?, target_branch = ?, merge_commit = ?, pr_url = ?, retry_count = ?
             WHERE bead_id = ?",
        )
        .bind(&meta.branch)
        .bind(&meta.target_branch)
        .bind(&meta.merge_commit)
        .bind(&meta.pr_url)
        .bind(meta.retry_count as i64)
        .bind(&meta.bead_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_escalation_metadata(
        &self,
        bead_id: &str,
        severity: Severity,
        category: Option<&str>,
    ) -> TownResult<()> {
        sqlx::query(
            "INSERT INTO escalation_metadata (bead_id, severity, category, acknowledged, re_escalation_count)
             VALUES (?, ?, ?, 0, 0)",
        )
        .bind(bead_id)
        .bind(severity.as_str())
        .bind(category)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_escalation_metadata(&self, bead_id: &str) -> TownResult<Option<EscalationMetadata>> {
        let row = sqlx::query("SELECT * FROM escalation_metadata WHERE bead_id = ?")
            .bind(bead_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            let severity_raw: String = row.try_get("severity")?;
            let acknowledged_at_raw: Option<String> = row.try_get("acknowledged_at")?;
            Ok(EscalationMetadata {
                bead_id: row.try_get("bead_id")?,
                severity: Severity::parse(&severity_raw).unwrap_or(Severity::Medium),
                category: row.try_get("category")?,
                acknowledged: row.try_get::<i64, _>("acknowledged")? != 0,
                re_escalation_count: row.try_get::<i64, _>("re_escalation_count")? as u32,
                acknowledged_at: acknowledged_at_raw
                    .map(|s| {
                        chrono::DateTime::parse_from_rfc3339(&s)
                            .map(|dt| dt.with_timezone(&Utc))
                            .map_err(|e| crate::domain::errors::TownError::Database(sqlx::Error::Decode(Box::new(e))))
                    })
                    .transpose()?,
            })
        })
        .transpose()
    }

    async fn acknowledge_escalation(&self, bead_id: &str) -> TownResult<()> {
        sqlx::query("UPDATE escalation_metadata SET acknowledged = 1, acknowledged_at = ? WHERE bead_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(bead_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
