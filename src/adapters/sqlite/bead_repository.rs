//! SQLite implementation of [`BeadRepository`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::{TownError, TownResult};
use crate::domain::models::{
    Bead, BeadDependency, BeadEvent, BeadEventFilter, BeadEventType, BeadFilter, BeadStatus,
    BeadType, DependencyType, NewBead, NewBeadEvent, Priority,
};
use crate::domain::ports::BeadRepository;

pub struct SqliteBeadRepository {
    pool: SqlitePool,
}

impl SqliteBeadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(super) fn row_to_bead(row: &sqlx::sqlite::SqliteRow) -> TownResult<Bead> {
        let labels_raw: String = row.try_get("labels")?;
        let metadata_raw: String = row.try_get("metadata")?;
        Ok(Bead {
            id: row.try_get("id")?,
            bead_type: BeadType::parse(row.try_get::<String, _>("bead_type")?.as_str())
                .ok_or_else(|| TownError::Database(sqlx::Error::Decode("bad bead_type".into())))?,
            status: BeadStatus::parse(row.try_get::<String, _>("status")?.as_str())
                .ok_or_else(|| TownError::Database(sqlx::Error::Decode("bad status".into())))?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            rig_id: row.try_get("rig_id")?,
            parent_bead_id: row.try_get("parent_bead_id")?,
            assignee_agent_bead_id: row.try_get("assignee_agent_bead_id")?,
            priority: Priority::parse(row.try_get::<String, _>("priority")?.as_str()).unwrap_or_default(),
            labels: serde_json::from_str(&labels_raw).unwrap_or_default(),
            metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({})),
            created_by: row.try_get("created_by")?,
            created_at: parse_dt(row.try_get::<String, _>("created_at")?.as_str())?,
            updated_at: parse_dt(row.try_get::<String, _>("updated_at")?.as_str())?,
            closed_at: row
                .try_get::<Option<String>, _>("closed_at")?
                .map(|s| parse_dt(&s))
                .transpose()?,
        })
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> TownResult<BeadEvent> {
        let metadata_raw: String = row.try_get("metadata")?;
        let event_type_raw: String = row.try_get("event_type")?;
        Ok(BeadEvent {
            id: row.try_get("id")?,
            bead_id: row.try_get("bead_id")?,
            agent_id: row.try_get("agent_id")?,
            event_type: parse_event_type(&event_type_raw)?,
            old_value: row.try_get("old_value")?,
            new_value: row.try_get("new_value")?,
            metadata: serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({})),
            created_at: parse_dt(row.try_get::<String, _>("created_at")?.as_str())?,
        })
    }
}

fn parse_dt(s: &str) -> TownResult<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TownError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn parse_event_type(s: &str) -> TownResult<BeadEventType> {
    let t = match s {
        "created" => BeadEventType::Created,
        "assigned" => BeadEventType::Assigned,
        "hooked" => BeadEventType::Hooked,
        "unhooked" => BeadEventType::Unhooked,
        "status_changed" => BeadEventType::StatusChanged,
        "closed" => BeadEventType::Closed,
        "escalated" => BeadEventType::Escalated,
        "mail_sent" => BeadEventType::MailSent,
        "review_submitted" => BeadEventType::ReviewSubmitted,
        "review_completed" => BeadEventType::ReviewCompleted,
        "agent_spawned" => BeadEventType::AgentSpawned,
        "agent_exited" => BeadEventType::AgentExited,
        other => return Err(TownError::Database(sqlx::Error::Decode(format!("bad event_type: {other}").into()))),
    };
    Ok(t)
}

#[async_trait]
impl BeadRepository for SqliteBeadRepository {
    #[instrument(skip(self, input))]
    async fn create_bead(&self, input: NewBead) -> TownResult<Bead> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let priority = input.priority.unwrap_or_default();
        let labels = serde_json::to_string(&input.labels.unwrap_or_default())?;
        let metadata = serde_json::to_string(&input.metadata.unwrap_or(serde_json::json!({})))?;

        sqlx::query(
            "INSERT INTO beads (
                id, bead_type, status, title, body, rig_id, parent_bead_id,
                assignee_agent_bead_id, priority, labels, metadata, created_by,
                created_at, updated_at, closed_at
            ) VALUES (?, ?, 'open', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(&id)
        .bind(input.bead_type.as_str())
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.rig_id)
        .bind(&input.parent_bead_id)
        .bind(&input.assignee_agent_bead_id)
        .bind(priority.as_str())
        .bind(&labels)
        .bind(&metadata)
        .bind(&input.created_by)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.log_bead_event(NewBeadEvent {
            bead_id: id.clone(),
            agent_id: None,
            event_type: BeadEventType::Created,
            old_value: None,
            new_value: Some(input.bead_type.as_str().to_string()),
            metadata: None,
        })
        .await?;

        self.get_bead(&id).await?.ok_or_else(|| TownError::not_found(format!("bead {id}")))
    }

    async fn get_bead(&self, id: &str) -> TownResult<Option<Bead>> {
        let row = sqlx::query("SELECT * FROM beads WHERE id = ?").bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_bead).transpose()
    }

    async fn list_beads(&self, filter: BeadFilter) -> TownResult<Vec<Bead>> {
        let mut sql = String::from("SELECT * FROM beads WHERE 1=1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.bead_type.is_some() {
            sql.push_str(" AND bead_type = ?");
        }
        if filter.assignee.is_some() {
            sql.push_str(" AND assignee_agent_bead_id = ?");
        }
        if filter.parent.is_some() {
            sql.push_str(" AND parent_bead_id = ?");
        }
        if filter.rig.is_some() {
            sql.push_str(" AND rig_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&sql);
        if let Some(s) = filter.status {
            q = q.bind(s.as_str().to_string());
        }
        if let Some(t) = filter.bead_type {
            q = q.bind(t.as_str().to_string());
        }
        if let Some(a) = &filter.assignee {
            q = q.bind(a.clone());
        }
        if let Some(p) = &filter.parent {
            q = q.bind(p.clone());
        }
        if let Some(r) = &filter.rig {
            q = q.bind(r.clone());
        }
        q = q.bind(filter.effective_limit()).bind(filter.offset.unwrap_or(0));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_bead).collect()
    }

    #[instrument(skip(self))]
    async fn update_bead_status(
        &self,
        id: &str,
        status: BeadStatus,
        agent_id: Option<&str>,
    ) -> TownResult<Bead> {
        let existing = self.get_bead(id).await?.ok_or_else(|| TownError::not_found(format!("bead {id}")))?;
        let old_status = existing.status;

        let is_reopen = matches!(old_status, BeadStatus::Closed | BeadStatus::Failed)
            && matches!(status, BeadStatus::Open | BeadStatus::InProgress);
        if is_reopen {
            return Err(TownError::Conflict("ReopenDisallowed"));
        }

        let now = Utc::now();
        let closed_at = if status == BeadStatus::Closed { Some(now.to_rfc3339()) } else { None };

        sqlx::query("UPDATE beads SET status = ?, updated_at = ?, closed_at = COALESCE(?, closed_at) WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(closed_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.log_bead_event(NewBeadEvent {
            bead_id: id.to_string(),
            agent_id: agent_id.map(str::to_string),
            event_type: BeadEventType::StatusChanged,
            old_value: Some(old_status.as_str().to_string()),
            new_value: Some(status.as_str().to_string()),
            metadata: None,
        })
        .await?;

        debug!(bead_id = id, from = old_status.as_str(), to = status.as_str(), "bead status changed");
        self.get_bead(id).await?.ok_or_else(|| TownError::not_found(format!("bead {id}")))
    }

    #[instrument(skip(self))]
    async fn delete_bead(&self, id: &str) -> TownResult<()> {
        // Idempotent delete: a missing bead returns silently.
        if self.get_bead(id).await?.is_none() {
            return Ok(());
        }

        for child in self.list_children(id).await? {
            Box::pin(self.delete_bead(&child.id)).await?;
        }

        // Any agent still hooked to this bead is unhooked and returned to idle.
        sqlx::query(
            "UPDATE agent_metadata SET current_hook_bead_id = NULL, status = 'idle' WHERE current_hook_bead_id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM bead_dependencies WHERE bead_id = ? OR depends_on_bead_id = ?")
            .bind(id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        for table in ["agent_metadata", "review_metadata", "escalation_metadata", "convoy_metadata"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE bead_id = ?")).bind(id).execute(&self.pool).await?;
        }

        sqlx::query("DELETE FROM bead_events WHERE bead_id = ?").bind(id).execute(&self.pool).await?;
        sqlx::query("DELETE FROM beads WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn log_bead_event(&self, event: NewBeadEvent) -> TownResult<BeadEvent> {
        let now = Utc::now();
        let metadata = serde_json::to_string(&event.metadata.unwrap_or(serde_json::json!({})))?;
        let id = sqlx::query(
            "INSERT INTO bead_events (bead_id, agent_id, event_type, old_value, new_value, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.bead_id)
        .bind(&event.agent_id)
        .bind(event.event_type.as_str())
        .bind(&event.old_value)
        .bind(&event.new_value)
        .bind(&metadata)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row = sqlx::query("SELECT * FROM bead_events WHERE id = ?").bind(id).fetch_one(&self.pool).await?;
        Self::row_to_event(&row)
    }

    async fn list_bead_events(&self, filter: BeadEventFilter) -> TownResult<Vec<BeadEvent>> {
        let mut sql = String::from("SELECT * FROM bead_events WHERE 1=1");
        if filter.bead_id.is_some() {
            sql.push_str(" AND bead_id = ?");
        }
        if filter.since.is_some() {
            sql.push_str(" AND created_at > ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(b) = &filter.bead_id {
            q = q.bind(b.clone());
        }
        if let Some(since) = filter.since {
            q = q.bind(since.to_rfc3339());
        }
        q = q.bind(filter.limit.unwrap_or(100));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_event).collect()
    }

    async fn add_dependency(
        &self,
        bead_id: &str,
        depends_on_bead_id: &str,
        dependency_type: DependencyType,
    ) -> TownResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO bead_dependencies (bead_id, depends_on_bead_id, dependency_type) VALUES (?, ?, ?)",
        )
        .bind(bead_id)
        .bind(depends_on_bead_id)
        .bind(dependency_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_dependencies(&self, bead_id: &str) -> TownResult<Vec<BeadDependency>> {
        let rows = sqlx::query("SELECT * FROM bead_dependencies WHERE bead_id = ?")
            .bind(bead_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let dep_type_raw: String = row.try_get("dependency_type")?;
                Ok(BeadDependency {
                    bead_id: row.try_get("bead_id")?,
                    depends_on_bead_id: row.try_get("depends_on_bead_id")?,
                    dependency_type: DependencyType::parse(&dep_type_raw).ok_or_else(|| {
                        TownError::Database(sqlx::Error::Decode("bad dependency_type".into()))
                    })?,
                })
            })
            .collect()
    }

    async fn list_children(&self, parent_bead_id: &str) -> TownResult<Vec<Bead>> {
        let rows = sqlx::query("SELECT * FROM beads WHERE parent_bead_id = ? ORDER BY created_at ASC")
            .bind(parent_bead_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_bead).collect()
    }

    async fn patch_metadata(&self, id: &str, key: &str, value: serde_json::Value) -> TownResult<()> {
        let bead = self.get_bead(id).await?.ok_or_else(|| TownError::not_found(format!("bead {id}")))?;
        let mut metadata = bead.metadata;
        if let Some(obj) = metadata.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        let serialized = serde_json::to_string(&metadata)?;
        sqlx::query("UPDATE beads SET metadata = ?, updated_at = ? WHERE id = ?")
            .bind(serialized)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
