//! SQLite implementation of [`AgentRepository`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::domain::errors::{TownError, TownResult};
use crate::domain::models::{
    Agent, AgentEvent, AgentEventFilter, AgentFilter, AgentMetadata, AgentRole, AgentStatus, Bead,
    BeadEventType, BeadType, Checkpoint, NewAgent, NewAgentEvent, NewBead, NewBeadEvent,
    POLECAT_NAME_POOL,
};
use crate::domain::ports::{AgentRepository, BeadRepository};
use crate::scheduler::constants::AGENT_EVENT_CAP;

use super::bead_repository::SqliteBeadRepository;

pub struct SqliteAgentRepository {
    pool: SqlitePool,
    beads: SqliteBeadRepository,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        let beads = SqliteBeadRepository::new(pool.clone());
        Self { pool, beads }
    }

    async fn row_to_metadata(row: &sqlx::sqlite::SqliteRow) -> TownResult<AgentMetadata> {
        let status_raw: String = row.try_get("status")?;
        let role_raw: String = row.try_get("role")?;
        let last_activity_raw: Option<String> = row.try_get("last_activity_at")?;
        Ok(AgentMetadata {
            bead_id: row.try_get("bead_id")?,
            role: AgentRole::parse(&role_raw)
                .ok_or_else(|| TownError::Database(sqlx::Error::Decode("bad role".into())))?,
            identity: row.try_get("identity")?,
            container_process_id: row.try_get("container_process_id")?,
            status: AgentStatus::parse(&status_raw)
                .ok_or_else(|| TownError::Database(sqlx::Error::Decode("bad status".into())))?,
            current_hook_bead_id: row.try_get("current_hook_bead_id")?,
            dispatch_attempts: row.try_get::<i64, _>("dispatch_attempts")? as u32,
            checkpoint: row.try_get("checkpoint")?,
            last_activity_at: last_activity_raw.map(|s| parse_dt(&s)).transpose()?,
        })
    }

    async fn join(&self, bead: Bead) -> TownResult<Agent> {
        let row = sqlx::query("SELECT * FROM agent_metadata WHERE bead_id = ?")
            .bind(&bead.id)
            .fetch_one(&self.pool)
            .await?;
        let meta = Self::row_to_metadata(&row).await?;
        Ok(Agent::from_parts(bead, meta))
    }

    fn row_to_agent_event(row: &sqlx::sqlite::SqliteRow) -> TownResult<AgentEvent> {
        let payload_raw: String = row.try_get("payload")?;
        Ok(AgentEvent {
            id: row.try_get("id")?,
            agent_id: row.try_get("agent_id")?,
            event_type: row.try_get("event_type")?,
            payload: serde_json::from_str(&payload_raw).unwrap_or(serde_json::json!({})),
            created_at: parse_dt(row.try_get::<String, _>("created_at")?.as_str())?,
        })
    }
}

fn parse_dt(s: &str) -> TownResult<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TownError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    #[instrument(skip(self, input))]
    async fn register_agent(&self, input: NewAgent) -> TownResult<Agent> {
        let bead = self
            .beads
            .create_bead(NewBead {
                bead_type: BeadType::Agent,
                title: input.name.clone(),
                rig_id: input.rig_id.clone(),
                ..Default::default()
            })
            .await?;

        sqlx::query(
            "INSERT INTO agent_metadata (bead_id, role, identity, status, dispatch_attempts) VALUES (?, ?, ?, 'idle', 0)",
        )
        .bind(&bead.id)
        .bind(input.role.as_str())
        .bind(&input.identity)
        .execute(&self.pool)
        .await?;

        self.join(bead).await
    }

    async fn get_agent(&self, id: &str) -> TownResult<Option<Agent>> {
        match self.beads.get_bead(id).await? {
            Some(bead) if bead.bead_type == BeadType::Agent => Ok(Some(self.join(bead).await?)),
            _ => Ok(None),
        }
    }

    async fn get_agent_by_identity(&self, identity: &str) -> TownResult<Option<Agent>> {
        let row = sqlx::query("SELECT bead_id FROM agent_metadata WHERE identity = ?")
            .bind(identity)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let bead_id: String = row.try_get("bead_id")?;
                self.get_agent(&bead_id).await
            }
            None => Ok(None),
        }
    }

    async fn list_agents(&self, filter: AgentFilter) -> TownResult<Vec<Agent>> {
        let mut sql = String::from(
            "SELECT b.* FROM beads b JOIN agent_metadata m ON m.bead_id = b.id WHERE b.bead_type = 'agent'",
        );
        if filter.role.is_some() {
            sql.push_str(" AND m.role = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND m.status = ?");
        }
        if filter.rig_id.is_some() {
            sql.push_str(" AND b.rig_id = ?");
        }
        sql.push_str(" ORDER BY b.created_at ASC");

        let mut q = sqlx::query(&sql);
        if let Some(r) = filter.role {
            q = q.bind(r.as_str().to_string());
        }
        if let Some(s) = filter.status {
            q = q.bind(s.as_str().to_string());
        }
        if let Some(rig) = &filter.rig_id {
            q = q.bind(rig.clone());
        }

        let rows = q.fetch_all(&self.pool).await?;
        let mut agents = Vec::with_capacity(rows.len());
        for row in rows {
            let bead = SqliteBeadRepository::row_to_bead(&row)?;
            agents.push(self.join(bead).await?);
        }
        Ok(agents)
    }

    async fn update_agent_status(&self, id: &str, status: AgentStatus) -> TownResult<Agent> {
        sqlx::query("UPDATE agent_metadata SET status = ? WHERE bead_id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_agent(id).await?.ok_or_else(|| TownError::not_found(format!("agent {id}")))
    }

    #[instrument(skip(self))]
    async fn delete_agent(&self, id: &str) -> TownResult<()> {
        if let Some(hooked) = self.get_hooked_bead(id).await? {
            sqlx::query("UPDATE beads SET assignee_agent_bead_id = NULL, status = 'open' WHERE id = ?")
                .bind(&hooked.id)
                .execute(&self.pool)
                .await?;
        }
        sqlx::query("DELETE FROM agent_metadata WHERE bead_id = ?").bind(id).execute(&self.pool).await?;
        self.beads.delete_bead(id).await
    }

    #[instrument(skip(self))]
    async fn hook_bead(&self, agent_id: &str, bead_id: &str) -> TownResult<Agent> {
        let agent = self.get_agent(agent_id).await?.ok_or_else(|| TownError::not_found(format!("agent {agent_id}")))?;

        if let Some(current) = &agent.current_hook_bead_id {
            if current == bead_id {
                return Ok(agent);
            }
            return Err(TownError::Conflict("AlreadyHookedElsewhere"));
        }

        sqlx::query(
            "UPDATE agent_metadata SET current_hook_bead_id = ?, status = 'idle', dispatch_attempts = 0,
             last_activity_at = ? WHERE bead_id = ?",
        )
        .bind(bead_id)
        .bind(Utc::now().to_rfc3339())
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        self.beads.update_bead_status(bead_id, crate::domain::models::BeadStatus::InProgress, Some(agent_id)).await?;
        sqlx::query("UPDATE beads SET assignee_agent_bead_id = ? WHERE id = ?")
            .bind(agent_id)
            .bind(bead_id)
            .execute(&self.pool)
            .await?;

        self.beads
            .log_bead_event(NewBeadEvent {
                bead_id: bead_id.to_string(),
                agent_id: Some(agent_id.to_string()),
                event_type: BeadEventType::Hooked,
                old_value: None,
                new_value: Some(agent_id.to_string()),
                metadata: None,
            })
            .await?;

        crate::scheduler::alarm::arm_alarm(&super::SqliteKvStore::new(self.pool.clone())).await?;

        self.get_agent(agent_id).await?.ok_or_else(|| TownError::not_found(format!("agent {agent_id}")))
    }

    #[instrument(skip(self))]
    async fn unhook_bead(&self, agent_id: &str) -> TownResult<Agent> {
        let agent = self.get_agent(agent_id).await?.ok_or_else(|| TownError::not_found(format!("agent {agent_id}")))?;

        if let Some(bead_id) = agent.current_hook_bead_id.clone() {
            sqlx::query("UPDATE agent_metadata SET current_hook_bead_id = NULL WHERE bead_id = ?")
                .bind(agent_id)
                .execute(&self.pool)
                .await?;
            sqlx::query("UPDATE beads SET assignee_agent_bead_id = NULL WHERE id = ?")
                .bind(&bead_id)
                .execute(&self.pool)
                .await?;

            self.beads
                .log_bead_event(NewBeadEvent {
                    bead_id,
                    agent_id: Some(agent_id.to_string()),
                    event_type: BeadEventType::Unhooked,
                    old_value: Some(agent_id.to_string()),
                    new_value: None,
                    metadata: None,
                })
                .await?;
        }

        self.get_agent(agent_id).await?.ok_or_else(|| TownError::not_found(format!("agent {agent_id}")))
    }

    async fn get_hooked_bead(&self, agent_id: &str) -> TownResult<Option<Bead>> {
        let agent = match self.get_agent(agent_id).await? {
            Some(a) => a,
            None => return Ok(None),
        };
        match agent.current_hook_bead_id {
            Some(bead_id) => self.beads.get_bead(&bead_id).await,
            None => Ok(None),
        }
    }

    async fn write_checkpoint(&self, agent_id: &str, data: Checkpoint) -> TownResult<()> {
        let serialized = serde_json::to_string(&data)?;
        sqlx::query("UPDATE agent_metadata SET checkpoint = ? WHERE bead_id = ?")
            .bind(serialized)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_checkpoint(&self, agent_id: &str) -> TownResult<Option<Checkpoint>> {
        let row = sqlx::query("SELECT checkpoint FROM agent_metadata WHERE bead_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let raw: Option<String> = row.try_get("checkpoint")?;
                Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
            }
            None => Ok(None),
        }
    }

    async fn touch_agent(&self, agent_id: &str) -> TownResult<()> {
        sqlx::query("UPDATE agent_metadata SET last_activity_at = ? WHERE bead_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_dispatch_attempts(&self, agent_id: &str) -> TownResult<u32> {
        sqlx::query("UPDATE agent_metadata SET dispatch_attempts = dispatch_attempts + 1 WHERE bead_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT dispatch_attempts FROM agent_metadata WHERE bead_id = ?")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("dispatch_attempts")? as u32)
    }

    async fn reset_dispatch_attempts(&self, agent_id: &str) -> TownResult<()> {
        sqlx::query("UPDATE agent_metadata SET dispatch_attempts = 0 WHERE bead_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn allocate_polecat_name(&self) -> TownResult<String> {
        let rows = sqlx::query(
            "SELECT b.title FROM beads b JOIN agent_metadata m ON m.bead_id = b.id
             WHERE m.role = 'polecat' AND m.status != 'dead'",
        )
        .fetch_all(&self.pool)
        .await?;
        let taken: std::collections::HashSet<String> =
            rows.iter().map(|r| r.try_get::<String, _>("title")).collect::<Result<_, _>>()?;

        if let Some(name) = POLECAT_NAME_POOL.iter().find(|n| !taken.contains(**n)) {
            return Ok((*name).to_string());
        }

        let mut n = POLECAT_NAME_POOL.len() + 1;
        loop {
            let candidate = format!("Polecat-{n}");
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    async fn log_agent_event(&self, event: NewAgentEvent) -> TownResult<AgentEvent> {
        let now = Utc::now();
        let payload = serde_json::to_string(&event.payload.unwrap_or(serde_json::json!({})))?;
        let id = sqlx::query(
            "INSERT INTO agent_events (agent_id, event_type, payload, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&event.agent_id)
        .bind(&event.event_type)
        .bind(&payload)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "DELETE FROM agent_events WHERE agent_id = ? AND id NOT IN
             (SELECT id FROM agent_events WHERE agent_id = ? ORDER BY id DESC LIMIT ?)",
        )
        .bind(&event.agent_id)
        .bind(&event.agent_id)
        .bind(AGENT_EVENT_CAP)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM agent_events WHERE id = ?").bind(id).fetch_one(&self.pool).await?;
        Self::row_to_agent_event(&row)
    }

    async fn list_agent_events(&self, filter: AgentEventFilter) -> TownResult<Vec<AgentEvent>> {
        let mut sql = String::from("SELECT * FROM agent_events WHERE 1=1");
        if filter.agent_id.is_some() {
            sql.push_str(" AND agent_id = ?");
        }
        if filter.since_id.is_some() {
            sql.push_str(" AND id > ?");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(a) = &filter.agent_id {
            q = q.bind(a.clone());
        }
        if let Some(since_id) = filter.since_id {
            q = q.bind(since_id);
        }
        q = q.bind(filter.limit.unwrap_or(100));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_agent_event).collect()
    }
}
