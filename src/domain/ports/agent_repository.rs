//! Agent repository port.

use async_trait::async_trait;

use crate::domain::errors::TownResult;
use crate::domain::models::{
    Agent, AgentEvent, AgentEventFilter, AgentFilter, AgentRole, AgentStatus, Bead, Checkpoint,
    NewAgent, NewAgentEvent,
};

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn register_agent(&self, input: NewAgent) -> TownResult<Agent>;
    async fn get_agent(&self, id: &str) -> TownResult<Option<Agent>>;
    async fn get_agent_by_identity(&self, identity: &str) -> TownResult<Option<Agent>>;
    async fn list_agents(&self, filter: AgentFilter) -> TownResult<Vec<Agent>>;
    async fn update_agent_status(&self, id: &str, status: AgentStatus) -> TownResult<Agent>;

    /// Unassigns any bead the agent was hooked to (sets assignee NULL, bead
    /// status back to `open`), deletes the satellite row, and deletes the bead.
    async fn delete_agent(&self, id: &str) -> TownResult<()>;

    /// The GUPP discipline. Returns `Ok` on no-op (already hooked
    /// to the same bead) and `Err(TownError::Conflict("AlreadyHookedElsewhere"))`
    /// when hooked to a different bead.
    async fn hook_bead(&self, agent_id: &str, bead_id: &str) -> TownResult<Agent>;

    async fn unhook_bead(&self, agent_id: &str) -> TownResult<Agent>;
    async fn get_hooked_bead(&self, agent_id: &str) -> TownResult<Option<Bead>>;

    async fn write_checkpoint(&self, agent_id: &str, data: Checkpoint) -> TownResult<()>;
    async fn read_checkpoint(&self, agent_id: &str) -> TownResult<Option<Checkpoint>>;

    async fn touch_agent(&self, agent_id: &str) -> TownResult<()>;

    /// Atomically increments `dispatch_attempts` and returns the new value,
    /// so the scheduler's circuit breaker check and the write happen as one
    /// SQL statement.
    async fn increment_dispatch_attempts(&self, agent_id: &str) -> TownResult<u32>;
    async fn reset_dispatch_attempts(&self, agent_id: &str) -> TownResult<()>;

    /// Picks the first name in [`crate::domain::models::POLECAT_NAME_POOL`]
    /// not currently used by any live (non-dead) polecat, falling back to
    /// `Polecat-{n+1}` once the pool is exhausted.
    async fn allocate_polecat_name(&self) -> TownResult<String>;

    /// Insert-only; prunes `agent_events` down to
    /// [`crate::scheduler::constants::AGENT_EVENT_CAP`] rows per agent.
    async fn log_agent_event(&self, event: NewAgentEvent) -> TownResult<AgentEvent>;
    async fn list_agent_events(&self, filter: AgentEventFilter) -> TownResult<Vec<AgentEvent>>;
}

/// `GetOrCreateAgent` needs both the agent repo (to look up or
/// register) and the naming/identity conventions, so it is implemented as a
/// free function composed over the trait rather than a trait method —
/// mirrors how `CloseBead` is layered over `UpdateBeadStatus`.
pub async fn get_or_create_agent(
    repo: &dyn AgentRepository,
    role: AgentRole,
    rig_id: Option<&str>,
    town_id: &str,
) -> TownResult<Agent> {
    if role.is_singleton() {
        let existing = repo
            .list_agents(AgentFilter { role: Some(role), status: None, rig_id: rig_id.map(str::to_string) })
            .await?;
        if let Some(agent) = existing.into_iter().next() {
            return Ok(agent);
        }
    } else {
        let idle_unhooked = repo
            .list_agents(AgentFilter {
                role: Some(role),
                status: Some(AgentStatus::Idle),
                rig_id: rig_id.map(str::to_string),
            })
            .await?
            .into_iter()
            .find(|a| a.current_hook_bead_id.is_none());
        if let Some(agent) = idle_unhooked {
            return Ok(agent);
        }
    }

    let name = if role.is_singleton() {
        capitalize(role.as_str())
    } else {
        repo.allocate_polecat_name().await?
    };
    let rig_fragment = rig_id.map(|r| short_id(r)).unwrap_or_default();
    let identity = format!("{name}-{role}-{rig_fragment}@{}", short_id(town_id));
    repo.register_agent(NewAgent { role, name, identity, rig_id: rig_id.map(str::to_string) })
        .await
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
