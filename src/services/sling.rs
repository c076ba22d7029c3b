//! Sling orchestrator — atomic create-bead + pick-agent +
//! hook, avoiding a TOCTOU window between the three steps.

use serde_json::Value as Json;
use tracing::instrument;

use crate::domain::errors::TownResult;
use crate::domain::models::{Agent, AgentRole, Bead, BeadType, NewBead};
use crate::domain::ports::{get_or_create_agent, AgentRepository, BeadRepository, KvStore};
use crate::scheduler::alarm;

#[derive(Debug, Clone)]
pub struct SlingRequest {
    pub title: String,
    pub body: Option<String>,
    pub metadata: Option<Json>,
    pub rig_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlingResult {
    pub bead: Bead,
    pub agent: Agent,
}

#[instrument(skip(beads, agents, kv, request), fields(title = %request.title))]
pub async fn sling_bead(
    beads: &dyn BeadRepository,
    agents: &dyn AgentRepository,
    kv: &dyn KvStore,
    town_id: &str,
    request: SlingRequest,
) -> TownResult<SlingResult> {
    let bead = beads
        .create_bead(NewBead {
            bead_type: BeadType::Issue,
            title: request.title,
            body: request.body,
            rig_id: request.rig_id.clone(),
            metadata: request.metadata,
            ..Default::default()
        })
        .await?;

    let agent = get_or_create_agent(agents, AgentRole::Polecat, request.rig_id.as_deref(), town_id).await?;
    let agent = agents.hook_bead(&agent.id, &bead.id).await?;
    alarm::arm_alarm(kv).await?;

    let bead = beads.get_bead(&bead.id).await?.unwrap_or(bead);
    Ok(SlingResult { bead, agent })
}
