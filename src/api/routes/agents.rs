//! Agent routes: `/api/towns/{townId}/rigs/{rigId}/agents/...`.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_agent_match, check_town_path, town};
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::domain::errors::TownError;
use crate::domain::models::{
    AgentCompletionStatus, AgentDoneReport, AgentEventFilter, AgentFilter, AgentRole, AgentStatus,
    NewAgent,
};
use crate::domain::ports::get_or_create_agent;
use crate::services::{mail, molecule, review_queue};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(register_agent).get(list_agents))
        .route("/get-or-create", post(get_or_create))
        .route("/{id}", get(get_agent).delete(delete_agent))
        .route("/{id}/events", get(list_agent_events))
        .route("/{id}/hook", post(hook_bead).delete(unhook_bead))
        .route("/{id}/prime", get(prime))
        .route("/{id}/done", post(done))
        .route("/{id}/completed", post(completed))
        .route("/{id}/checkpoint", post(checkpoint))
        .route("/{id}/mail", get(get_mail))
        .route("/{id}/heartbeat", post(heartbeat))
        .route("/{id}/molecule/current", get(molecule_current))
        .route("/{id}/molecule/advance", post(molecule_advance))
}

#[derive(Debug, Deserialize)]
pub struct RegisterAgentBody {
    pub role: String,
    pub name: String,
    pub identity: String,
}

async fn register_agent(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Json(body): Json<RegisterAgentBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;
    let role = AgentRole::parse(&body.role).ok_or_else(|| {
        TownError::Validation(vec![crate::domain::errors::ValidationIssue::new("role", "unknown agent role")])
    })?;
    let agent = town(&state)
        .agents
        .register_agent(NewAgent { role, name: body.name, identity: body.identity, rig_id: Some(rig_id) })
        .await?;
    Ok((StatusCode::CREATED, ok(agent)))
}

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    pub role: Option<String>,
    pub status: Option<String>,
}

async fn list_agents(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Query(q): Query<ListAgentsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let filter = AgentFilter {
        role: q.role.as_deref().and_then(AgentRole::parse),
        status: q.status.as_deref().and_then(AgentStatus::parse),
        rig_id: Some(rig_id),
    };
    let agents = town(&state).agents.list_agents(filter).await?;
    Ok(ok(agents))
}

#[derive(Debug, Deserialize)]
pub struct GetOrCreateBody {
    pub role: String,
}

async fn get_or_create(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Json(body): Json<GetOrCreateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let role = AgentRole::parse(&body.role).ok_or_else(|| {
        TownError::Validation(vec![crate::domain::errors::ValidationIssue::new("role", "unknown agent role")])
    })?;
    let t = town(&state);
    let agent = get_or_create_agent(&t.agents, role, Some(rig_id.as_str()), &t.town_id).await?;
    Ok(ok(agent))
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let agent = town(&state).agents.get_agent(&id).await?.ok_or_else(|| TownError::not_found(format!("agent {id}")))?;
    Ok(ok(agent))
}

async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    check_town_path(&state, &town_id)?;
    town(&state).agents.delete_agent(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub after_id: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_agent_events(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    Query(q): Query<ListEventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let events = town(&state)
        .agents
        .list_agent_events(AgentEventFilter { agent_id: Some(id), since_id: q.after_id, limit: q.limit })
        .await?;
    Ok(ok(events))
}

#[derive(Debug, Deserialize)]
pub struct HookBody {
    pub bead_id: String,
}

async fn hook_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
    Json(body): Json<HookBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let agent = town(&state).agents.hook_bead(&id, &body.bead_id).await?;
    Ok(ok(agent))
}

async fn unhook_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let agent = town(&state).agents.unhook_bead(&id).await?;
    Ok(ok(agent))
}

async fn prime(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let t = town(&state);
    let agent = t.agents.get_agent(&id).await?.ok_or_else(|| TownError::not_found(format!("agent {id}")))?;
    let bead = t.agents.get_hooked_bead(&id).await?;
    let checkpoint = t.agents.read_checkpoint(&id).await?;
    Ok(ok(serde_json::json!({ "agent": agent, "bead": bead, "checkpoint": checkpoint })))
}

#[derive(Debug, Deserialize)]
pub struct DoneBody {
    pub branch: String,
    pub pr_url: Option<String>,
    pub summary: Option<String>,
}

async fn done(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
    Json(body): Json<DoneBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let t = town(&state);
    let entry = review_queue::agent_done(
        &t.beads,
        &t.agents,
        &t.satellites,
        &id,
        AgentDoneReport { branch: body.branch, pr_url: body.pr_url, summary: body.summary },
    )
    .await?;
    Ok(ok(entry))
}

#[derive(Debug, Deserialize)]
pub struct CompletedBody {
    pub status: String,
    pub reason: Option<String>,
}

async fn completed(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    Json(body): Json<CompletedBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let status = match body.status.as_str() {
        "completed" => AgentCompletionStatus::Completed,
        "failed" => AgentCompletionStatus::Failed,
        other => {
            return Err(TownError::Validation(vec![crate::domain::errors::ValidationIssue::new(
                "status",
                format!("unknown completion status '{other}'"),
            )])
            .into())
        }
    };
    let t = town(&state);
    review_queue::agent_completed(&t.beads, &t.agents, &id, status).await?;
    let _ = body.reason;
    Ok(ok(serde_json::json!({ "acknowledged": true })))
}

#[derive(Debug, Deserialize)]
pub struct CheckpointBody {
    pub data: Json_,
}

async fn checkpoint(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
    Json(body): Json<CheckpointBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    town(&state).agents.write_checkpoint(&id, body.data).await?;
    Ok(ok(serde_json::json!({ "saved": true })))
}

async fn get_mail(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let messages = mail::check_mail(&town(&state).beads, &id).await?;
    Ok(ok(messages))
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    town(&state).agents.touch_agent(&id).await?;
    Ok(ok(serde_json::json!({ "acknowledged": true })))
}

async fn molecule_current(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let t = town(&state);
    let hooked = t.agents.get_hooked_bead(&id).await?;
    let Some(hooked) = hooked else { return Ok(ok(serde_json::Value::Null)) };
    let Some(molecule_id) = hooked.parent_bead_id else { return Ok(ok(serde_json::Value::Null)) };
    let current = molecule::get_molecule(&t.beads, &molecule_id).await?;
    Ok(ok(current))
}

async fn molecule_advance(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    check_agent_match(&claims, &id)?;
    let t = town(&state);
    let advanced = molecule::advance_molecule_step(&t.beads, &t.agents, &id).await?;
    Ok(ok(advanced))
}
