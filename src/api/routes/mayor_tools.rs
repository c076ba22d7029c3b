//! Mayor tool-call routes: `/api/mayor/{townId}/tools/...`. Audience is the
//! town-level JWT (the mayor's own session token); each rig-scoped call
//! additionally confirms the rig belongs to the town via the rig registry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::domain::errors::TownError;
use crate::domain::models::{AgentFilter, BeadFilter, NewMail};
use crate::domain::ports::rig_belongs_to_town;
use crate::services::{mail, sling};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sling", post(tool_sling))
        .route("/rigs", get(tool_list_rigs))
        .route("/rigs/{rig_id}/beads", get(tool_rig_beads))
        .route("/rigs/{rig_id}/agents", get(tool_rig_agents))
        .route("/mail", post(tool_mail))
}

async fn require_rig(state: &AppState, town_id: &str, rig_id: &str) -> Result<(), ApiError> {
    if !rig_belongs_to_town(state.rigs.as_ref(), town_id, rig_id).await? {
        return Err(TownError::not_found(format!("rig {rig_id} in town {town_id}")).into());
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ToolSlingBody {
    pub rig_id: String,
    pub title: String,
    pub body: Option<String>,
    pub metadata: Option<Json_>,
}

async fn tool_sling(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
    Json(req): Json<ToolSlingBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;
    require_rig(&state, &town_id, &req.rig_id).await?;

    let result = town(&state)
        .sling(sling::SlingRequest {
            title: req.title,
            body: req.body,
            metadata: req.metadata,
            rig_id: Some(req.rig_id),
        })
        .await?;
    Ok((StatusCode::CREATED, ok(serde_json::json!({ "bead": result.bead, "agent": result.agent }))))
}

async fn tool_list_rigs(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let rigs = state.rigs.list_rigs(&town_id).await?;
    Ok(ok(rigs))
}

async fn tool_rig_beads(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    require_rig(&state, &town_id, &rig_id).await?;
    let beads = town(&state)
        .beads
        .list_beads(BeadFilter { rig: Some(rig_id), limit: Some(BeadFilter::DEFAULT_LIMIT), ..Default::default() })
        .await?;
    Ok(ok(beads))
}

async fn tool_rig_agents(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    require_rig(&state, &town_id, &rig_id).await?;
    let agents = town(&state).agents.list_agents(AgentFilter { rig_id: Some(rig_id), ..Default::default() }).await?;
    Ok(ok(agents))
}

#[derive(Debug, Deserialize)]
pub struct ToolMailBody {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

async fn tool_mail(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
    Json(body): Json<ToolMailBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;
    let t = town(&state);
    mail::send_mail(
        &t.beads,
        &t.agents,
        NewMail { from: body.from, to: body.to, subject: body.subject, body: body.body },
    )
    .await?;
    Ok((StatusCode::CREATED, ok(serde_json::json!({ "sent": true }))))
}
