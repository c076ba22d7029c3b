//! Bead routes: `/api/towns/{townId}/rigs/{rigId}/beads/...`.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::domain::errors::TownError;
use crate::domain::models::{BeadFilter, BeadStatus, BeadType, NewBead};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_bead).get(list_beads))
        .route("/{id}", get(get_bead).delete(delete_bead))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/close", post(close_bead))
}

/// `POST /api/towns/{townId}/rigs/{rigId}/sling` — a sibling of the beads
/// collection rather than a beads sub-route, kept here since it shares the
/// bead-creation validation.
pub fn sling_router() -> Router<Arc<AppState>> {
    Router::new().route("/sling", post(sling))
}

#[derive(Debug, Deserialize)]
pub struct SlingBody {
    pub title: String,
    pub body: Option<String>,
    pub metadata: Option<Json_>,
}

async fn sling(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Json(req): Json<SlingBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;

    let mut v = crate::api::validation::Validator::new();
    v.require_non_empty("title", &req.title);
    v.finish()?;

    let result = town(&state)
        .sling(crate::services::SlingRequest {
            title: req.title,
            body: req.body,
            metadata: req.metadata,
            rig_id: Some(rig_id),
        })
        .await?;

    Ok((StatusCode::CREATED, ok(serde_json::json!({ "bead": result.bead, "agent": result.agent }))))
}

#[derive(Debug, Deserialize)]
pub struct CreateBeadBody {
    #[serde(rename = "type")]
    pub bead_type: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
    pub metadata: Option<Json_>,
    pub parent_bead_id: Option<String>,
    pub assignee_agent_bead_id: Option<String>,
}

async fn create_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Json(body): Json<CreateBeadBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;

    let mut v = crate::api::validation::Validator::new();
    v.require_non_empty("title", &body.title);
    v.finish()?;

    let bead_type = match &body.bead_type {
        Some(t) => crate::api::validation::validate_bead_type("type", t)?,
        None => BeadType::Issue,
    };
    let priority = match &body.priority {
        Some(p) => Some(crate::api::validation::validate_priority("priority", p)?),
        None => None,
    };

    let bead = town(&state)
        .beads
        .create_bead(NewBead {
            bead_type,
            title: body.title,
            body: body.body,
            rig_id: Some(rig_id),
            parent_bead_id: body.parent_bead_id,
            assignee_agent_bead_id: body.assignee_agent_bead_id,
            priority,
            labels: body.labels,
            metadata: body.metadata,
            created_by: None,
        })
        .await?;

    Ok((StatusCode::CREATED, ok(bead)))
}

#[derive(Debug, Deserialize)]
pub struct ListBeadsQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub bead_type: Option<String>,
    pub assignee: Option<String>,
    pub parent: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list_beads(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Query(q): Query<ListBeadsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;

    let filter = BeadFilter {
        status: q.status.as_deref().and_then(BeadStatus::parse),
        bead_type: q.bead_type.as_deref().and_then(BeadType::parse),
        assignee: q.assignee,
        parent: q.parent,
        rig: Some(rig_id),
        limit: q.limit,
        offset: q.offset,
    };
    let beads = town(&state).beads.list_beads(filter).await?;
    Ok(ok(beads))
}

async fn get_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let bead = town(&state).beads.get_bead(&id).await?.ok_or_else(|| TownError::not_found(format!("bead {id}")))?;
    Ok(ok(bead))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub agent_id: Option<String>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let status = BeadStatus::parse(&body.status).ok_or_else(|| {
        TownError::Validation(vec![crate::domain::errors::ValidationIssue::new("status", "unknown bead status")])
    })?;
    let bead = town(&state).beads.update_bead_status(&id, status, body.agent_id.as_deref()).await?;
    Ok(ok(bead))
}

#[derive(Debug, Deserialize, Default)]
pub struct CloseBeadBody {
    pub agent_id: Option<String>,
}

async fn close_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
    claims: Option<Extension<Claims>>,
    body: Option<Json<CloseBeadBody>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let agent_id = body
        .and_then(|Json(b)| b.agent_id)
        .or_else(|| claims.map(|Extension(c)| c.agent_id));
    let bead = crate::domain::ports::close_bead(&town(&state).beads, &id, agent_id.as_deref()).await?;
    Ok(ok(bead))
}

async fn delete_bead(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    check_town_path(&state, &town_id)?;
    town(&state).beads.delete_bead(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
