//! Mayor routes: `/api/towns/{townId}/mayor/...`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::check_town_path;
use crate::api::state::AppState;
use crate::domain::errors::TownError;
use crate::domain::models::AgentCompletionStatus;
use crate::mayor::MayorSessionManager;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/message", post(send_message))
        .route("/status", get(status))
        .route("/completed", post(completed))
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
    pub model: Option<String>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let t = &state.town;
    let manager = MayorSessionManager::new(&t.kv, t.runtime.as_ref(), t.tokens.as_ref());
    manager.send_message(body.message, body.model).await?;
    Ok(ok(serde_json::json!({ "sent": true })))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let t = &state.town;
    let manager = MayorSessionManager::new(&t.kv, t.runtime.as_ref(), t.tokens.as_ref());
    Ok(ok(manager.status().await?))
}

#[derive(Debug, Deserialize)]
pub struct CompletedBody {
    pub status: String,
    pub reason: Option<String>,
    pub agent_id: Option<String>,
}

async fn completed(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
    Json(body): Json<CompletedBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let _status = match body.status.as_str() {
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
    let t = &state.town;
    let manager = MayorSessionManager::new(&t.kv, t.runtime.as_ref(), t.tokens.as_ref());
    if let Some(agent_id) = body.agent_id {
        manager.agent_completed(&agent_id).await?;
    }
    let _ = body.reason;
    Ok(ok(serde_json::json!({ "acknowledged": true })))
}
