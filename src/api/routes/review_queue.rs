//! Review queue routes: `/api/towns/{townId}/rigs/{rigId}/review-queue/...`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::domain::errors::TownError;
use crate::domain::models::{ReviewResult, ReviewResultStatus, SubmitReview};
use crate::services::review_queue;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit))
        .route("/{entry_id}/complete", post(complete))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub agent_id: String,
    pub bead_id: String,
    pub branch: String,
    pub pr_url: Option<String>,
    pub summary: Option<String>,
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id)): Path<(String, String)>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;
    let t = town(&state);
    let entry = review_queue::submit_to_review_queue(
        &t.beads,
        &t.satellites,
        SubmitReview {
            agent_id: body.agent_id,
            bead_id: body.bead_id,
            branch: body.branch,
            pr_url: body.pr_url,
            summary: body.summary,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, ok(entry)))
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub status: String,
    pub message: Option<String>,
    pub commit_sha: Option<String>,
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id, entry_id)): Path<(String, String, String)>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let status = match body.status.as_str() {
        "merged" => ReviewResultStatus::Merged,
        "failed" => ReviewResultStatus::Failed,
        "conflict" => ReviewResultStatus::Conflict,
        other => {
            return Err(TownError::Validation(vec![crate::domain::errors::ValidationIssue::new(
                "status",
                format!("unknown review result '{other}'"),
            )])
            .into())
        }
    };
    let t = town(&state);
    review_queue::complete_review_with_result(
        &t.beads,
        &t.satellites,
        ReviewResult { entry_id, status, message: body.message, commit_sha: body.commit_sha },
    )
    .await?;
    Ok(ok(serde_json::json!({ "completed": true })))
}
