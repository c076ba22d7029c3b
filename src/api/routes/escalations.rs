//! `POST /api/towns/{townId}/rigs/{rigId}/escalations`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::domain::models::{BeadType, NewBead, Severity};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(create_escalation))
}

#[derive(Debug, Deserialize)]
pub struct CreateEscalationBody {
    pub title: String,
    pub body: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<Json_>,
}

async fn create_escalation(
    State(state): State<Arc<AppState>>,
    Path((town_id, rig_id)): Path<(String, String)>,
    Json(body): Json<CreateEscalationBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;

    let mut v = crate::api::validation::Validator::new();
    v.require_non_empty("title", &body.title);
    v.finish()?;

    let priority = match &body.priority {
        Some(p) => Some(crate::api::validation::validate_priority("priority", p)?),
        None => None,
    };
    let severity = body.severity.as_deref().and_then(Severity::parse).unwrap_or(Severity::Medium);

    let t = town(&state);
    let bead = t
        .beads
        .create_bead(NewBead {
            bead_type: BeadType::Escalation,
            title: body.title,
            body: body.body,
            rig_id: Some(rig_id),
            priority,
            metadata: body.metadata,
            ..Default::default()
        })
        .await?;

    t.satellites.create_escalation_metadata(&bead.id, severity, body.category.as_deref()).await?;

    Ok((StatusCode::CREATED, ok(bead)))
}
