//! `POST /api/towns/{townId}/rigs/{rigId}/molecules`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::services::molecule;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(create_molecule))
}

#[derive(Debug, Deserialize)]
pub struct CreateMoleculeBody {
    pub source_bead_id: String,
    pub formula: Vec<String>,
}

async fn create_molecule(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id)): Path<(String, String)>,
    Json(body): Json<CreateMoleculeBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;

    let mut v = crate::api::validation::Validator::new();
    v.check("formula", !body.formula.is_empty(), "must contain at least one step");
    v.finish()?;

    let t = town(&state);
    let created = molecule::create_molecule(&t.beads, &body.source_bead_id, body.formula).await?;
    Ok((StatusCode::CREATED, ok(created)))
}
