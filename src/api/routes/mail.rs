//! `POST /api/towns/{townId}/rigs/{rigId}/mail`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::domain::models::NewMail;
use crate::services::mail;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(send_mail))
}

#[derive(Debug, Deserialize)]
pub struct SendMailBody {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

async fn send_mail(
    State(state): State<Arc<AppState>>,
    Path((town_id, _rig_id)): Path<(String, String)>,
    Json(body): Json<SendMailBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_town_path(&state, &town_id)?;

    let mut v = crate::api::validation::Validator::new();
    v.require_non_empty("to", &body.to);
    v.require_non_empty("subject", &body.subject);
    v.finish()?;

    let t = town(&state);
    mail::send_mail(
        &t.beads,
        &t.agents,
        NewMail { from: body.from, to: body.to, subject: body.subject, body: body.body },
    )
    .await?;
    Ok((StatusCode::CREATED, ok(serde_json::json!({ "sent": true }))))
}
