//! Town config routes: `GET/PATCH /api/towns/{townId}/config`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::{ok, ApiError};
use crate::api::routes::common::{check_town_path, town};
use crate::api::state::AppState;
use crate::domain::models::TownConfig;
use crate::domain::ports::keys;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_config).patch(patch_config))
}

async fn load_config(t: &crate::town::Town) -> Result<TownConfig, ApiError> {
    match t.kv.get(keys::TOWN_CONFIG).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(TownConfig::default()),
    }
}

async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let config = load_config(&town(&state)).await?;
    Ok(ok(config))
}

#[derive(Debug, Deserialize)]
pub struct PatchConfigBody {
    pub env_vars: Option<BTreeMap<String, String>>,
    pub default_model: Option<String>,
    pub refinery_enabled: Option<bool>,
    pub git_auth_secret: Option<String>,
}

async fn patch_config(
    State(state): State<Arc<AppState>>,
    Path(town_id): Path<String>,
    Json(body): Json<PatchConfigBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_town_path(&state, &town_id)?;
    let t = town(&state);
    let mut config = load_config(&t).await?;

    if let Some(patch) = body.env_vars {
        config.apply_env_patch(patch);
    }
    if let Some(model) = body.default_model {
        config.default_model = model;
    }
    if let Some(enabled) = body.refinery_enabled {
        config.refinery_enabled = enabled;
    }
    if let Some(secret) = body.git_auth_secret {
        if !secret.starts_with(crate::domain::models::SECRET_MASK_PREFIX) {
            config.git_auth_secret = Some(secret);
        }
    }

    t.kv.set(keys::TOWN_CONFIG, &serde_json::to_string(&config)?).await?;
    Ok(ok(config))
}
