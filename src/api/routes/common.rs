//! Shared extraction helpers used by every route handler.

use std::sync::Arc;

use axum::extract::Extension;

use crate::api::error::ApiError;
use crate::api::middleware::require_agent_match;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::domain::errors::TownError;
use crate::town::Town;

pub fn require_claims(claims: Option<Extension<Claims>>) -> Result<Claims, ApiError> {
    claims.map(|Extension(c)| c).ok_or_else(|| {
        TownError::Auth(crate::domain::errors::AuthError::Malformed("no claims on request".to_string())).into()
    })
}

/// In development mode the auth middleware never ran, so there is nothing
/// to compare against — agent-scoped routes only enforce the match when
/// claims are actually present.
pub fn check_agent_match(claims: &Option<Extension<Claims>>, path_agent_id: &str) -> Result<(), ApiError> {
    match claims {
        Some(Extension(c)) => require_agent_match(c, path_agent_id).map_err(ApiError::from),
        None => Ok(()),
    }
}

pub fn check_town_path(state: &AppState, town_id: &str) -> Result<(), ApiError> {
    if state.town.town_id != town_id {
        return Err(TownError::not_found(format!("town {town_id}")).into());
    }
    Ok(())
}

pub fn town(state: &Arc<AppState>) -> Arc<Town> {
    state.town.clone()
}
