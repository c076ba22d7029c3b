//! JWT verification middleware. Rejects missing/expired/malformed tokens
//! with 401 and town/rig audience mismatches with 403. Disabled entirely
//! when `ENVIRONMENT=development`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::domain::errors::{AuthError, TownError};

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.environment.auth_disabled() {
        return Ok(next.run(req).await);
    }

    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| TownError::Auth(AuthError::Malformed("missing bearer token".to_string())))?;

    let claims = state.tokens.verify(token)?;

    for marker in ["towns", "mayor"] {
        if let Some(town_id) = path_segment_after(req.uri().path(), marker) {
            if town_id != claims.town_id {
                return Err(TownError::Auth(AuthError::AudienceMismatch {
                    expected: claims.town_id.clone(),
                    actual: town_id.to_string(),
                })
                .into());
            }
        }
    }
    if let Some(rig_id) = path_segment_after(req.uri().path(), "rigs") {
        if rig_id != claims.rig_id {
            return Err(TownError::Auth(AuthError::AudienceMismatch {
                expected: claims.rig_id.clone(),
                actual: rig_id.to_string(),
            })
            .into());
        }
    }

    let mut req = req;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Enforces that the JWT's `agentId` matches the `{id}` path segment on
/// agent-scoped routes (hook, prime, done, checkpoint, mail, heartbeat).
pub fn require_agent_match(claims: &Claims, path_agent_id: &str) -> Result<(), TownError> {
    if claims.agent_id != path_agent_id {
        return Err(TownError::Auth(AuthError::AudienceMismatch {
            expected: claims.agent_id.clone(),
            actual: path_agent_id.to_string(),
        }));
    }
    Ok(())
}

fn path_segment_after<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let mut segments = path.split('/');
    while let Some(seg) = segments.next() {
        if seg == marker {
            return segments.next();
        }
    }
    None
}
