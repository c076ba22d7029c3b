//! axum HTTP edge: routes, middleware, and error mapping for one town.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let rig_scoped = Router::new()
        .nest("/beads", routes::beads::router())
        .merge(routes::beads::sling_router())
        .nest("/agents", routes::agents::router())
        .nest("/mail", routes::mail::router())
        .nest("/review-queue", routes::review_queue::router())
        .nest("/escalations", routes::escalations::router())
        .nest("/molecules", routes::molecules::router());

    let town_scoped = Router::new()
        .nest("/rigs/{rig_id}", rig_scoped)
        .nest("/config", routes::config::router())
        .nest("/mayor", routes::mayor::router());

    let mayor_tools = Router::new().nest("/tools", routes::mayor_tools::router());

    let api = Router::new()
        .nest("/towns/{town_id}", town_scoped)
        .nest("/mayor/{town_id}", mayor_tools)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "town_id": state.town.town_id }))
}
