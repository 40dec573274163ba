//! Admin endpoints, mounted only when `admin.api_key` is set.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/tiers", get(get_tiers))
        .route("/admin/flush", post(flush_pending))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
