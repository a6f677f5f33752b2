use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::access::{require_access, LOGIN_ROUTE};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let prefix = state.config.route_prefix.clone();

    // Everything here sits behind the access gate.
    let gated = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api",
            post(handlers::upload).layer(DefaultBodyLimit::disable()),
        )
        .route(&prefix, get(handlers::download_empty))
        .route(&format!("{prefix}*reference"), get(handlers::download))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_access,
        ));

    Router::new()
        .route(LOGIN_ROUTE, get(handlers::login_page).post(handlers::login))
        .route("/_internal/health", get(handlers::health))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
