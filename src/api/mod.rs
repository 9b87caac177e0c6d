//! HTTP surface of the dashboard.
//!
//! - /config, /weather, /system, /shutdown — dashboard widgets
//! - /login, /callback, /token             — Spotify authorization
//! - /spotify/*                            — Spotify Web API proxy
//! - everything else                       — static frontend

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    routes::dashboard_router(state)
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
}
