//! The site router: module routes first, then home, static files, users and tools,
//! all wrapped by the request lifecycle.

use crate::handlers::{inventory::display, not_found};
use crate::lifecycle::request_lifecycle;
use crate::response::server_error;
use crate::routes::{tools_routes, user_routes};
use crate::state::AppState;
use axum::{middleware, response::Response, routing::get, Router};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

/// Request bodies are small forms.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "handler panicked");
    server_error()
}

/// Build the router once at startup. Routes are never added or removed afterwards.
pub fn site_routes(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .merge(state.modules.routes())
        .route("/", get(display))
        .nest_service("/static", static_files)
        .merge(user_routes())
        .merge(tools_routes())
        .fallback(not_found)
        // inside the lifecycle so a panicking handler still reaches teardown
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(state.clone(), request_lifecycle))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
