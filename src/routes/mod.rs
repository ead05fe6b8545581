//! Route groups merged by [`site_routes`].

pub mod site;

use crate::handlers::{inventory, tools, users};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub use site::site_routes;

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/item/", get(inventory::display))
        .route("/item/stock_report", get(inventory::stock_report))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(users::login))
        .route("/logout", get(users::logout))
}

pub fn tools_routes() -> Router<AppState> {
    Router::new().route("/tools/view_log", get(tools::view_log))
}
