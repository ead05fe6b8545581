//! HTTP handlers for the inventory views, sign in/out, tools and the 404 fallback.

pub mod inventory;
pub mod tools;
pub mod users;

use crate::error::AppError;
use axum::http::Uri;

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
