//! Sign in and sign out. Only the session `user` key is touched here.

use crate::context::RequestScope;
use crate::error::AppError;
use crate::session::USER_KEY;
use crate::users::authenticate;
use axum::{
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// POST /login
pub async fn login(scope: RequestScope, Form(form): Form<LoginForm>) -> Result<impl IntoResponse, AppError> {
    let mut ctx = scope.lock().await;
    if !authenticate(ctx.db_mut()?, &form.username, &form.password).await? {
        tracing::info!(user = %form.username, "failed sign in");
        return Err(AppError::Unauthorized("invalid username or password".into()));
    }
    let username = form.username.trim().to_string();
    tracing::info!(user = %username, "signed in");
    ctx.session.insert(USER_KEY, username.clone());
    ctx.user = Some(username);
    Ok(Redirect::to("/"))
}

/// GET /logout
pub async fn logout(scope: RequestScope) -> impl IntoResponse {
    let mut ctx = scope.lock().await;
    if let Some(user) = ctx.user.take() {
        tracing::info!(user = %user, "signed out");
    }
    ctx.session.clear();
    Redirect::to("/")
}
