//! Before-request pipeline and teardown, composed around every handler as one middleware.
//!
//! Order per request:
//! 1. SSL enforcement (redirect, stop)
//! 2. instance-path guard (404, stop)
//! 3. apply host configuration and template search dirs
//! 4. open the database (initializing a new file)
//! 5. mark the session permanent
//! 6. resolve the signed-in user from the session
//! 7. build the authorization context
//! 8. build the menu from the active module
//! 9. register baseline permissions
//!
//! Teardown closes the database on every exit path, then the session is written back.

use crate::context::{RequestContext, RequestScope};
use crate::db::get_db;
use crate::error::AppError;
use crate::session::USER_KEY;
use crate::state::AppState;
use crate::users::{Admin, ADMIN_RANK};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Path marker of the private instance directory; never served.
pub const INSTANCE_MARKER: &str = "instance";

pub const VIEW_LOG_URL: &str = "/tools/view_log";
pub const VIEW_LOG_TITLE: &str = "View Log";

/// What the pipeline needs from the request, copied out so the request itself is not held across awaits.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub host: Option<String>,
    /// Path plus query.
    pub target: String,
    pub secure: bool,
}

impl RequestInfo {
    pub fn from_request(req: &Request) -> Self {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .or_else(|| req.uri().authority().map(|a| a.to_string()));
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        RequestInfo {
            host,
            target,
            secure: is_secure(req.uri().scheme_str(), req.headers()),
        }
    }

    /// Absolute URL as the client asked for it.
    pub fn url(&self, fallback_host: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host.as_deref().unwrap_or(fallback_host), self.target)
    }
}

fn is_secure(scheme: Option<&str>, headers: &HeaderMap) -> bool {
    scheme.map(|s| s.eq_ignore_ascii_case("https")).unwrap_or(false)
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or_default().trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

/// Outcome of the before-request pipeline.
pub enum Flow {
    Continue,
    Respond(Response),
}

fn redirect_found(location: &str) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| AppError::BadRequest("request URL is not a valid header value".into()))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Step 1: redirect insecure requests when SSL is required.
pub fn enforce_ssl(state: &AppState, info: &RequestInfo) -> Result<Option<Response>, AppError> {
    if !state.config.require_ssl || info.secure {
        return Ok(None);
    }
    let url = info.url(&state.config.host_name).replacen("http://", "https://", 1);
    tracing::debug!(url = %url, "redirecting to https");
    redirect_found(&url).map(Some)
}

/// Step 2: anything addressing the instance directory is not found.
pub fn is_instance_path(info: &RequestInfo) -> bool {
    info.target.contains(INSTANCE_MARKER)
}

/// Steps 3–9. Errors propagate to the 500 page.
pub async fn build_context(state: &AppState, ctx: &mut RequestContext, info: &RequestInfo) -> Result<(), AppError> {
    ctx.site = state.config.resolve_for_host(info.host.as_deref());
    tracing::debug!(host = %ctx.site.host_name, templates = ?ctx.site.template_dirs, "applied site config");

    get_db(state, ctx, None).await?;

    ctx.session.set_permanent(true);

    ctx.user = ctx.session.get_str(USER_KEY).map(str::to_owned);

    let user = ctx.user.clone();
    let mut admin = Admin::new(ctx.db_mut()?, user.as_deref()).await?;

    ctx.menu_items = state.modules.build_menu(ctx.site.module.as_deref(), &mut admin);

    register_baseline(&mut admin);
    ctx.admin = Some(admin);
    Ok(())
}

/// Permission entries present on every site regardless of module.
pub fn register_baseline(admin: &mut Admin) {
    admin.register("user", VIEW_LOG_URL, VIEW_LOG_TITLE, true, ADMIN_RANK);
}

pub async fn before_request(state: &AppState, scope: &RequestScope, info: &RequestInfo) -> Result<Flow, AppError> {
    if let Some(resp) = enforce_ssl(state, info)? {
        return Ok(Flow::Respond(resp));
    }
    if is_instance_path(info) {
        tracing::debug!(path = %info.target, "blocked instance path");
        return Ok(Flow::Respond(AppError::NotFound(info.target.clone()).into_response()));
    }
    let mut ctx = scope.lock().await;
    build_context(state, &mut ctx, info).await?;
    Ok(Flow::Continue)
}

/// Release request resources. Never fails; a close error is only logged.
pub async fn teardown(scope: &RequestScope) -> bool {
    scope.lock().await.teardown().await
}

/// Middleware running the pipeline, the handler, and teardown for every request.
pub async fn request_lifecycle(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let info = RequestInfo::from_request(&req);
    let session = state.sessions.load(req.headers()).await;
    let scope = RequestScope::new(RequestContext::new(session));

    let mut response = match before_request(&state, &scope, &info).await {
        Ok(Flow::Continue) => {
            req.extensions_mut().insert(scope.clone());
            next.run(req).await
        }
        Ok(Flow::Respond(resp)) => resp,
        Err(e) => e.into_response(),
    };

    teardown(&scope).await;

    let ctx = scope.lock().await;
    match state.sessions.save(&ctx.session).await {
        Ok(Some(cookie)) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "failed to save session"),
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn info(target: &str, secure: bool) -> RequestInfo {
        RequestInfo {
            host: Some("shop.example.com".into()),
            target: target.into(),
            secure,
        }
    }

    #[test]
    fn request_info_reads_forwarded_proto() {
        let req = axum::http::Request::builder()
            .uri("/item/?q=1")
            .header(header::HOST, "shop.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let info = RequestInfo::from_request(&req);
        assert!(info.secure);
        assert_eq!(info.target, "/item/?q=1");
        assert_eq!(info.url("localhost"), "https://shop.example.com/item/?q=1");
    }

    #[test]
    fn instance_marker_anywhere_in_target() {
        assert!(is_instance_path(&info("/instance/site_settings.json", false)));
        assert!(is_instance_path(&info("/static/../instance/db", false)));
        assert!(is_instance_path(&info("/item/?file=instance", false)));
        assert!(!is_instance_path(&info("/item/", false)));
    }

    #[test]
    fn ssl_redirect_only_when_required_and_insecure() {
        let mut config = crate::config::SiteConfig {
            secret_key: "k".into(),
            ..Default::default()
        };
        let state = AppState::new(config.clone());
        assert!(enforce_ssl(&state, &info("/", false)).unwrap().is_none());

        config.require_ssl = true;
        let state = AppState::new(config);
        assert!(enforce_ssl(&state, &info("/", true)).unwrap().is_none());
        let resp = enforce_ssl(&state, &info("/item/?a=b", false)).unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://shop.example.com/item/?a=b"
        );
    }
}
