#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde_json::Value;
use shotglass_inventory::{site_routes, AppState, SiteConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

pub struct Site {
    pub dir: TempDir,
    pub state: AppState,
}

impl Site {
    pub fn db_path(&self) -> PathBuf {
        self.state.config.database_path.clone()
    }

    pub fn router(&self) -> Router {
        site_routes(self.state.clone())
    }
}

pub fn config_in(dir: &Path) -> SiteConfig {
    SiteConfig {
        database_path: dir.join("data/site.sqlite"),
        secret_key: "test-secret".into(),
        static_dir: dir.join("static"),
        ..SiteConfig::default()
    }
}

pub fn site_with(configure: impl FnOnce(&mut SiteConfig)) -> Site {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    configure(&mut config);
    Site {
        state: AppState::new(config),
        dir,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> Response<Body> {
    app.oneshot(req).await.unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

/// `name=value` part of the response's Set-Cookie header.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

pub fn menu_titles(page: &Value) -> Vec<String> {
    page["meta"]["menu_items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect()
}
