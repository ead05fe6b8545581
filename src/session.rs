//! Request session: a small JSON map carried in a signed cookie.

use crate::config::SiteConfig;
use crate::error::AppError;
use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Session key holding the signed-in username.
pub const USER_KEY: &str = "user";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    values: Map<String, Value>,
    #[serde(default)]
    permanent: bool,
    #[serde(skip)]
    modified: bool,
    /// The client sent a valid session cookie.
    #[serde(skip)]
    existing: bool,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
        self.modified = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.modified = true;
        }
    }

    pub fn set_permanent(&mut self, permanent: bool) {
        if self.permanent != permanent {
            self.permanent = permanent;
            self.modified = true;
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Where sessions live between requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session for the incoming request; empty when absent or invalid.
    async fn load(&self, headers: &HeaderMap) -> Session;

    /// `Set-Cookie` value to attach to the response, if any.
    async fn save(&self, session: &Session) -> Result<Option<HeaderValue>, AppError>;
}

pub struct CookieSessionStore {
    secret: Vec<u8>,
    cookie_name: String,
    lifetime_secs: u64,
    secure: bool,
}

impl CookieSessionStore {
    pub fn new(secret: &[u8], cookie_name: &str, lifetime_secs: u64, secure: bool) -> Self {
        CookieSessionStore {
            secret: secret.to_vec(),
            cookie_name: cookie_name.to_string(),
            lifetime_secs,
            secure,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        CookieSessionStore::new(
            config.secret_key.as_bytes(),
            &config.session_cookie_name,
            config.permanent_session_lifetime,
            config.require_ssl,
        )
    }

    fn sign(&self, payload: &str) -> String {
        // secret on both sides of the payload so the digest cannot be extended
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(payload.as_bytes());
        hasher.update(&self.secret);
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    pub fn encode(&self, session: &Session) -> Result<String, AppError> {
        let json = serde_json::to_vec(session).map_err(|e| AppError::Session(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(&payload);
        Ok(format!("{}.{}", payload, signature))
    }

    pub fn decode(&self, value: &str) -> Option<Session> {
        let (payload, signature) = value.split_once('.')?;
        let expected = self.sign(payload);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            tracing::debug!("session cookie signature mismatch");
            return None;
        }
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let mut session: Session = serde_json::from_slice(&json).ok()?;
        session.existing = true;
        Some(session)
    }

    fn cookie_value<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
    }

    fn attributes(&self) -> String {
        let mut attrs = String::from("Path=/; HttpOnly; SameSite=Lax");
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn load(&self, headers: &HeaderMap) -> Session {
        self.cookie_value(headers)
            .and_then(|v| self.decode(v))
            .unwrap_or_default()
    }

    async fn save(&self, session: &Session) -> Result<Option<HeaderValue>, AppError> {
        let cookie = if session.is_empty() {
            if !session.existing {
                return Ok(None);
            }
            format!("{}=; Max-Age=0; {}", self.cookie_name, self.attributes())
        } else if session.is_modified() || session.is_permanent() {
            let mut cookie = format!("{}={}; {}", self.cookie_name, self.encode(session)?, self.attributes());
            if session.is_permanent() {
                cookie.push_str(&format!("; Max-Age={}", self.lifetime_secs));
            }
            cookie
        } else {
            return Ok(None);
        };
        HeaderValue::from_str(&cookie)
            .map(Some)
            .map_err(|e| AppError::Session(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CookieSessionStore {
        CookieSessionStore::new(b"test-secret", "session", 3600, false)
    }

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[tokio::test]
    async fn signed_cookie_loads_back() {
        let store = store();
        let mut session = Session::default();
        session.insert(USER_KEY, "doris");
        session.set_permanent(true);
        let value = store.encode(&session).unwrap();

        let loaded = store.load(&headers_with(&format!("theme=dark; session={}", value))).await;
        assert_eq!(loaded.get_str(USER_KEY), Some("doris"));
        assert!(loaded.is_permanent());
        assert!(!loaded.is_modified());
    }

    #[tokio::test]
    async fn tampered_cookie_is_ignored() {
        let store = store();
        let mut session = Session::default();
        session.insert(USER_KEY, "doris");
        let value = store.encode(&session).unwrap();
        let (_, sig) = value.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"values":{"user":"admin"}}"#);
        let forged = format!("{}.{}", forged_payload, sig);

        assert!(store.load(&headers_with(&format!("session={}", forged))).await.is_empty());
        assert!(store.load(&headers_with("session=garbage")).await.is_empty());

        let other = CookieSessionStore::new(b"other-secret", "session", 3600, false);
        assert!(other.load(&headers_with(&format!("session={}", value))).await.is_empty());
    }

    #[tokio::test]
    async fn save_rules() {
        let store = CookieSessionStore::new(b"k", "session", 60, true);

        assert!(store.save(&Session::default()).await.unwrap().is_none());

        let mut session = Session::default();
        session.insert(USER_KEY, "doris");
        session.set_permanent(true);
        let cookie = store.save(&session).await.unwrap().unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.contains("Secure"));

        let mut loaded = store.decode(cookie.trim_start_matches("session=").split(';').next().unwrap()).unwrap();
        loaded.clear();
        let expired = store.save(&loaded).await.unwrap().unwrap();
        assert!(expired.to_str().unwrap().contains("Max-Age=0"));
    }
}
