//! Request-scoped state built by the before-request pipeline and handed to handlers.

use crate::config::ActiveSite;
use crate::db::DatabaseHandle;
use crate::error::AppError;
use crate::modules::MenuItem;
use crate::session::Session;
use crate::users::Admin;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct RequestContext {
    pub site: ActiveSite,
    pub session: Session,
    pub db: Option<DatabaseHandle>,
    /// Signed-in username; `None` for anonymous requests.
    pub user: Option<String>,
    pub admin: Option<Admin>,
    pub menu_items: Vec<MenuItem>,
}

impl RequestContext {
    pub fn new(session: Session) -> Self {
        RequestContext {
            session,
            ..RequestContext::default()
        }
    }

    pub fn db_mut(&mut self) -> Result<&mut DatabaseHandle, AppError> {
        match self.db.as_mut() {
            Some(db) if db.is_open() => Ok(db),
            Some(_) => Err(AppError::Internal("database used after teardown".into())),
            None => Err(AppError::Internal("no database for this request".into())),
        }
    }

    pub fn admin(&self) -> Result<&Admin, AppError> {
        self.admin
            .as_ref()
            .ok_or_else(|| AppError::Internal("authorization context not built".into()))
    }

    /// Page data every view shows: site, user, main menu and the admin entries the user can reach.
    pub fn page_meta(&self) -> serde_json::Value {
        serde_json::json!({
            "site_name": self.site.site_name,
            "user": self.user,
            "menu_items": self.menu_items,
            "admin_items": self.admin.as_ref().map(Admin::top_level_items).unwrap_or_default(),
        })
    }

    /// Release the database handle. Returns `true` only when this call closed it.
    pub async fn teardown(&mut self) -> bool {
        match self.db.as_mut() {
            Some(db) => db.close().await,
            None => false,
        }
    }
}

/// Shared handle to one request's context. Lives in the request extensions.
#[derive(Clone, Debug)]
pub struct RequestScope(Arc<Mutex<RequestContext>>);

impl RequestScope {
    pub fn new(ctx: RequestContext) -> Self {
        RequestScope(Arc::new(Mutex::new(ctx)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, RequestContext> {
        self.0.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn teardown_without_db_is_noop() {
        let mut ctx = RequestContext::new(Session::default());
        assert!(!ctx.teardown().await);
        assert!(ctx.db_mut().is_err());
        assert!(ctx.admin().is_err());
    }

    #[tokio::test]
    async fn teardown_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = RequestContext::new(Session::default());
        ctx.db = Some(DatabaseHandle::open(&dir.path().join("ctx.sqlite")).await.unwrap());
        assert!(ctx.db_mut().is_ok());
        assert!(ctx.teardown().await);
        assert!(!ctx.teardown().await);
        assert!(matches!(ctx.db_mut(), Err(AppError::Internal(_))));
    }
}
