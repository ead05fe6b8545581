//! Shared application state for all routes. Read-only after startup apart from the per-path init locks.

use crate::config::SiteConfig;
use crate::db::InitLocks;
use crate::modules::ModuleRegistry;
use crate::session::{CookieSessionStore, SessionStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub modules: Arc<ModuleRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub db_init: Arc<InitLocks>,
}

impl AppState {
    /// State with the shipped modules and a signed-cookie session store.
    pub fn new(config: SiteConfig) -> Self {
        let sessions = Arc::new(CookieSessionStore::from_config(&config));
        AppState {
            config: Arc::new(config),
            modules: Arc::new(ModuleRegistry::with_defaults()),
            sessions,
            db_init: Arc::new(InitLocks::default()),
        }
    }
}
