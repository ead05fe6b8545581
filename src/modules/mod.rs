//! Domain modules selected by the `MODULE` setting.
//!
//! Each module contributes menu entries, permission rules, tables and routes.
//! Adding a module means registering it here; the request pipeline only looks modules up by tag.

use crate::db::DatabaseHandle;
use crate::error::AppError;
use crate::inventory::InventoryModule;
use crate::state::AppState;
use crate::users::Admin;
use async_trait::async_trait;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// Tags with a registered module. Others (e.g. "events", "bikematch") fall back to the default menu.
pub const KNOWN_MODULE_TAGS: &[&str] = &[crate::inventory::MODULE_TAG];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub title: String,
    pub url: String,
}

impl MenuItem {
    pub fn new(title: &str, url: &str) -> Self {
        MenuItem {
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

/// Menu when no module is active.
pub fn default_menu() -> Vec<MenuItem> {
    vec![MenuItem::new("Home", "/")]
}

#[async_trait]
pub trait SiteModule: Send + Sync {
    fn tag(&self) -> &'static str;

    /// Full main menu while this module is active.
    fn menu_items(&self) -> Vec<MenuItem>;

    /// Register the module's permission entries for this request.
    fn register_admin(&self, admin: &mut Admin);

    /// Idempotent table creation.
    async fn initialize_tables(&self, db: &mut DatabaseHandle) -> Result<(), AppError>;

    fn routes(&self) -> Router<AppState>;
}

#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn SiteModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry { modules: Vec::new() }
    }

    /// Registry with every module this site ships.
    pub fn with_defaults() -> Self {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(InventoryModule));
        registry
    }

    /// Add a module; a module with the same tag is replaced.
    pub fn register(&mut self, module: Arc<dyn SiteModule>) {
        self.modules.retain(|m| m.tag() != module.tag());
        self.modules.push(module);
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn SiteModule>> {
        self.modules.iter().find(|m| m.tag() == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteModule>> {
        self.modules.iter()
    }

    /// Menu for the active module tag. A known module also registers its permissions on `admin`.
    pub fn build_menu(&self, tag: Option<&str>, admin: &mut Admin) -> Vec<MenuItem> {
        match tag.and_then(|t| self.get(t)) {
            Some(module) => {
                module.register_admin(admin);
                module.menu_items()
            }
            None => default_menu(),
        }
    }

    /// Routes of all registered modules, whatever the active tag.
    pub fn routes(&self) -> Router<AppState> {
        self.modules
            .iter()
            .fold(Router::new(), |router, module| router.merge(module.routes()))
    }
}
