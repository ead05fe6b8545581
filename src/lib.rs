//! Inventory site bootstrap: settings, per-request database and authorization context,
//! module-driven menus, and the route registry.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod inventory;
pub mod lifecycle;
pub mod logging;
pub mod modules;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod users;

pub use config::{load_site_config, settings_path, ActiveSite, SiteConfig};
pub use context::{RequestContext, RequestScope};
pub use db::{get_db, make_db_path, DatabaseHandle};
pub use error::{AppError, ConfigError};
pub use logging::init_tracing;
pub use modules::{MenuItem, ModuleRegistry, SiteModule};
pub use routes::site_routes;
pub use session::{CookieSessionStore, Session, SessionStore};
pub use state::AppState;
pub use store::initialize_all_tables;
pub use users::{create_user, Admin};
