//! Raw settings types matching `site_settings.json`. Keys are upper-case.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Flask's default permanent session lifetime: 31 days.
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 31 * 24 * 60 * 60;

fn default_database_path() -> PathBuf {
    PathBuf::from("instance/database.sqlite")
}

fn default_site_name() -> String {
    "Inventory".into()
}

fn default_host_name() -> String {
    "localhost".into()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_session_lifetime() -> u64 {
    DEFAULT_SESSION_LIFETIME_SECS
}

fn default_cookie_name() -> String {
    "session".into()
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".into()
}

fn default_true() -> bool {
    true
}

/// Per-host overrides, one entry per site sharing this installation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HostSettings {
    pub host_name: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SiteConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub require_ssl: bool,
    /// Tag selecting domain-specific menus and permissions (e.g. "inventory").
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_host_name")]
    pub host_name: String,
    #[serde(default)]
    pub shared_host_settings: Vec<HostSettings>,
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
    /// Seconds.
    #[serde(default = "default_session_lifetime")]
    pub permanent_session_lifetime: u64,
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub initialize_on_start: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            database_path: default_database_path(),
            require_ssl: false,
            module: None,
            secret_key: String::new(),
            site_name: default_site_name(),
            host_name: default_host_name(),
            shared_host_settings: Vec::new(),
            template_dirs: Vec::new(),
            static_dir: default_static_dir(),
            log_file_path: None,
            permanent_session_lifetime: default_session_lifetime(),
            session_cookie_name: default_cookie_name(),
            bind_addr: default_bind_addr(),
            initialize_on_start: true,
        }
    }
}
