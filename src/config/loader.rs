//! Load site settings from the instance settings file, then apply environment overrides.

use crate::config::{validate, SiteConfig};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Default location of the instance-local settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "instance/site_settings.json";

/// Settings file path from env `SITE_SETTINGS`, default [`DEFAULT_SETTINGS_PATH`].
pub fn settings_path() -> PathBuf {
    std::env::var("SITE_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

/// Parse settings from a JSON string.
pub fn parse_settings(raw: &str) -> Result<SiteConfig, ConfigError> {
    Ok(serde_json::from_str(raw)?)
}

/// Read the settings file. A missing file yields defaults, other read errors fail.
pub fn read_settings_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            Ok(SiteConfig::default())
        }
        Err(e) => Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Validation(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

/// Apply overrides from a key lookup (the process environment in production).
pub fn apply_overrides<F>(mut config: SiteConfig, lookup: F) -> Result<SiteConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DATABASE_PATH") {
        config.database_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("REQUIRE_SSL") {
        config.require_ssl = parse_bool("REQUIRE_SSL", &v)?;
    }
    if let Some(v) = lookup("MODULE") {
        config.module = Some(v).filter(|s| !s.trim().is_empty());
    }
    if let Some(v) = lookup("SECRET_KEY") {
        config.secret_key = v;
    }
    if let Some(v) = lookup("BIND_ADDR") {
        config.bind_addr = v;
    }
    if let Some(v) = lookup("LOG_FILE_PATH") {
        config.log_file_path = Some(PathBuf::from(v)).filter(|p| !p.as_os_str().is_empty());
    }
    if let Some(v) = lookup("INITIALIZE_ON_START") {
        config.initialize_on_start = parse_bool("INITIALIZE_ON_START", &v)?;
    }
    Ok(config)
}

/// Load, override from the environment, and validate. Called once at process start.
pub fn load_site_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let config = read_settings_file(path)?;
    let config = apply_overrides(config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}
