//! Settings validation.

use crate::config::SiteConfig;
use crate::error::ConfigError;
use crate::modules::KNOWN_MODULE_TAGS;
use std::collections::HashSet;

pub fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::MissingSetting("DATABASE_PATH"));
    }
    if config.secret_key.trim().is_empty() {
        return Err(ConfigError::MissingSetting("SECRET_KEY"));
    }
    if config.session_cookie_name.trim().is_empty() {
        return Err(ConfigError::MissingSetting("SESSION_COOKIE_NAME"));
    }

    let mut host_names = HashSet::new();
    for host in &config.shared_host_settings {
        if host.host_name.trim().is_empty() {
            return Err(ConfigError::Validation("SHARED_HOST_SETTINGS entry without HOST_NAME".into()));
        }
        if !host_names.insert(host.host_name.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate HOST_NAME in SHARED_HOST_SETTINGS: {}",
                host.host_name
            )));
        }
    }

    let modules = config
        .module
        .iter()
        .chain(config.shared_host_settings.iter().filter_map(|h| h.module.as_ref()));
    for module in modules {
        if !KNOWN_MODULE_TAGS.contains(&module.as_str()) {
            tracing::warn!(module = %module, "MODULE has no registered menus or permissions");
        }
    }

    Ok(())
}
