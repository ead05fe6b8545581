//! Settings applied to a single request after matching the request host.

use crate::config::{HostSettings, SiteConfig};
use std::path::PathBuf;

/// Template directory every site falls back to.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveSite {
    pub host_name: String,
    pub site_name: String,
    pub database_path: PathBuf,
    pub module: Option<String>,
    /// Search order for templates: host dirs, then site dirs, then the default.
    pub template_dirs: Vec<PathBuf>,
}

fn bare_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.strip_prefix('[') {
        // IPv6 literal keeps its brackets.
        Some(rest) => rest.find(']').map(|i| &host[..i + 2]).unwrap_or(host),
        None => host.split(':').next().unwrap_or(host),
    };
    without_port.to_ascii_lowercase()
}

impl SiteConfig {
    /// Find the shared-host entry for a request host: exact `HOST_NAME` first, then `SUBDOMAIN`.
    pub fn host_settings_for(&self, host: &str) -> Option<&HostSettings> {
        let host = bare_host(host);
        self.shared_host_settings
            .iter()
            .find(|h| h.host_name.eq_ignore_ascii_case(&host))
            .or_else(|| {
                let first_label = host.split('.').next().unwrap_or_default();
                self.shared_host_settings.iter().find(|h| {
                    h.subdomain
                        .as_deref()
                        .map(|s| !s.is_empty() && s.eq_ignore_ascii_case(first_label))
                        .unwrap_or(false)
                })
            })
    }

    /// Derive the settings for one request. Never mutates the process-wide config.
    pub fn resolve_for_host(&self, host: Option<&str>) -> ActiveSite {
        let entry = host.and_then(|h| self.host_settings_for(h));

        let mut template_dirs: Vec<PathBuf> = Vec::new();
        let candidates = entry
            .map(|h| h.template_dirs.as_slice())
            .unwrap_or(&[])
            .iter()
            .chain(self.template_dirs.iter())
            .cloned()
            .chain(std::iter::once(PathBuf::from(DEFAULT_TEMPLATE_DIR)));
        for dir in candidates {
            if !template_dirs.contains(&dir) {
                template_dirs.push(dir);
            }
        }

        ActiveSite {
            host_name: entry
                .map(|h| h.host_name.clone())
                .or_else(|| host.map(bare_host))
                .unwrap_or_else(|| self.host_name.clone()),
            site_name: entry
                .and_then(|h| h.site_name.clone())
                .unwrap_or_else(|| self.site_name.clone()),
            database_path: entry
                .and_then(|h| h.database_path.clone())
                .unwrap_or_else(|| self.database_path.clone()),
            module: entry
                .and_then(|h| h.module.clone())
                .or_else(|| self.module.clone()),
            template_dirs,
        }
    }
}
