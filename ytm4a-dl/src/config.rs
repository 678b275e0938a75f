//! Pipeline configuration for ytm4a-dl
//!
//! Built from the bootstrap `TomlConfig` with command-line / environment
//! overrides applied on top. Priority: CLI/ENV → TOML → compiled default.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use ytm4a_common::config::{OutputFolderResolver, ProxyRouteConfig, TomlConfig};

use crate::services::fallback_transport::ProxyRoute;

/// Runtime configuration for one service instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Authoritative backend; `None` means only the degraded path is used
    pub remote_base_url: Option<String>,
    /// Upper bound for the embed title lookup
    pub embed_timeout: Duration,
    /// Per-request timeout for backend and proxy requests
    pub request_timeout: Duration,
    /// Fallback routes in priority order
    pub proxy_routes: Vec<ProxyRoute>,
    /// Where finished files are written
    pub output_folder: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default(), ConfigOverrides::default())
    }
}

/// Values that outrank the TOML file (CLI flags, already merged with ENV by clap)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub remote_base_url: Option<String>,
    pub output_folder: Option<PathBuf>,
    /// Disable the backend even if the TOML names one
    pub local_only: bool,
}

impl ConfigOverrides {
    /// `toml` with these overrides written into it
    pub fn apply_to(&self, toml: &TomlConfig) -> TomlConfig {
        let mut effective = toml.clone();
        if let Some(port) = self.port {
            effective.port = port;
        }
        if self.local_only {
            effective.remote_base_url = None;
        } else if let Some(url) = &self.remote_base_url {
            effective.remote_base_url = Some(url.clone());
        }
        if let Some(folder) = &self.output_folder {
            effective.output_folder = Some(folder.clone());
        }
        effective
    }
}

impl PipelineConfig {
    pub fn from_toml(toml: &TomlConfig, overrides: ConfigOverrides) -> Self {
        let remote_base_url = if overrides.local_only {
            None
        } else {
            overrides
                .remote_base_url
                .or_else(|| toml.remote_base_url.clone())
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
        };

        match &remote_base_url {
            Some(url) => info!("Remote pipeline: {}", url),
            None => warn!("No remote pipeline configured, using degraded client-side path only"),
        }

        let proxy_routes = routes_from_config(&toml.proxy_routes);
        if proxy_routes.is_empty() {
            warn!("No proxy routes configured; local media retrieval will always fail");
        }

        let output_folder =
            OutputFolderResolver::new(toml).resolve(overrides.output_folder.as_deref());

        Self {
            remote_base_url,
            embed_timeout: Duration::from_millis(toml.embed_timeout_ms),
            request_timeout: Duration::from_secs(toml.request_timeout_secs.max(1)),
            proxy_routes,
            output_folder,
        }
    }
}

/// Drop routes with a blank prefix, keep the configured order
pub fn routes_from_config(routes: &[ProxyRouteConfig]) -> Vec<ProxyRoute> {
    routes
        .iter()
        .filter_map(|route| {
            if route.prefix.trim().is_empty() {
                warn!(route = %route.name, "Ignoring proxy route with empty prefix");
                None
            } else {
                Some(ProxyRoute::new(route.name.clone(), route.prefix.trim()))
            }
        })
        .collect()
}
