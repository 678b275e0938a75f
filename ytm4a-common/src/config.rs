//! Configuration loading and output folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Settings sources, highest
//! priority first:
//!
//! 1. Command-line arguments
//! 2. Environment variables (`YTM4A_OUTPUT_FOLDER`, `YTM4A_REMOTE_URL`, `YTM4A_PORT`)
//! 3. TOML configuration file (`~/.config/ytm4a/ytm4a.toml`)
//! 4. Compiled defaults
//!
//! A missing or unparsable TOML file never aborts startup: a warning is
//! logged and the compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the output folder
pub const ENV_OUTPUT_FOLDER: &str = "YTM4A_OUTPUT_FOLDER";

/// Environment variable overriding the remote pipeline base URL
pub const ENV_REMOTE_URL: &str = "YTM4A_REMOTE_URL";

/// Environment variable overriding the service port
pub const ENV_PORT: &str = "YTM4A_PORT";

/// Name of the configuration directory and file stem
const CONFIG_DIR_NAME: &str = "ytm4a";

/// Public CORS relays tried in order by the degraded transport
const DEFAULT_PROXY_ROUTES: [(&str, &str); 3] = [
    ("cors-anywhere", "https://cors-anywhere.herokuapp.com/"),
    ("allorigins", "https://api.allorigins.win/raw?url="),
    ("cors.sh", "https://proxy.cors.sh/"),
];

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub output_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            output_folder: default_output_folder(),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder where finished audio files are written
    #[serde(default)]
    pub output_folder: Option<PathBuf>,

    /// Local service port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the authoritative backend (e.g. `https://dl.example.com`)
    ///
    /// When absent only the degraded client-side pipeline is available.
    #[serde(default)]
    pub remote_base_url: Option<String>,

    /// Upper bound for the embed title lookup
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,

    /// Per-request timeout for backend and proxy requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Broadcast capacity for progress events
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fallback routes, tried in the listed order
    #[serde(default = "default_proxy_routes")]
    pub proxy_routes: Vec<ProxyRouteConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// One fallback route as written in the TOML file
///
/// ```toml
/// [[proxy_routes]]
/// name = "allorigins"
/// prefix = "https://api.allorigins.win/raw?url="
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRouteConfig {
    pub name: String,
    pub prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            output_folder: None,
            port: default_port(),
            remote_base_url: None,
            embed_timeout_ms: default_embed_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            event_bus_capacity: default_event_bus_capacity(),
            logging: LoggingConfig::default(),
            proxy_routes: default_proxy_routes(),
        }
    }
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embed_timeout_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_bus_capacity() -> usize {
    100
}

/// Reference list of public CORS relays
pub fn default_proxy_routes() -> Vec<ProxyRouteConfig> {
    DEFAULT_PROXY_ROUTES
        .iter()
        .map(|(name, prefix)| ProxyRouteConfig {
            name: name.to_string(),
            prefix: prefix.to_string(),
        })
        .collect()
}

fn default_output_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .map(|d| d.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./ytm4a_output"))
}

/// Platform path of the user configuration file
///
/// `~/.config/ytm4a/ytm4a.toml` on Linux, the equivalent config directory
/// elsewhere. `None` when the platform has no config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("ytm4a.toml"))
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the TOML configuration, falling back to defaults
///
/// `explicit` is the `--config` argument. Without it the platform default
/// path is tried. Any failure is logged and yields `TomlConfig::default()`.
pub fn load_or_default(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("No configuration directory on this platform, using compiled defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        if explicit.is_some() {
            warn!("Config file not found: {}, using compiled defaults", path.display());
        } else {
            debug!("No config file at {}, using compiled defaults", path.display());
        }
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Output folder resolution
///
/// Priority: CLI argument → `YTM4A_OUTPUT_FOLDER` → TOML `output_folder` →
/// compiled default.
pub struct OutputFolderResolver {
    toml_output_folder: Option<PathBuf>,
}

impl OutputFolderResolver {
    pub fn new(config: &TomlConfig) -> Self {
        Self {
            toml_output_folder: config.output_folder.clone(),
        }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ENV_OUTPUT_FOLDER) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_output_folder {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().output_folder
    }
}

/// Creates the output folder on demand
pub struct OutputFolderInitializer {
    output_folder: PathBuf,
}

impl OutputFolderInitializer {
    pub fn new(output_folder: PathBuf) -> Self {
        Self { output_folder }
    }

    /// Create the folder (and parents) if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.output_folder.exists() {
            info!("Creating output folder: {}", self.output_folder.display());
        }
        std::fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }
}
