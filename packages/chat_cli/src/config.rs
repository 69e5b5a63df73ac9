use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [server]
//                    host = "agent.local:8000"
//
//   env var:         CHAT_SERVER__HOST=agent.local:8000   (double underscore = nesting)
//
//   (single underscore stays within field names: CHAT_CLIENT__UPLOAD_TIMEOUT_SECS)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub client: ClientFileConfig,
}

/// Where the agent server lives (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    /// `host[:port]` of the agent server
    #[serde(default = "default_host")]
    pub host: String,
    /// Use wss:// and https:// instead of ws:// and http://
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: false,
            ws_path: default_ws_path(),
            upload_path: default_upload_path(),
            health_path: default_health_path(),
        }
    }
}

/// Client behaviour knobs (lives under `[client]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientFileConfig {
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Prefix transcript lines with the local time
    #[serde(default)]
    pub timestamps: bool,
}

impl Default for ClientFileConfig {
    fn default() -> Self {
        Self {
            upload_timeout_secs: default_upload_timeout_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            timestamps: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_ws_path() -> String {
    "/ws".to_string()
}
fn default_upload_path() -> String {
    "/upload".to_string()
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_upload_timeout_secs() -> u64 {
    60
}
fn default_shutdown_grace_ms() -> u64 {
    500
}

/// Build a figment that layers: defaults → config.toml → CHAT_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `CHAT_SERVER__HOST=example.com`  →  `server.host = "example.com"`
///   `CHAT_CLIENT__TIMESTAMPS=true`   →  `client.timestamps = true`
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed("CHAT_").split("__"))
}

/// Directory holding config.toml (defaults to ~/.agent-chat)
pub fn resolve_config_dir(custom_dir: Option<PathBuf>) -> Result<PathBuf> {
    match custom_dir {
        Some(dir) => Ok(dir),
        None => Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".agent-chat")),
    }
}

/// Values given on the command line; they win over every file/env layer.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub secure: Option<bool>,
}

// =============================================================================
// Runtime config (derived from FileConfig, used throughout the client)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub host: String,
    pub secure: bool,
    pub ws_path: String,
    pub upload_path: String,
    pub health_path: String,
    pub upload_timeout: Duration,
    pub shutdown_grace: Duration,
    pub timestamps: bool,
}

impl ClientConfig {
    pub fn from_file(fc: &FileConfig, overrides: &CliOverrides) -> Self {
        Self {
            host: overrides
                .host
                .clone()
                .unwrap_or_else(|| fc.server.host.clone()),
            secure: overrides.secure.unwrap_or(fc.server.secure),
            ws_path: fc.server.ws_path.clone(),
            upload_path: fc.server.upload_path.clone(),
            health_path: fc.server.health_path.clone(),
            upload_timeout: Duration::from_secs(fc.client.upload_timeout_secs),
            shutdown_grace: Duration::from_millis(fc.client.shutdown_grace_ms),
            timestamps: fc.client.timestamps,
        }
    }

    /// Load from `config_dir` and apply command-line overrides.
    pub fn load(config_dir: &Path, overrides: &CliOverrides) -> Result<Self> {
        let fc: FileConfig = load_config(config_dir)
            .extract()
            .context("Failed to load configuration")?;
        Ok(Self::from_file(&fc, overrides))
    }

    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        endpoint(scheme, &self.host, &self.ws_path)
    }

    pub fn upload_url(&self) -> String {
        endpoint(self.http_scheme(), &self.host, &self.upload_path)
    }

    pub fn health_url(&self) -> String {
        endpoint(self.http_scheme(), &self.host, &self.health_path)
    }

    fn http_scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}

fn endpoint(scheme: &str, host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{scheme}://{host}/{path}")
}
