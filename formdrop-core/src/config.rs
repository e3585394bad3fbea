use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the store when no explicit path is configured.
pub const DEFAULT_STORE_FILE_NAME: &str = "submissions.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormdropConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Route the submission endpoint is mounted on.
    #[serde(default = "default_submit_path")]
    pub path: String,
}

/// Store file settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit store path. Defaults to a sibling of the running executable.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Hold a process-wide lock across load → append → save.
    ///
    /// Off by default: concurrent submissions may then overwrite each other.
    #[serde(default)]
    pub serialize_appends: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// When false, no counters are registered or updated.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:8080".into() }
fn default_submit_path() -> String { "/submit".into() }
pub fn default_metrics_path() -> String { "/metrics".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            path: default_submit_path(),
        }
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_metrics_path(),
        }
    }
}

impl StoreConfig {
    /// Effective store path (explicit file, else next to the executable).
    pub fn resolved_file(&self) -> PathBuf {
        match &self.file {
            Some(path) => path.clone(),
            None => default_store_file(),
        }
    }
}

fn default_store_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_STORE_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE_NAME))
}

impl FormdropConfig {
    /// Load configuration from an optional YAML file + `FORMDROP_` env overrides.
    ///
    /// Nested keys use a double underscore: `FORMDROP_STORE__SERIALIZE_APPENDS=true`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: FormdropConfig = figment
            .merge(Env::prefixed("FORMDROP_").split("__"))
            .extract()?;
        Ok(config)
    }
}
