use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::message::HistoryLimit;

/// Default values shown to the user before they touch any control.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Defaults {
    /// Shown by the UI as its initial system-message text; dispatch takes the
    /// system prompt from the persona instead
    pub system_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub use_local_model: bool,
}

/// Inclusive bounds for one numeric generation parameter.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
    pub step: T,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ParameterRanges {
    pub max_tokens: Range<u32>,
    pub temperature: Range<f32>,
    pub top_p: Range<f32>,
}

/// User-facing status strings emitted into the response stream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StatusMessages {
    pub loading_message: String,
    pub model_load_failed: String,
    pub model_ready: String,
    pub login_required: String,
    pub load_timed_out: String,
    pub error_prefix: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LocalModelConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Interval between readiness probes against the local server
    pub probe_interval_ms: u64,
    pub max_load_attempts: u32,
    /// Upper bound on how long a chat request waits for the model; unset waits forever
    pub load_timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiModelConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Number of prior turns sent with each request; -1 sends the whole history
    pub history_limit: i64,
    /// Persona file; defaults to `personas.toml` next to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personas_path: Option<PathBuf>,
    pub defaults: Defaults,
    pub parameters: ParameterRanges,
    pub messages: StatusMessages,
    pub local_model: LocalModelConfig,
    pub api_model: ApiModelConfig,
    pub server: ServerConfig,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn history_limit(&self) -> HistoryLimit {
        HistoryLimit::from_config(self.history_limit)
    }

    /// Resolve the persona file, relative paths being taken from `config_dir`.
    pub fn resolve_personas_path(&self, config_dir: &Path) -> PathBuf {
        match &self.personas_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join("personas.toml"),
        }
    }
}
