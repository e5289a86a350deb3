//! jobwatch configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-local config file name
const LOCAL_CONFIG: &str = ".jobwatch.yml";

/// Main jobwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Remote API connection
    pub api: ApiConfig,

    /// Job wait defaults
    pub wait: WaitConfig,

    /// Conversation wait defaults
    pub conversation: ConversationConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .jobwatch.yml
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/jobwatch/jobwatch.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: a broken config file is reported properly by
    /// `load` once logging exists.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(LOCAL_CONFIG))
                .chain(user_config_path())
                .collect(),
        };

        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jobwatch").join("jobwatch.yml"))
}

/// Remote API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL (HYPERPLEXITY_API_URL overrides it when set)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hyperplexity.ai/v1".to_string(),
            api_key_env: "HYPERPLEXITY_API_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Job wait defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Give up and return the last known state after this long
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Pause between poll cycles
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Step-text fragments that mark a finished sub-stage rather than a finished job
    ///
    /// Matched case-insensitively as substrings of the job's current step.
    #[serde(rename = "intermediate-markers")]
    pub intermediate_markers: Vec<String>,

    /// Message payload keys that may carry a progress percentage, in priority order
    #[serde(rename = "progress-keys")]
    pub progress_keys: Vec<String>,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            poll_interval_secs: 10,
            intermediate_markers: vec![
                "config generation".to_string(),
                "configuration generation".to_string(),
                "table making".to_string(),
                "table maker".to_string(),
                "claim extraction".to_string(),
            ],
            progress_keys: vec![
                "progress".to_string(),
                "percent".to_string(),
                "progress_percent".to_string(),
                "value".to_string(),
            ],
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Conversation wait defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Typical AI response time for one turn
    #[serde(rename = "expected-secs")]
    pub expected_secs: u64,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            expected_secs: 120,
            timeout_secs: 600,
            poll_interval_secs: 8,
        }
    }
}
