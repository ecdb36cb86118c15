use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PayPilotError, Result};

/// Top-level configuration for the PayPilot service.
///
/// Loaded from `~/.paypilot/config.toml` by default. Each section corresponds
/// to a crate or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayPilotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl PayPilotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PayPilotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PayPilotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database and API token.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.paypilot/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// The single operator allowed to drive the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Chat key of the operator. Inbound events from any other chat are dropped.
    pub chat_key: String,
    /// Printed at the top of every invoice document.
    pub business_name: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            chat_key: String::new(),
            business_name: "PayPilot".to_string(),
        }
    }
}

/// Conversation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay after a send completes before the chat stops being guarded.
    pub grace_ms: u64,
    /// Maximum invoices shown in a listing.
    pub list_limit: usize,
    /// Currency symbol used when formatting amounts.
    pub currency_symbol: String,
    /// Days until due when a request names no due date.
    pub default_due_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_ms: 3_000,
            list_limit: 10,
            currency_symbol: "₹".to_string(),
            default_due_days: 7,
        }
    }
}

/// LLM intent classifier settings. Without an API key only the regex
/// extractor runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Voice transcription settings. Providers without a key are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub sarvam_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Whisper model name for the OpenAI provider.
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            sarvam_api_key: None,
            openai_api_key: None,
            model: "whisper-1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Reminder scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Cron expression for the overdue scan (local time).
    pub overdue_cron: String,
    /// Cron expression for the upcoming-due scan (local time).
    pub upcoming_cron: String,
    /// How far ahead the upcoming scan looks.
    pub upcoming_window_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overdue_cron: "0 9 * * *".to_string(),
            upcoming_cron: "0 10 * * *".to_string(),
            upcoming_window_days: 2,
        }
    }
}

/// Invoice storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// HTTP API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3040 }
    }
}

/// Outbound message gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3050".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}
