//! CLI argument definitions for the PayPilot binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::Parser;
use paypilot_core::PayPilotConfig;

/// PayPilot - create, send and chase invoices from a chat.
#[derive(Parser, Debug, Default)]
#[command(name = "paypilot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the SQLite database and API token.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Chat key of the operator.
    #[arg(short = 'o', long = "operator")]
    pub operator: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PAYPILOT_CONFIG env var > ~/.paypilot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PAYPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > PAYPILOT_PORT env var > config file value.
    pub fn resolve_port<F>(&self, config_port: u16, env: F) -> u16
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = self.port {
            return p;
        }
        env("PAYPILOT_PORT")
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Fold flags and environment overrides into `config`.
    pub fn apply<F>(&self, config: &mut PayPilotConfig, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        config.api.port = self.resolve_port(config.api.port, &env);

        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref operator) = self.operator {
            config.operator.chat_key = operator.clone();
        }

        let secret = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = secret("GROQ_API_KEY") {
            config.classifier.api_key = Some(key);
        }
        if let Some(key) = secret("SARVAM_API_KEY") {
            config.transcription.sarvam_api_key = Some(key);
        }
        if let Some(key) = secret("OPENAI_API_KEY") {
            config.transcription.openai_api_key = Some(key);
        }
        if let Some(token) = secret("PAYPILOT_GATEWAY_TOKEN") {
            config.gateway.token = Some(token);
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".paypilot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".paypilot").join("config.toml");
    }
    PathBuf::from("config.toml")
}
