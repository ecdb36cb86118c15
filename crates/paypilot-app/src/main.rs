//! PayPilot application binary - composition root.
//!
//! 1. Load configuration from TOML, then apply CLI and env overrides
//! 2. Open storage (SQLite, or in-memory invoices)
//! 3. Build the classifier and transcriber chains, renderer and gateway
//! 4. Start the reminder scheduler
//! 5. Serve the REST API until Ctrl-C

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use paypilot_api::auth::{load_or_generate_token, TOKEN_FILE};
use paypilot_api::{start_server, AppState, HttpGateway};
use paypilot_core::config::StorageBackend;
use paypilot_core::{InvoiceStore, PayPilotConfig};
use paypilot_engine::{
    Collaborators, ConversationEngine, EngineSettings, ReminderJobs, ReminderScheduler,
    ReminderSettings,
};
use paypilot_intent::{ClassifierChain, IntentProvider, LlmIntentProvider};
use paypilot_render::HtmlRenderer;
use paypilot_storage::{ContactDirectory, Database, MemoryInvoiceStore, SqliteInvoiceStore};

use crate::cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn build_classifier(config: &PayPilotConfig) -> ClassifierChain {
    let mut providers: Vec<Box<dyn IntentProvider>> = Vec::new();
    match LlmIntentProvider::from_config(&config.classifier) {
        Ok(Some(provider)) => providers.push(Box::new(provider)),
        Ok(None) => tracing::info!("No classifier API key, using the pattern extractor only"),
        Err(e) => tracing::warn!(error = %e, "LLM classifier unavailable"),
    }
    ClassifierChain::new(providers)
}

fn build_scheduler(
    config: &PayPilotConfig,
    store: Arc<dyn InvoiceStore>,
    engine: &ConversationEngine,
) -> Result<Option<Arc<ReminderScheduler>>, Box<dyn std::error::Error>> {
    if !config.scheduler.enabled {
        tracing::info!("Reminder scheduler disabled in config");
        return Ok(None);
    }
    let jobs = ReminderJobs::new(
        store,
        engine.messenger().clone(),
        ReminderSettings {
            operator: engine.settings().operator.clone(),
            upcoming_window: chrono::Duration::days(config.scheduler.upcoming_window_days),
            currency_symbol: config.engine.currency_symbol.clone(),
        },
    );
    let scheduler = ReminderScheduler::new(
        jobs,
        &config.scheduler.overdue_cron,
        &config.scheduler.upcoming_cron,
    )?;
    Ok(Some(Arc::new(scheduler)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = PayPilotConfig::load_or_default(&config_file);
    args.apply(&mut config, |key| std::env::var(key).ok());

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting PayPilot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    if config.operator.chat_key.trim().is_empty() {
        tracing::error!("No operator chat configured; set [operator] chat_key or pass --operator");
        return Err("operator chat key is required".into());
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("paypilot.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let store: Arc<dyn InvoiceStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteInvoiceStore::new(Arc::clone(&db))),
        StorageBackend::Memory => {
            tracing::warn!("Invoices are kept in memory and will be lost on exit");
            Arc::new(MemoryInvoiceStore::new())
        }
    };
    let contacts = ContactDirectory::new(Arc::clone(&db));

    // Collaborators.
    let classifier = build_classifier(&config);
    let transcriber = paypilot_voice::chain_from_config(&config.transcription);
    if transcriber.is_empty() {
        tracing::warn!("No transcription provider configured; voice notes will be declined");
    }
    let renderer = HtmlRenderer::new(
        config.operator.business_name.clone(),
        config.engine.currency_symbol.clone(),
    );
    let gateway = HttpGateway::new(&config.gateway, contacts.clone())?;
    tracing::info!(
        classifiers = classifier.provider_count(),
        gateway = %config.gateway.base_url,
        "Collaborators ready"
    );

    let engine = Arc::new(ConversationEngine::new(
        EngineSettings::from_config(&config),
        Collaborators {
            classifier: Arc::new(classifier),
            transcriber: Arc::new(transcriber),
            store: Arc::clone(&store),
            renderer: Arc::new(renderer),
            transport: Arc::new(gateway),
        },
    ));

    // === Background tasks ===

    let scheduler = build_scheduler(&config, store, &engine)?;
    let handles = scheduler
        .as_ref()
        .map(|s| s.spawn())
        .unwrap_or_default();

    // === API server ===

    let api_token = load_or_generate_token(&data_dir.join(TOKEN_FILE))?;
    let state = AppState::new(
        config.clone(),
        Arc::clone(&engine),
        scheduler.clone(),
        contacts,
        api_token,
    );

    let shutdown_scheduler = scheduler.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
        if let Some(s) = shutdown_scheduler {
            s.shutdown();
        }
    };

    if let Err(e) = start_server(state, shutdown).await {
        tracing::error!(port = config.api.port, error = %e, "API server failed - is another instance running?");
        return Err(e.into());
    }

    for handle in handles {
        let _ = handle.await;
    }
    tracing::info!("PayPilot stopped");
    Ok(())
}
