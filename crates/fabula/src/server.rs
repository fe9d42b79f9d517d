use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use fabula_core::{SessionRegistry, Storyteller};
use fabula_model::{create_model, ModelClient, ModelType};
use fabula_stories::StoryStore;

use crate::api::{self, AppState};
use crate::config::AppConfig;

/// Wire up the shared state from `config`
pub fn build_state(config: AppConfig) -> Result<AppState> {
    if config.api_key.is_none() {
        warn!("No API key configured; every generation will use placeholder text");
    }
    let model = create_model(
        ModelType::Gemini,
        config.api_key.as_deref().unwrap_or_default(),
        &config.model,
    );
    let client = ModelClient::new(model, config.retry_policy());
    let storyteller = Storyteller::new(client, config.story_config());

    let store = StoryStore::with_dir(config.stories_dir.clone());
    store.ensure_dir().with_context(|| {
        format!(
            "Failed to create stories directory {}",
            config.stories_dir.display()
        )
    })?;

    Ok(AppState {
        storyteller: Arc::new(storyteller),
        store: Arc::new(store),
        sessions: Arc::new(SessionRegistry::with_limits(config.session_limits())),
        speech: Arc::new(fabula_speech::default_chain()),
        config: Arc::new(config),
    })
}

pub async fn serve(config: AppConfig) -> Result<()> {
    let bind = config.bind.clone();
    let state = build_state(config)?;
    let model_id = state.storyteller.client().model_id().to_string();
    let stories_dir = state.store.stories_dir().to_path_buf();
    spawn_session_sweeper(state.sessions.clone());
    let router = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind server to {}", bind))?;
    let local = listener
        .local_addr()
        .context("Failed to read bound address")?;

    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("Listening on http://{}", local).bold()
    );
    eprintln!("  {} Model: {}", "->".dimmed(), model_id);
    eprintln!("  {} Stories: {}", "->".dimmed(), stories_dir.display());
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();
    info!(addr = %local, model = %model_id, "Server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

/// Periodically drop idle sessions so they do not wait for the next create
fn spawn_session_sweeper(sessions: Arc<SessionRegistry>) {
    let period = (sessions.limits().idle_ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sessions.evict_idle().await;
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
