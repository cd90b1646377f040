//! Main Entrypoint for the Island API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Loading the response bank and the facilitator persona.
//! 4. Opening the credential store and building the shared state.
//! 5. Constructing the Axum router and applying middleware.
//! 6. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use island_api::{config::Config, router::create_router, state::AppState};
use island_core::{
    credential::FileCredentialStore, llm_client::DEFAULT_SYSTEM_PROMPT,
    response_bank::ResponseBank,
};
use std::{fs, net::SocketAddr, path::Path, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Reads the facilitator persona, or the built-in one when no path is set.
fn load_system_prompt(path: Option<&Path>) -> anyhow::Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    };
    let prompt = fs::read_to_string(path)
        .with_context(|| format!("Could not read system prompt at {}", path.display()))?;
    anyhow::ensure!(
        !prompt.trim().is_empty(),
        "System prompt at {} is empty",
        path.display()
    );
    Ok(prompt)
}

fn load_response_bank(path: Option<&Path>) -> anyhow::Result<ResponseBank> {
    match path {
        Some(path) => ResponseBank::from_json_file(path)
            .with_context(|| format!("Could not load response bank at {}", path.display())),
        None => Ok(ResponseBank::desert_island()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Lesson Content ---
    let bank = load_response_bank(config.response_bank_path.as_deref())?;
    let system_prompt = load_system_prompt(config.system_prompt_path.as_deref())?;
    info!(
        custom_bank = config.response_bank_path.is_some(),
        custom_prompt = config.system_prompt_path.is_some(),
        "Lesson content loaded."
    );

    // --- 4. Initialize Shared State ---
    let credential_store = Arc::new(FileCredentialStore::new(&config.credential_path));
    let settings = config.completion_settings(system_prompt);
    let app_state = Arc::new(
        AppState::new(config.clone(), bank, settings, credential_store)
            .context("Failed to load the stored AI credential")?,
    );

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        model = %config.chat_model,
        credential_path = %config.credential_path.display(),
        pacing_scale = config.pacing_scale,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
