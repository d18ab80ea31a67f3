use std::sync::Arc;
use support_relay_ai::GeminiBackend;
use support_relay_conversation::ConversationOrchestrator;
use support_relay_server::{AppState, ServerConfig, SqliteConversationStore, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing .env file is fine; the environment may already be set.
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(
        model = %config.llm.model,
        context_window = config.conversation.context_window,
        "Loaded configuration"
    );

    // Open the database and run migrations
    let store = SqliteConversationStore::connect(&config.database_url)
        .await
        .expect("failed to open database");
    tracing::info!("Running database migrations...");
    store.migrate().await.expect("failed to run migrations");

    let backend =
        GeminiBackend::new(config.llm_backend_config()).expect("failed to configure Gemini");

    let orchestrator = ConversationOrchestrator::new(
        Arc::new(store),
        Arc::new(backend),
        config.orchestrator_config(),
    );
    let state = AppState::new(orchestrator).with_max_request_bytes(config.max_request_bytes);
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
