//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiCompletionAdapter},
    config::Config,
    error::ApiError,
    web::{self, state::AppState, ApiDoc},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use support_chat_core::service::ChatService;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Completion Adapter ---
    let mut openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    if let Some(base) = &config.openai_api_base {
        openai_config = openai_config.with_api_base(base);
    }
    let openai_client = Client::with_config(openai_config);

    let completion_adapter = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.chat_model.clone(),
        Duration::from_secs(config.provider_timeout_secs),
    ));

    // --- 4. Build the Shared AppState ---
    let chat = ChatService::new(db_adapter.clone(), completion_adapter);
    let app_state = Arc::new(AppState {
        store: db_adapter,
        chat,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let api_router = web::router(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
