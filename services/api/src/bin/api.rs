//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CrfTagger, DbAdapter, OpenAiCompletionAdapter},
    config::Config,
    error::ApiError,
    web::{auth::JwtKeys, build_router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use silogia_core::{
    ArgumentExtractor, AnalysisService, DatabaseService, FeatureExtractor, InMemoryDatabase,
    RetryPolicy, RuleAnnotator, SuggestionGenerator,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `DATABASE_URL` value that selects the in-process store instead of Postgres.
const IN_MEMORY_DATABASE: &str = "memory";

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
    let db: Arc<dyn DatabaseService> = if config.database_url == IN_MEMORY_DATABASE {
        warn!("Using the in-memory store; nothing will be persisted.");
        Arc::new(InMemoryDatabase::new())
    } else {
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;
        let db_adapter = DbAdapter::new(db_pool);
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");
        Arc::new(db_adapter)
    };

    // --- 3. Load the Tagging Model ---
    // A missing model only disables analysis; every other route keeps working.
    let extractor = match CrfTagger::load(&config.crf_model_path) {
        Ok(tagger) => {
            info!(
                path = %config.crf_model_path.display(),
                labels = tagger.labels().len(),
                "CRF model loaded."
            );
            Some(ArgumentExtractor::new(
                Arc::new(RuleAnnotator::new()),
                Arc::new(tagger),
                FeatureExtractor::default(),
            ))
        }
        Err(e) => {
            warn!(
                path = %config.crf_model_path.display(),
                "CRF model unavailable, analysis requests will answer 503: {}", e
            );
            None
        }
    };

    // --- 4. Initialize the Suggestion LLM ---
    let openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
    let openai_client = Client::with_config(openai_config);
    let completion = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.suggestion_model.clone(),
    ));
    let suggestions = SuggestionGenerator::new(
        completion,
        RetryPolicy {
            timeout: config.llm_timeout,
            backoff: config.llm_retry_backoff,
        },
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db.clone(),
        analysis: AnalysisService::new(db, extractor, suggestions, config.max_text_chars),
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_ttl),
    });

    // --- 6. Create the Web Router ---
    let app = build_router(app_state, &config.cors_allowed_origins);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
