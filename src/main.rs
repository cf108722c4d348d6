use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use docqa_backend::config::{AnswerMode, AppConfig, SelectorMode};
use docqa_backend::pipeline::{ContextSelector, Pipeline};
use docqa_backend::routes::{analyze, health};
use docqa_backend::services::answer::{AnswerBackend, AnswerEngine};
use docqa_backend::services::embeddings::RigEmbedder;
use docqa_backend::services::llm::{self, GenerationParams, RigCompleter};
use docqa_backend::services::pdf::PdfParser;
use docqa_backend::services::qa::HostedSpanExtractor;
use docqa_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded (env: {})",
        std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into())
    );

    // Model handles are created once here and shared read-only through
    // the pipeline; request handlers never construct clients.
    let selector = match config.pipeline.mode {
        SelectorMode::Whole => ContextSelector::Whole {
            word_cap: config.pipeline.whole_doc_word_cap,
        },
        SelectorMode::Chunked => {
            let client = llm::create_embeddings_client(&config.llm.provider, &config.llm.api_key)
                .context("Failed to create embeddings client")?;
            ContextSelector::Chunked {
                embedder: Arc::new(RigEmbedder::new(client, &config.llm.embedding_model)),
                window: config.pipeline.chunk_window,
                overlap: config.pipeline.chunk_overlap,
                top_k: config.pipeline.top_k,
                word_cap: config.pipeline.context_word_cap,
            }
        }
    };

    let backend = match config.answer.mode {
        AnswerMode::Extractive => {
            AnswerBackend::Extractive(Arc::new(HostedSpanExtractor::new(&config.qa)))
        }
        AnswerMode::Generative => {
            let client = llm::create_completion_client(&config.llm.provider, &config.llm.api_key)
                .context("Failed to create completion client")?;
            AnswerBackend::Generative(Arc::new(RigCompleter::new(client, &config.llm.model)))
        }
    };

    let engine = AnswerEngine::new(
        backend,
        config.answer.clone(),
        GenerationParams {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_output_tokens,
        },
    );

    let pipeline = Pipeline::new(Arc::new(PdfParser), selector, engine);

    let max_body = analyze::body_limit_bytes(config.upload.max_file_size_mb);
    let state = AppState::new(config.clone(), pipeline);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/analyze", post(analyze::analyze))
        .route("/api/ask", post(analyze::ask))
        .route("/api/history", get(analyze::history))
        .route("/api/session", delete(analyze::reset_session))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
