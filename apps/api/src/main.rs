mod config;
mod errors;
mod extraction;
mod matching;
mod routes;
mod state;
mod vacancy;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::DocumentExtractor;
use crate::matching::categorizer::{Categorizer, CategoryKeywords};
use crate::matching::embedding_client::EmbeddingOracle;
use crate::matching::engine::{Analyzer, ScoringConfig};
use crate::matching::oracle::{LexicalOracle, OracleAdapter, SimilarityOracle};
use crate::matching::segmenter::Segmenter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vacancy-matcher v{}", env!("CARGO_PKG_VERSION"));

    // Category keywords: built-in lists unless a JSON override is configured
    let keywords = match &config.category_keywords_path {
        Some(path) => {
            let keywords = CategoryKeywords::from_path(path)?;
            info!("Category keywords loaded from {}", path.display());
            keywords
        }
        None => CategoryKeywords::default(),
    };

    // Similarity oracle: embedding service when configured, lexical otherwise
    let oracle: Arc<dyn SimilarityOracle> = match &config.embedding_api_url {
        Some(url) => {
            info!(
                "Embedding oracle initialized (url: {url}, model: {}, cache: {})",
                config.embedding_model, config.embedding_cache_capacity
            );
            Arc::new(EmbeddingOracle::new(
                url.clone(),
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_cache_capacity,
            )?)
        }
        None => {
            info!("EMBEDDING_API_URL not set; using lexical oracle");
            Arc::new(LexicalOracle)
        }
    };

    let analyzer = Analyzer::new(
        Segmenter::default(),
        Categorizer::new(keywords),
        OracleAdapter::new(
            oracle,
            config.match_threshold,
            Duration::from_millis(config.oracle_timeout_ms),
        ),
        ScoringConfig {
            default_soft_skill_score: config.default_soft_skill_score,
            overqualified_score: config.overqualified_score,
        },
        config.oracle_concurrency,
    );
    info!(
        "Analyzer ready (threshold: {}, concurrency: {})",
        config.match_threshold, config.oracle_concurrency
    );

    // Build app state
    let state = AppState {
        analyzer: Arc::new(analyzer),
        extractor: Arc::new(DocumentExtractor),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
