use std::sync::Arc;

use crate::extraction::TextExtractor;
use crate::matching::engine::Analyzer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; oracle backend chosen from config.
    pub analyzer: Arc<Analyzer>,
    /// Document extractor for the upload endpoint. Default: DocumentExtractor.
    pub extractor: Arc<dyn TextExtractor>,
}
