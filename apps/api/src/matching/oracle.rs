//! Similarity Oracle — pluggable, trait-based semantic similarity between a
//! vacancy requirement and a candidate fragment.
//!
//! Default with an embedding endpoint configured: `EmbeddingOracle`.
//! Without one: `LexicalOracle` (pure-Rust, deterministic, fully testable).
//!
//! The engine never talks to an oracle directly; it goes through
//! `OracleAdapter`, which applies the threshold, the per-call timeout and
//! turns every failure into a zero score.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    EmptyEmbedding { expected: usize, got: usize },
}

/// Carried by `OracleAdapter` as `Arc<dyn SimilarityOracle>`.
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// Similarity in [-1, 1]; higher means closer.
    async fn similarity(&self, requirement: &str, fragment: &str) -> Result<f32, OracleError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Cosine similarity in [-1, 1]. Zero vectors and mismatched dimensions give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// LexicalOracle
// ────────────────────────────────────────────────────────────────────────────

const STEM_CHARS: usize = 5;

/// Bag-of-stems cosine. Tokens are lowercased and cut to a 5-character
/// prefix, which folds most Russian inflections together ("серверов" and
/// "сервера" share "серве").
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOracle;

impl LexicalOracle {
    fn stems(text: &str) -> HashMap<String, f32> {
        let mut bag = HashMap::new();
        for token in text
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '#' || c == '+'))
            .filter(|t| t.chars().count() >= 2)
        {
            let stem: String = token.chars().take(STEM_CHARS).collect();
            *bag.entry(stem).or_insert(0.0) += 1.0;
        }
        bag
    }
}

#[async_trait]
impl SimilarityOracle for LexicalOracle {
    async fn similarity(&self, requirement: &str, fragment: &str) -> Result<f32, OracleError> {
        let a = Self::stems(requirement);
        let b = Self::stems(fragment);

        let dot: f32 = a
            .iter()
            .filter_map(|(stem, x)| b.get(stem).map(|y| x * y))
            .sum();
        let norm_a: f32 = a.values().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.values().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }
        Ok((dot / (norm_a * norm_b)).clamp(0.0, 1.0))
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of one (fragment, requirement) comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub matched: bool,
    pub source: Option<String>,
    pub score: f32,
}

impl Comparison {
    fn none() -> Self {
        Self {
            matched: false,
            source: None,
            score: 0.0,
        }
    }
}

pub struct OracleAdapter {
    oracle: Arc<dyn SimilarityOracle>,
    threshold: f32,
    timeout: Duration,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn SimilarityOracle>, threshold: f32, timeout: Duration) -> Self {
        Self {
            oracle,
            threshold,
            timeout,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.oracle.name()
    }

    /// Blank input on either side short-circuits without calling the oracle.
    /// Oracle errors and timeouts degrade to a zero, unmatched comparison.
    pub async fn compare(&self, fragment: &str, requirement: &str) -> Comparison {
        if fragment.trim().is_empty() || requirement.trim().is_empty() {
            return Comparison::none();
        }

        let score =
            match tokio::time::timeout(self.timeout, self.oracle.similarity(requirement, fragment))
                .await
            {
                Ok(Ok(score)) if score.is_nan() => {
                    warn!(backend = self.oracle.name(), "oracle returned NaN; scoring as 0");
                    return Comparison::none();
                }
                Ok(Ok(score)) => score.clamp(-1.0, 1.0),
                Ok(Err(e)) => {
                    warn!(backend = self.oracle.name(), error = %e, "oracle call failed; scoring as 0");
                    return Comparison::none();
                }
                Err(_) => {
                    warn!(
                        backend = self.oracle.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "oracle call timed out; scoring as 0"
                    );
                    return Comparison::none();
                }
            };

        Comparison {
            matched: score >= self.threshold,
            source: Some(fragment.to_string()),
            score,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the score of the first `(needle, score)` whose needle occurs in
    /// the fragment, else `default`. Counts calls.
    pub(crate) struct StubOracle {
        pub rules: Vec<(&'static str, f32)>,
        pub default: f32,
        pub calls: AtomicUsize,
    }

    impl StubOracle {
        pub(crate) fn new(rules: Vec<(&'static str, f32)>, default: f32) -> Self {
            Self {
                rules,
                default,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SimilarityOracle for StubOracle {
        async fn similarity(&self, _requirement: &str, fragment: &str) -> Result<f32, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rules
                .iter()
                .find(|(needle, _)| fragment.contains(needle))
                .map(|(_, score)| *score)
                .unwrap_or(self.default))
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl SimilarityOracle for FailingOracle {
        async fn similarity(&self, _: &str, _: &str) -> Result<f32, OracleError> {
            Err(OracleError::Api {
                status: 503,
                message: "unavailable".into(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl SimilarityOracle for SlowOracle {
        async fn similarity(&self, _: &str, _: &str) -> Result<f32, OracleError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0.99)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn adapter(oracle: Arc<dyn SimilarityOracle>) -> OracleAdapter {
        OracleAdapter::new(oracle, 0.5, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_compare_above_threshold_matches() {
        let oracle = Arc::new(StubOracle::new(vec![("Docker", 0.9)], 0.1));
        let result = adapter(oracle).compare("Знаю Docker", "Опыт с Docker").await;
        assert_eq!(
            result,
            Comparison {
                matched: true,
                source: Some("Знаю Docker".to_string()),
                score: 0.9
            }
        );
    }

    #[tokio::test]
    async fn test_compare_below_threshold_keeps_source() {
        let oracle = Arc::new(StubOracle::new(vec![], 0.2));
        let result = adapter(oracle).compare("Играю в шахматы", "Опыт с Docker").await;
        assert!(!result.matched);
        assert_eq!(result.source.as_deref(), Some("Играю в шахматы"));
        assert_eq!(result.score, 0.2);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let oracle = Arc::new(StubOracle::new(vec![], 0.5));
        assert!(adapter(oracle).compare("a fragment", "a requirement").await.matched);
    }

    #[tokio::test]
    async fn test_blank_input_skips_oracle() {
        let oracle = Arc::new(StubOracle::new(vec![], 0.9));
        let adapter = adapter(oracle.clone());

        assert_eq!(adapter.compare("   ", "Docker").await, Comparison::none());
        assert_eq!(adapter.compare("Docker", "").await, Comparison::none());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scores_are_clamped() {
        let oracle = Arc::new(StubOracle::new(vec![("high", 3.5), ("low", -7.0)], 0.0));
        let adapter = adapter(oracle);
        assert_eq!(adapter.compare("high", "req").await.score, 1.0);
        assert_eq!(adapter.compare("low", "req").await.score, -1.0);
    }

    #[tokio::test]
    async fn test_oracle_error_scores_zero() {
        let result = adapter(Arc::new(FailingOracle)).compare("Docker", "Docker").await;
        assert_eq!(result, Comparison::none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oracle_timeout_scores_zero() {
        let result = adapter(Arc::new(SlowOracle)).compare("Docker", "Docker").await;
        assert_eq!(result, Comparison::none());
    }

    #[tokio::test]
    async fn test_lexical_oracle_folds_inflections() {
        let oracle = LexicalOracle;
        let close = oracle
            .similarity("Настройка серверов", "Занимался настройкой сервера")
            .await
            .unwrap();
        let far = oracle
            .similarity("Настройка серверов", "Люблю готовить пасту")
            .await
            .unwrap();
        assert!(close > 0.5, "close = {close}");
        assert_eq!(far, 0.0);
    }

    #[tokio::test]
    async fn test_lexical_oracle_identical_text_is_one() {
        let score = LexicalOracle.similarity("Docker и Kubernetes", "docker и kubernetes").await.unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
