use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every field has a default, so a bare environment starts a local
/// instance backed by the lexical oracle.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// OpenAI-compatible embeddings endpoint. `None` selects the lexical oracle.
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    /// Upper bound on memoized embeddings; the oldest entry is evicted first.
    pub embedding_cache_capacity: usize,
    pub match_threshold: f32,
    pub default_soft_skill_score: f64,
    pub overqualified_score: f64,
    pub oracle_timeout_ms: u64,
    pub oracle_concurrency: usize,
    pub category_keywords_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            embedding_api_url: optional_env("EMBEDDING_API_URL"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "ai-forever/sbert_large_nlu_ru".to_string()),
            embedding_cache_capacity: env_or("EMBEDDING_CACHE_CAPACITY", 4096)?,
            match_threshold: env_or("MATCH_THRESHOLD", 0.5)?,
            default_soft_skill_score: env_or("DEFAULT_SOFT_SKILL_SCORE", 0.3)?,
            overqualified_score: env_or("OVERQUALIFIED_SCORE", 0.7)?,
            oracle_timeout_ms: env_or("ORACLE_TIMEOUT_MS", 10_000)?,
            oracle_concurrency: env_or("ORACLE_CONCURRENCY", 8)?,
            category_keywords_path: optional_env("CATEGORY_KEYWORDS_PATH").map(PathBuf::from),
        };

        anyhow::ensure!(
            config.oracle_concurrency > 0,
            "ORACLE_CONCURRENCY must be at least 1"
        );
        anyhow::ensure!(
            config.embedding_cache_capacity > 0,
            "EMBEDDING_CACHE_CAPACITY must be at least 1"
        );
        Ok(config)
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_to_default_when_unset() {
        let value: u16 = env_or("VACANCY_MATCHER_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        std::env::set_var("VACANCY_MATCHER_TEST_BAD_THRESHOLD", "not-a-number");
        let result: Result<f32> = env_or("VACANCY_MATCHER_TEST_BAD_THRESHOLD", 0.5);
        assert!(result.is_err());
        std::env::remove_var("VACANCY_MATCHER_TEST_BAD_THRESHOLD");
    }

    #[test]
    fn test_optional_env_treats_blank_as_unset() {
        std::env::set_var("VACANCY_MATCHER_TEST_BLANK", "   ");
        assert!(optional_env("VACANCY_MATCHER_TEST_BLANK").is_none());
        std::env::remove_var("VACANCY_MATCHER_TEST_BLANK");
    }
}
