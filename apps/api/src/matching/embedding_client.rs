/// Embedding client — `SimilarityOracle` backed by an OpenAI-compatible
/// `/embeddings` endpoint (sentence-transformers served behind an HTTP shim,
/// or any hosted provider speaking the same schema).
///
/// Requirement and candidate texts are embedded with role prefixes so the
/// model sees which side of the comparison a text belongs to. Embeddings are
/// memoized per prefixed text in a bounded cache; the oldest entry is evicted
/// once the capacity is reached.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matching::oracle::{cosine_similarity, OracleError, SimilarityOracle};

const REQUIREMENT_PREFIX: &str = "Требование: ";
const CANDIDATE_PREFIX: &str = "Текст кандидата: ";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Insertion-ordered embedding cache holding at most `capacity` entries.
#[derive(Debug)]
struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<String, Arc<Vec<f32>>>,
    order: VecDeque<String>,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.get(text).cloned()
    }

    fn insert(&mut self, text: String, embedding: Arc<Vec<f32>>) {
        if self.entries.insert(text.clone(), embedding).is_some() {
            return;
        }
        self.order.push_back(text);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct EmbeddingOracle {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    cache: Mutex<EmbeddingCache>,
}

impl EmbeddingOracle {
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: String,
        cache_capacity: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            url,
            api_key,
            model,
            cache: Mutex::new(EmbeddingCache::new(cache_capacity)),
        })
    }

    fn cached(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(text)
    }

    fn remember(&self, text: String, embedding: Arc<Vec<f32>>) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(text, embedding);
    }

    async fn embedding(&self, text: String) -> Result<Arc<Vec<f32>>, OracleError> {
        if let Some(hit) = self.cached(&text) {
            return Ok(hit);
        }
        let embedding = Arc::new(self.request(&text).await?);
        self.remember(text, embedding.clone());
        Ok(embedding)
    }

    /// Single embedding call. Retries on 429 and 5xx with exponential backoff.
    async fn request(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };
        let mut last_error: Option<OracleError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 500ms, 1s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(OracleError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, message);
                last_error = Some(OracleError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let raw = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&raw)
                    .map(|e| e.error.message)
                    .unwrap_or(raw);
                return Err(OracleError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: EmbeddingResponse = response.json().await?;
            let got = parsed.data.len();
            let embedding = parsed
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .filter(|e| !e.is_empty())
                .ok_or(OracleError::EmptyEmbedding { expected: 1, got })?;

            debug!(dims = embedding.len(), "embedding fetched");
            return Ok(embedding);
        }

        Err(last_error.unwrap_or(OracleError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl SimilarityOracle for EmbeddingOracle {
    async fn similarity(&self, requirement: &str, fragment: &str) -> Result<f32, OracleError> {
        let (req, frag) = tokio::try_join!(
            self.embedding(format!("{REQUIREMENT_PREFIX}{requirement}")),
            self.embedding(format!("{CANDIDATE_PREFIX}{fragment}")),
        )?;
        Ok(cosine_similarity(&req, &frag))
    }

    fn name(&self) -> &'static str {
        "embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> EmbeddingOracle {
        // port 9 (discard) is never expected to answer; tests below stay on the cache
        EmbeddingOracle::new(
            "http://127.0.0.1:9/v1/embeddings".to_string(),
            None,
            "test-model".to_string(),
            16,
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmbeddingRequest {
            model: "ai-forever/sbert_large_nlu_ru",
            input: ["Требование: Docker"],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "ai-forever/sbert_large_nlu_ru",
                "input": ["Требование: Docker"]
            })
        );
    }

    #[test]
    fn test_response_parses_openai_schema() {
        let raw = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,0.2]}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_similarity_uses_prefixed_cache_entries() {
        let oracle = oracle();
        oracle.remember("Требование: Docker".to_string(), Arc::new(vec![1.0, 0.0]));
        oracle.remember("Текст кандидата: Знаю Docker".to_string(), Arc::new(vec![1.0, 0.0]));
        oracle.remember("Текст кандидата: Пеку хлеб".to_string(), Arc::new(vec![0.0, 1.0]));

        let close = oracle.similarity("Docker", "Знаю Docker").await.unwrap();
        let far = oracle.similarity("Docker", "Пеку хлеб").await.unwrap();
        assert!((close - 1.0).abs() < 1e-6);
        assert_eq!(far, 0.0);
    }

    #[test]
    fn test_cache_roundtrip() {
        let oracle = oracle();
        assert!(oracle.cached("x").is_none());
        oracle.remember("x".to_string(), Arc::new(vec![0.5]));
        assert_eq!(oracle.cached("x").as_deref(), Some(&vec![0.5]));
    }

    #[test]
    fn test_cache_evicts_oldest_entry_at_capacity() {
        let mut cache = EmbeddingCache::new(2);
        cache.insert("a".to_string(), Arc::new(vec![1.0]));
        cache.insert("b".to_string(), Arc::new(vec![2.0]));
        cache.insert("c".to_string(), Arc::new(vec![3.0]));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").as_deref(), Some(&vec![2.0]));
        assert_eq!(cache.get("c").as_deref(), Some(&vec![3.0]));
    }

    #[test]
    fn test_cache_reinsert_does_not_grow() {
        let mut cache = EmbeddingCache::new(2);
        for _ in 0..5 {
            cache.insert("a".to_string(), Arc::new(vec![1.0]));
        }
        cache.insert("b".to_string(), Arc::new(vec![2.0]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn test_oracle_cache_stays_bounded() {
        let oracle = oracle();
        for i in 0..100 {
            oracle.remember(format!("text {i}"), Arc::new(vec![i as f32]));
        }
        let cache = oracle.cache.lock().unwrap();
        assert_eq!(cache.len(), 16);
        assert!(cache.get("text 0").is_none());
        assert!(cache.get("text 99").is_some());
    }
}
