pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::matching::handlers as matching;
use crate::state::AppState;
use crate::vacancy::handlers as vacancy;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Vacancy API
        .route(
            "/api/v1/vacancies/structure",
            post(vacancy::handle_structure_vacancy),
        )
        // Matching API
        .route("/api/v1/analyze", post(matching::handle_analyze))
        .route(
            "/api/v1/analyze/upload",
            post(matching::handle_analyze_upload),
        )
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::extraction::DocumentExtractor;
    use crate::matching::categorizer::Categorizer;
    use crate::matching::engine::{Analyzer, ScoringConfig};
    use crate::matching::handlers::AnalyzeResponse;
    use crate::matching::models::{CandidateMode, ScoreCategory};
    use crate::matching::oracle::tests::StubOracle;
    use crate::matching::oracle::OracleAdapter;
    use crate::matching::segmenter::Segmenter;

    const BOUNDARY: &str = "matcher-test-boundary";

    fn app() -> Router {
        let oracle = StubOracle::new(vec![("Docker", 0.9)], 0.1);
        let analyzer = Analyzer::new(
            Segmenter::default(),
            Categorizer::default(),
            OracleAdapter::new(Arc::new(oracle), 0.5, Duration::from_secs(1)),
            ScoringConfig::default(),
            4,
        );
        build_router(AppState {
            analyzer: Arc::new(analyzer),
            extractor: Arc::new(DocumentExtractor),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// (name, optional filename, content)
    fn post_multipart(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["oracle"], "stub");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_structure_vacancy() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/vacancies/structure",
                json!({"text": "Название: Инженер\nГород: Казань\nТребования (для публикации): Linux; Docker"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["title"], "Инженер");
        assert_eq!(body["location"], "Казань");
        assert_eq!(body["requirements"], json!(["Linux", "Docker"]));
    }

    #[tokio::test]
    async fn test_structure_empty_text_is_400() {
        let response = app()
            .oneshot(post_json("/api/v1/vacancies/structure", json!({"text": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_interview_with_record() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/analyze",
                json!({
                    "candidate": ["Да, 3 года", ""],
                    "vacancy": {
                        "requirements": ["Опыт работы с Docker"],
                        "experience_requirement": "от 3 лет"
                    },
                    "return_features": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: AnalyzeResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.mode, CandidateMode::Interview);
        assert_eq!(parsed.result.candidate_experience.total_months, 72);
        assert_eq!(parsed.result.candidate_experience.match_score, 1.0);
        assert_eq!(
            parsed.result.matched_items[0].source.as_deref(),
            Some("Да, 3 года")
        );
        assert!(!parsed.result.matched_items[0].found);
        assert_eq!(parsed.result.features_used.map(|f| f.len()), Some(1));
    }

    #[tokio::test]
    async fn test_analyze_resume_with_vacancy_text() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/analyze",
                json!({
                    "candidate": "Навыки: Docker, Kubernetes",
                    "vacancy_text": "Требования (для публикации): Docker",
                    "weights": {"technical_skills": 1.0}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["mode"], "resume");
        assert_eq!(body["result"]["total_match_percent"], 90.0);
        assert_eq!(body["result"]["weights_used"], json!({"technical_skills": 1.0}));
        assert!(body["result"].get("features_used").is_none());
        assert!(body["analysis_id"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_candidate_shape() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/analyze",
                json!({"candidate": 42, "vacancy_text": "Название X"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_analyze_rejects_negative_weight() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/analyze",
                json!({
                    "candidate": "text",
                    "vacancy_text": "Название X",
                    "weights": {"case_projects": -1.0}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_analyze_unknown_weight_key_is_json_422() {
        let response = app()
            .oneshot(post_json(
                "/api/v1/analyze",
                json!({
                    "candidate": "text",
                    "vacancy_text": "Название X",
                    "weights": {"bogus": 1.0}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert!(body["error"]["message"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_analyze_without_vacancy_is_400() {
        let response = app()
            .oneshot(post_json("/api/v1/analyze", json!({"candidate": "text"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_resume_file() {
        let response = app()
            .oneshot(post_multipart(
                "/api/v1/analyze/upload",
                &[
                    ("vacancy_text", None, "Требования (для публикации): Docker"),
                    ("resume", Some("resume.txt"), "Навыки:\n• Docker\n• Linux"),
                    ("return_features", None, "true"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["mode"], "resume");
        assert_eq!(body["result"]["matched_items"][0]["found"], true);
        assert_eq!(
            body["result"]["features_used"][0]["category"],
            ScoreCategory::TechnicalSkills.as_str()
        );
    }

    #[tokio::test]
    async fn test_upload_unreadable_resume_degrades_to_empty() {
        let response = app()
            .oneshot(post_multipart(
                "/api/v1/analyze/upload",
                &[
                    ("vacancy", None, "Требования (для публикации): Docker"),
                    ("resume", Some("resume.docx"), "binary"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["result"]["matched_items"][0]["found"], false);
        assert!(body["result"]["matched_items"][0]["source"].is_null());
    }

    #[tokio::test]
    async fn test_upload_unreadable_vacancy_is_422() {
        let response = app()
            .oneshot(post_multipart(
                "/api/v1/analyze/upload",
                &[
                    ("vacancy", Some("vacancy.docx"), "binary"),
                    ("resume", Some("resume.txt"), "Docker"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "EXTRACTION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_without_resume_is_400() {
        let response = app()
            .oneshot(post_multipart(
                "/api/v1/analyze/upload",
                &[("vacancy_text", None, "Требования (для публикации): Docker")],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
