use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::TextExtractor;
use crate::matching::models::{AnalysisResult, CandidateInput, CandidateMode, ScoreCategory, Weights};
use crate::state::AppState;
use crate::vacancy::VacancyRecord;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Resume text, or a list of interview answers.
    pub candidate: Value,
    /// Pre-structured vacancy. Wins over `vacancy_text` when both are sent.
    #[serde(default)]
    pub vacancy: Option<VacancyRecord>,
    #[serde(default)]
    pub vacancy_text: Option<String>,
    /// Category → weight. Parsed by `parse_weights` so that unknown keys
    /// surface as `INVALID_INPUT` rather than a body rejection.
    #[serde(default)]
    pub weights: Option<Value>,
    #[serde(default)]
    pub return_features: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub mode: CandidateMode,
    pub result: AnalysisResult,
}

impl AnalyzeResponse {
    fn new(mode: CandidateMode, result: AnalysisResult) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            mode,
            result,
        }
    }
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let candidate = CandidateInput::try_from(req.candidate)?;
    let weights = req.weights.map(parse_weights).transpose()?;
    let vacancy = resolve_vacancy(req.vacancy, req.vacancy_text)?;

    let result = state
        .analyzer
        .analyze(&candidate, &vacancy, weights.as_ref(), req.return_features)
        .await?;

    Ok(Json(AnalyzeResponse::new(candidate.mode(), result)))
}

/// POST /api/v1/analyze/upload
///
/// Multipart fields: `vacancy` (file or plain text) or `vacancy_text`,
/// `resume` (file), optional `return_features`.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut vacancy_text: Option<String> = None;
    let mut vacancy_file: Option<(String, Bytes)> = None;
    let mut resume_file: Option<(String, Bytes)> = None;
    let mut return_features = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;

        match (name.as_str(), filename) {
            ("vacancy", Some(filename)) => vacancy_file = Some((filename, data)),
            ("vacancy", None) | ("vacancy_text", _) => vacancy_text = Some(utf8_field(&name, &data)?),
            ("resume", Some(filename)) => resume_file = Some((filename, data)),
            ("resume", None) => {
                return Err(AppError::Validation(
                    "Field 'resume' must be a file upload".to_string(),
                ))
            }
            ("return_features", _) => {
                return_features = parse_flag(&utf8_field(&name, &data)?)?;
            }
            (other, _) => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let vacancy_text = match (vacancy_file, vacancy_text) {
        (Some((filename, data)), _) => extract_document(state.extractor.clone(), filename, data).await?,
        (None, Some(text)) => text,
        (None, None) => {
            return Err(AppError::Validation(
                "Either a 'vacancy' file or 'vacancy_text' is required".to_string(),
            ))
        }
    };
    let vacancy = resolve_vacancy(None, Some(vacancy_text))?;

    let (filename, data) = resume_file
        .ok_or_else(|| AppError::Validation("Field 'resume' is required".to_string()))?;
    let resume_text = match extract_document(state.extractor.clone(), filename.clone(), data).await {
        Ok(text) => text,
        Err(e) => {
            warn!(filename = %filename, error = %e, "resume extraction failed; analyzing empty text");
            String::new()
        }
    };

    let candidate = CandidateInput::Resume(resume_text);
    let result = state
        .analyzer
        .analyze(&candidate, &vacancy, None, return_features)
        .await?;

    Ok(Json(AnalyzeResponse::new(candidate.mode(), result)))
}

fn resolve_vacancy(
    record: Option<VacancyRecord>,
    text: Option<String>,
) -> Result<VacancyRecord, AppError> {
    match (record, text) {
        (Some(record), _) => Ok(record),
        (None, Some(text)) if !text.trim().is_empty() => Ok(VacancyRecord::from_text(&text)),
        _ => Err(AppError::Validation(
            "Either 'vacancy' or a non-empty 'vacancy_text' is required".to_string(),
        )),
    }
}

/// Extraction is CPU-bound (PDF parsing), so it runs on the blocking pool.
async fn extract_document(
    extractor: Arc<dyn TextExtractor>,
    filename: String,
    data: Bytes,
) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extractor.extract(&filename, &data))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::from)
}

fn parse_weights(raw: Value) -> Result<Weights, AppError> {
    let weights: BTreeMap<ScoreCategory, f64> = serde_json::from_value(raw)
        .map_err(|e| AppError::InvalidInput(format!("Invalid weights: {e}")))?;
    Weights::new(weights)
}

fn utf8_field(name: &str, data: &[u8]) -> Result<String, AppError> {
    String::from_utf8(data.to_vec())
        .map_err(|_| AppError::Validation(format!("Field '{name}' must be UTF-8 text")))
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "Field 'return_features' must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_weights_rejects_unknown_category() {
        let err = parse_weights(json!({"bogus": 1.0})).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("bogus")));
    }

    #[test]
    fn test_parse_weights_rejects_non_numeric_value() {
        let err = parse_weights(json!({"technical_skills": "high"})).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_parse_weights_accepts_known_categories() {
        let weights = parse_weights(json!({"technical_skills": 2.0, "case_projects": 1.0}));
        assert!(weights.is_ok());
    }

    #[test]
    fn test_record_wins_over_text() {
        let record = VacancyRecord {
            title: "SRE".into(),
            ..Default::default()
        };
        let resolved = resolve_vacancy(Some(record), Some("Название Аналитик".into())).unwrap();
        assert_eq!(resolved.title, "SRE");
    }

    #[test]
    fn test_text_is_structured() {
        let resolved = resolve_vacancy(None, Some("Название Аналитик".into())).unwrap();
        assert_eq!(resolved.title, "Аналитик");
    }

    #[test]
    fn test_missing_vacancy_is_validation_error() {
        assert!(matches!(
            resolve_vacancy(None, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolve_vacancy(None, Some("   ".into())),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
