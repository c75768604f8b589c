use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::vacancy::structurer::{split_labelled_fields, structure_vacancy};
use crate::vacancy::VacancyRecord;

#[derive(Debug, Deserialize)]
pub struct StructureVacancyRequest {
    pub text: String,
}

/// POST /api/v1/vacancies/structure
pub async fn handle_structure_vacancy(
    Json(req): Json<StructureVacancyRequest>,
) -> Result<Json<VacancyRecord>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Vacancy text is empty".to_string()));
    }

    let fields = split_labelled_fields(&req.text);
    debug!(labels = fields.len(), "vacancy fields split");

    Ok(Json(structure_vacancy(&fields)))
}
