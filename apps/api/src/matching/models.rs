//! Data model shared by the matching engine, its handlers and its tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

// ────────────────────────────────────────────────────────────────────────────
// Candidate input
// ────────────────────────────────────────────────────────────────────────────

/// Candidate text in one of the two supported shapes. Resolved once at entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateInput {
    /// One long resume string.
    Resume(String),
    /// Interview answers, one per question, in question order.
    InterviewAnswers(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateMode {
    Resume,
    Interview,
}

impl CandidateInput {
    pub fn mode(&self) -> CandidateMode {
        match self {
            CandidateInput::Resume(_) => CandidateMode::Resume,
            CandidateInput::InterviewAnswers(_) => CandidateMode::Interview,
        }
    }

    pub fn is_interview(&self) -> bool {
        matches!(self, CandidateInput::InterviewAnswers(_))
    }
}

impl TryFrom<Value> for CandidateInput {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(CandidateInput::Resume(text)),
            Value::Array(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::String(answer) => Ok(answer),
                    other => Err(AppError::InvalidInput(format!(
                        "candidate answer #{i} must be a string, got {}",
                        json_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CandidateInput::InterviewAnswers),
            other => Err(AppError::InvalidInput(format!(
                "candidate must be a string or a list of strings, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Categories and weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    TechnicalSkills,
    CommunicationSkills,
    CaseProjects,
    ExperienceYearsMatch,
    ExperienceRelevance,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::TechnicalSkills,
        ScoreCategory::CommunicationSkills,
        ScoreCategory::CaseProjects,
        ScoreCategory::ExperienceYearsMatch,
        ScoreCategory::ExperienceRelevance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::TechnicalSkills => "technical_skills",
            ScoreCategory::CommunicationSkills => "communication_skills",
            ScoreCategory::CaseProjects => "case_projects",
            ScoreCategory::ExperienceYearsMatch => "experience_years_match",
            ScoreCategory::ExperienceRelevance => "experience_relevance",
        }
    }
}

/// Base category weights. Only the active subset is used, renormalized to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights(BTreeMap<ScoreCategory, f64>);

impl Default for Weights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (ScoreCategory::TechnicalSkills, 0.4),
            (ScoreCategory::ExperienceYearsMatch, 0.3),
            (ScoreCategory::CommunicationSkills, 0.15),
            (ScoreCategory::CaseProjects, 0.1),
            (ScoreCategory::ExperienceRelevance, 0.05),
        ]))
    }
}

impl Weights {
    /// Caller-supplied weights. Categories left out can never become active.
    pub fn new(weights: BTreeMap<ScoreCategory, f64>) -> Result<Self, AppError> {
        if let Some((category, weight)) = weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(AppError::InvalidInput(format!(
                "weight for {} must be a finite non-negative number, got {weight}",
                category.as_str()
            )));
        }
        let total: f64 = weights.values().sum();
        if !total.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "weights must sum to a finite number, got {total}"
            )));
        }
        Ok(Self(weights))
    }

    pub fn contains(&self, category: ScoreCategory) -> bool {
        self.0.contains_key(&category)
    }

    /// Restricts the weights to `active` and rescales them to sum to 1.0.
    /// Falls back to `{experience_relevance: 1.0}` when nothing usable remains.
    pub fn renormalize(&self, active: &BTreeSet<ScoreCategory>) -> BTreeMap<ScoreCategory, f64> {
        let restricted: BTreeMap<_, _> = self
            .0
            .iter()
            .filter(|(category, _)| active.contains(*category))
            .map(|(category, weight)| (*category, *weight))
            .collect();

        let total: f64 = restricted.values().sum();
        if restricted.is_empty() || total <= 0.0 {
            return BTreeMap::from([(ScoreCategory::ExperienceRelevance, 1.0)]);
        }

        restricted
            .into_iter()
            .map(|(category, weight)| (category, weight / total))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthLevel {
    Surface,
    Example,
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthIndicator {
    Example,
    Detail,
    Result,
}

/// How substantively an interview answer addresses a requirement. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthAnalysis {
    pub depth_level: DepthLevel,
    pub score: u8,
    pub indicators_found: Vec<DepthIndicator>,
}

/// Evidence for one vacancy item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub item: String,
    pub found: bool,
    pub source: Option<String>,
    pub similarity_score: f64, // 0.0 – 1.0, 3 decimals
    pub category: ScoreCategory,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub depth_analysis: Option<DepthAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateExperience {
    pub total_months: u32,
    pub total_years: f64,
    pub required_experience: String,
    pub match_score: f64,
}

/// A categorized vacancy requirement, reported when features are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub requirement: String,
    pub category: ScoreCategory,
}

/// Full analysis output. Serialized as-is into downstream report storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_match_percent: f64, // 0 – 100, 1 decimal
    pub criteria_scores: BTreeMap<ScoreCategory, f64>,
    pub matched_items: Vec<MatchResult>,
    pub candidate_experience: CandidateExperience,
    pub weights_used: BTreeMap<ScoreCategory, f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub features_used: Option<Vec<Feature>>,
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
