//! Scoring Engine — orchestrates segmentation, experience matching,
//! categorization and oracle comparisons into an `AnalysisResult`.
//!
//! Algorithm:
//! 1. Segment the candidate; count experience months.
//! 2. Flatten vacancy items and categorize each one.
//! 3. Active categories = item categories present in the weight table,
//!    plus `experience_years_match` when the vacancy states a parseable
//!    requirement. Renormalize their weights to 1.0.
//! 4. Compare every item against every fragment; keep the best positive score.
//! 5. Category percent = mean best score × 100; experience = ratio × 100.
//! 6. Total = Σ percent × weight.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::matching::categorizer::Categorizer;
use crate::matching::depth::evaluate_answer_depth;
use crate::matching::experience::{experience_ratio, extract_candidate_months, parse_required_experience};
use crate::matching::models::{
    round_to, AnalysisResult, CandidateExperience, CandidateInput, Feature, MatchResult,
    ScoreCategory, Weights,
};
use crate::matching::oracle::OracleAdapter;
use crate::matching::segmenter::Segmenter;
use crate::vacancy::{VacancyItem, VacancyRecord, VacancySection};

/// Tunable constants of the scoring formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    /// Used for an active `communication_skills` category with no items of its own.
    pub default_soft_skill_score: f64,
    /// Experience ratio when the candidate exceeds a closed upper bound.
    pub overqualified_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_soft_skill_score: 0.3,
            overqualified_score: 0.7,
        }
    }
}

/// Best positive comparison for one vacancy item.
#[derive(Debug, Clone, PartialEq)]
struct BestMatch {
    /// Fragment index, kept for the tie-break.
    fragment: usize,
    source: Option<String>,
    score: f32,
    /// Threshold verdict from the oracle adapter.
    matched: bool,
}

pub struct Analyzer {
    segmenter: Segmenter,
    categorizer: Categorizer,
    oracle: Arc<OracleAdapter>,
    scoring: ScoringConfig,
    concurrency: usize,
}

impl Analyzer {
    pub fn new(
        segmenter: Segmenter,
        categorizer: Categorizer,
        oracle: OracleAdapter,
        scoring: ScoringConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            segmenter,
            categorizer,
            oracle: Arc::new(oracle),
            scoring,
            concurrency: concurrency.max(1),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.oracle.backend()
    }

    /// Categorized requirements, minus the uncategorized `experience_relevance` ones.
    pub fn features(&self, vacancy: &VacancyRecord) -> Vec<Feature> {
        vacancy
            .items()
            .into_iter()
            .filter_map(|item| {
                let category = self.categorizer.categorize(&item.text);
                (category != ScoreCategory::ExperienceRelevance).then_some(Feature {
                    requirement: item.text,
                    category,
                })
            })
            .collect()
    }

    pub async fn analyze(
        &self,
        input: &CandidateInput,
        vacancy: &VacancyRecord,
        weights: Option<&Weights>,
        return_features: bool,
    ) -> Result<AnalysisResult, AppError> {
        let default_weights = Weights::default();
        let weights = weights.unwrap_or(&default_weights);

        // 1. Candidate side
        let fragments = self.segmenter.segment(input);
        let total_months = match input {
            CandidateInput::Resume(text) => extract_candidate_months(&[text]),
            CandidateInput::InterviewAnswers(answers) => {
                let non_empty: Vec<&str> = answers
                    .iter()
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .collect();
                extract_candidate_months(&non_empty)
            }
        };

        // 2. Vacancy side
        let items = vacancy.items();
        let categories: Vec<ScoreCategory> = items
            .iter()
            .map(|item| self.categorizer.categorize(&item.text))
            .collect();
        log_section_counts(&items);

        let bound = parse_required_experience(&vacancy.experience_requirement);
        let experience_score =
            experience_ratio(total_months, bound, self.scoring.overqualified_score);

        // 3. Active categories and weights
        let mut active: BTreeSet<ScoreCategory> = categories
            .iter()
            .copied()
            .filter(|c| weights.contains(*c))
            .collect();
        if !bound.is_unspecified() && weights.contains(ScoreCategory::ExperienceYearsMatch) {
            active.insert(ScoreCategory::ExperienceYearsMatch);
        }
        let weights_used = weights.renormalize(&active);

        // 4. Pairwise comparisons
        let best = self.best_matches(&items, &fragments).await?;

        let matched_items: Vec<MatchResult> = items
            .iter()
            .zip(&categories)
            .zip(&best)
            .map(|((item, category), best)| {
                let source = best.as_ref().and_then(|b| b.source.clone());
                let score = best.as_ref().map_or(0.0, |b| f64::from(b.score));
                MatchResult {
                    item: item.text.clone(),
                    found: best.as_ref().is_some_and(|b| b.matched),
                    depth_analysis: source
                        .as_deref()
                        .filter(|_| input.is_interview())
                        .map(evaluate_answer_depth),
                    source,
                    similarity_score: round_to(score, 3),
                    category: *category,
                }
            })
            .collect();

        // 5. Category percents
        let criteria_scores: BTreeMap<ScoreCategory, f64> = weights_used
            .keys()
            .map(|category| {
                let percent = if *category == ScoreCategory::ExperienceYearsMatch {
                    round_to(experience_score * 100.0, 1)
                } else {
                    let scores: Vec<f64> = categories
                        .iter()
                        .zip(&best)
                        .filter(|(c, _)| *c == category)
                        .map(|(_, b)| b.as_ref().map_or(0.0, |b| f64::from(b.score)))
                        .collect();
                    category_percent(*category, &scores, &self.scoring)
                };
                (*category, percent)
            })
            .collect();

        // 6. Total
        let total: f64 = weights_used
            .iter()
            .map(|(category, weight)| criteria_scores.get(category).copied().unwrap_or(0.0) * weight)
            .sum();
        let total_match_percent = round_to(total, 1);

        info!(
            mode = ?input.mode(),
            backend = self.backend(),
            fragments = fragments.len(),
            items = items.len(),
            total_months,
            total_match_percent,
            "analysis complete"
        );

        Ok(AnalysisResult {
            total_match_percent,
            criteria_scores,
            matched_items,
            candidate_experience: CandidateExperience {
                total_months,
                total_years: round_to(f64::from(total_months) / 12.0, 1),
                required_experience: vacancy.experience_requirement.clone(),
                match_score: round_to(experience_score, 3),
            },
            weights_used,
            features_used: return_features.then(|| self.features(vacancy)),
        })
    }

    /// Runs every (item, fragment) comparison, at most `concurrency` at a time,
    /// and reduces each item to its best strictly positive score.
    /// Ties go to the earliest fragment.
    async fn best_matches(
        &self,
        items: &[VacancyItem],
        fragments: &[String],
    ) -> Result<Vec<Option<BestMatch>>, AppError> {
        let mut best: Vec<Option<BestMatch>> = vec![None; items.len()];
        if fragments.is_empty() {
            return Ok(best);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (i, item) in items.iter().enumerate() {
            for (j, fragment) in fragments.iter().enumerate() {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("oracle semaphore closed: {e}"))?;
                let oracle = self.oracle.clone();
                let fragment = fragment.clone();
                let requirement = item.text.clone();
                tasks.spawn(async move {
                    let comparison = oracle.compare(&fragment, &requirement).await;
                    drop(permit);
                    (i, j, comparison)
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (i, j, comparison) = joined.map_err(|e| AppError::Internal(e.into()))?;
            let score = comparison.score;
            if score <= 0.0 {
                continue;
            }
            let better = match &best[i] {
                None => true,
                Some(current) => {
                    score > current.score || (score == current.score && j < current.fragment)
                }
            };
            if better {
                best[i] = Some(BestMatch {
                    fragment: j,
                    source: comparison.source,
                    score,
                    matched: comparison.matched,
                });
            }
        }

        debug!(
            pairs = items.len() * fragments.len(),
            matched = best.iter().filter(|b| b.is_some()).count(),
            "comparisons finished"
        );
        Ok(best)
    }
}

/// Mean best score of a category's items as a percent. An active category
/// without items of its own gets the soft-skill default (communication) or 0.
fn category_percent(category: ScoreCategory, scores: &[f64], scoring: &ScoringConfig) -> f64 {
    let mean = if scores.is_empty() {
        if category == ScoreCategory::CommunicationSkills {
            scoring.default_soft_skill_score
        } else {
            0.0
        }
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    round_to(mean * 100.0, 1)
}

fn log_section_counts(items: &[VacancyItem]) {
    let count = |section: VacancySection| items.iter().filter(|i| i.section == section).count();
    debug!(
        responsibilities = count(VacancySection::Responsibilities),
        requirements = count(VacancySection::Requirements),
        preferred = count(VacancySection::Preferred),
        "vacancy items flattened"
    );
}
