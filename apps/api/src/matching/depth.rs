//! Depth Evaluator: rates how substantive an interview answer is.

use crate::matching::models::{DepthAnalysis, DepthIndicator, DepthLevel};

const EXAMPLE_MARKERS: &[&str] = &[
    "на проекте",
    "в компании",
    "у нас был",
    "когда я работал",
    "однажды",
];

const DETAIL_MARKERS: &[&str] = &[
    "использовал",
    "настроил",
    "применил",
    "инструмент",
    "технология",
    "версия",
    "v1",
    "v2",
];

const RESULT_MARKERS: &[&str] = &[
    "сократил",
    "увеличил",
    "добился",
    "улучшил",
    "экономия",
    "результат",
    "kpi",
];

const FAMILIES: [(DepthIndicator, &[&str]); 3] = [
    (DepthIndicator::Example, EXAMPLE_MARKERS),
    (DepthIndicator::Detail, DETAIL_MARKERS),
    (DepthIndicator::Result, RESULT_MARKERS),
];

/// One point per marker family present (case-insensitive substring).
/// 3 → detailed, 1-2 → example, 0 → surface.
pub fn evaluate_answer_depth(text: &str) -> DepthAnalysis {
    let lowered = text.to_lowercase();
    let indicators_found: Vec<DepthIndicator> = FAMILIES
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lowered.contains(m)))
        .map(|(indicator, _)| *indicator)
        .collect();

    let score = indicators_found.len() as u8;
    let depth_level = match score {
        3.. => DepthLevel::Detailed,
        1..=2 => DepthLevel::Example,
        _ => DepthLevel::Surface,
    };

    DepthAnalysis {
        depth_level,
        score,
        indicators_found,
    }
}
