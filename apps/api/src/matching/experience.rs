//! Experience Extractor — free-text durations into month counts and bounds.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Upper-bound sentinel for requirements like "от 3 лет".
pub const OPEN_ENDED_MONTHS: u32 = 999;

const NO_EXPERIENCE_PHRASES: &[&str] = &["не требуется", "без опыта", "нет требований"];

#[derive(Debug, Clone, Copy)]
enum DurationKind {
    YearsAndMonths,
    Years,
    Months,
}

/// Applied in order; every match of every pattern is summed.
/// "4 года" hits both the `года?` and the `год[а-я]*` rule and counts twice.
static CANDIDATE_PATTERNS: Lazy<Vec<(Regex, DurationKind)>> = Lazy::new(|| {
    [
        (r"([0-9]+)\s*лет?\s*([0-9]+)?\s*месяц[а-я]*", DurationKind::YearsAndMonths),
        (r"([0-9]+)\s*года?\s*([0-9]+)?\s*месяц[а-я]*", DurationKind::YearsAndMonths),
        (r"([0-9]+)\s*лет?", DurationKind::Years),
        (r"([0-9]+)\s*года?", DurationKind::Years),
        (r"([0-9]+)\s*год[а-я]*", DurationKind::Years),
        (r"([0-9]+)\s*месяц[а-я]*", DurationKind::Months),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
    .collect()
});

static RE_DASHES_AND_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[–—\-\s]+").unwrap());

static RE_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"от[\s\-]*([0-9]+)[\s\-]*(лет|года?|месяц[а-я]*)").unwrap());
static RE_MORE_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"более[\s\-]*([0-9]+)[\s\-]*(лет|года?)").unwrap());
static RE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\-([0-9]+)[\s\-]*(лет|года?)").unwrap());
static RE_EXACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)[\s\-]*(лет|года?|месяц[а-я]*)").unwrap());

/// Required experience window in months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceBound {
    pub min_months: u32,
    pub max_months: u32,
}

impl ExperienceBound {
    pub const NONE: ExperienceBound = ExperienceBound {
        min_months: 0,
        max_months: 0,
    };

    pub fn new(min_months: u32, max_months: u32) -> Self {
        Self {
            min_months,
            max_months,
        }
    }

    /// (0, 0) reads as "no experience requirement".
    pub fn is_unspecified(&self) -> bool {
        *self == Self::NONE
    }

    pub fn is_open_ended(&self) -> bool {
        self.max_months == OPEN_ENDED_MONTHS
    }
}

/// Sums every duration mentioned across `texts`, in months.
///
/// Approximate by design: overlapping patterns count the same phrase more than once.
pub fn extract_candidate_months<S: AsRef<str>>(texts: &[S]) -> u32 {
    let full_text = texts
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut total: u32 = 0;
    for (pattern, kind) in CANDIDATE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&full_text) {
            let first = capture_number(&caps, 1);
            let months = match kind {
                DurationKind::YearsAndMonths => first
                    .saturating_mul(12)
                    .saturating_add(capture_number(&caps, 2)),
                DurationKind::Years => first.saturating_mul(12),
                DurationKind::Months => first,
            };
            total = total.saturating_add(months);
        }
    }
    total
}

/// Parses a vacancy requirement such as "от 3 лет" or "1-2 года".
/// Anything unrecognized yields `ExperienceBound::NONE`.
pub fn parse_required_experience(text: &str) -> ExperienceBound {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() || NO_EXPERIENCE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return ExperienceBound::NONE;
    }
    let s = RE_DASHES_AND_SPACES.replace_all(&lowered, "-");

    if let Some(caps) = RE_FROM.captures(&s) {
        let months = to_months(capture_number(&caps, 1), &caps[2]);
        return ExperienceBound::new(months, OPEN_ENDED_MONTHS);
    }
    if let Some(caps) = RE_MORE_THAN.captures(&s) {
        return ExperienceBound::new(
            capture_number(&caps, 1).saturating_mul(12),
            OPEN_ENDED_MONTHS,
        );
    }
    if let Some(caps) = RE_RANGE.captures(&s) {
        return ExperienceBound::new(
            capture_number(&caps, 1).saturating_mul(12),
            capture_number(&caps, 2).saturating_mul(12),
        );
    }
    if let Some(caps) = RE_EXACT.captures(&s) {
        let months = to_months(capture_number(&caps, 1), &caps[2]);
        return ExperienceBound::new(months, months);
    }
    ExperienceBound::NONE
}

/// Ratio in [0, 1] describing how well `months` fits `bound`.
///
/// Below the minimum falls off linearly; above a closed maximum yields the flat
/// `overqualified_score`.
pub fn experience_ratio(months: u32, bound: ExperienceBound, overqualified_score: f64) -> f64 {
    let ExperienceBound {
        min_months: min,
        max_months: max,
    } = bound;

    if bound.is_unspecified() || (min..=max).contains(&months) {
        return 1.0;
    }
    if months < min {
        return (1.0 - f64::from(min - months) / f64::from(min)).max(0.0);
    }
    if !bound.is_open_ended() {
        return overqualified_score;
    }
    1.0
}

/// Parses `requirement` and scores `months` against it.
pub fn match_experience(months: u32, requirement: &str, overqualified_score: f64) -> f64 {
    experience_ratio(months, parse_required_experience(requirement), overqualified_score)
}

fn capture_number(caps: &Captures, index: usize) -> u32 {
    caps.get(index)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

fn to_months(value: u32, unit: &str) -> u32 {
    if unit.contains("лет") || unit.contains("год") {
        value.saturating_mul(12)
    } else {
        value
    }
}
