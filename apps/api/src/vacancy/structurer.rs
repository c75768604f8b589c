//! Vacancy Structurer — labelled-field posting text → typed `VacancyRecord`.
//!
//! Stage 1 splits the text on the fixed label vocabulary of the HR export
//! form. Stage 2 maps the labels onto record fields. Neither stage fails:
//! anything missing simply stays empty.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extraction::normalizer::collapse_whitespace;

pub const LABEL_TITLE: &str = "Название";
pub const LABEL_REGION: &str = "Регион";
pub const LABEL_CITY: &str = "Город";
pub const LABEL_RESPONSIBILITIES: &str = "Обязанности (для публикации)";
pub const LABEL_REQUIREMENTS: &str = "Требования (для публикации)";
pub const LABEL_PREFERRED: &str = "Будет преимуществом:";
pub const LABEL_EDUCATION: &str = "Уровень образования";
pub const LABEL_EXPERIENCE: &str = "Требуемый опыт работы";
pub const LABEL_TRAVEL: &str = "Наличие командировок";

/// Every label the export form can contain, in form order.
/// Labels we do not map are still needed so their values do not leak into neighbours.
pub const FIELD_LABELS: &[&str] = &[
    "Наименование поля",
    "Значение",
    "Статус",
    LABEL_TITLE,
    LABEL_REGION,
    LABEL_CITY,
    "Адрес",
    "Тип трудового",
    "Тип занятости",
    "Текст график работы",
    "Доход (руб/мес)",
    "Оклад макс. (руб/мес)",
    "Оклад мин. (руб/мес)",
    "Годовая премия (%)",
    "Тип премирования. Описание",
    LABEL_RESPONSIBILITIES,
    LABEL_REQUIREMENTS,
    LABEL_PREFERRED,
    LABEL_EDUCATION,
    LABEL_EXPERIENCE,
    "Знание специальных программ",
    "Навыки работы на компьютере",
    "Знание иностранных языков",
    "Уровень владения языка",
    LABEL_TRAVEL,
    "Дополнительная информация",
];

const LIST_LABELS: &[&str] = &[LABEL_RESPONSIBILITIES, LABEL_REQUIREMENTS, LABEL_PREFERRED];

static RE_LABELS: Lazy<Regex> = Lazy::new(|| {
    // longest first so a label never loses to one of its own prefixes
    let mut labels: Vec<&str> = FIELD_LABELS.to_vec();
    labels.sort_by_key(|l| std::cmp::Reverse(l.chars().count()));
    let alternation = labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?:{alternation})")).unwrap()
});

static RE_ITEM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]\s+|[•▪▶➢‣⁃*\-–—]\s*)").unwrap());

/// Raw value of one labelled field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

/// Label → value mapping produced by stage 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledFields(HashMap<&'static str, FieldValue>);

impl LabelledFields {
    pub fn scalar(&self, label: &str) -> String {
        match self.0.get(label) {
            Some(FieldValue::Scalar(s)) => s.clone(),
            Some(FieldValue::List(items)) => items.join("; "),
            None => String::new(),
        }
    }

    pub fn list(&self, label: &str) -> Vec<String> {
        match self.0.get(label) {
            Some(FieldValue::List(items)) => items.clone(),
            Some(FieldValue::Scalar(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed vacancy. Immutable once structured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacancyRecord {
    pub title: String,
    pub location: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub preferred: Vec<String>,
    pub education: String,
    /// Raw requirement text, e.g. "от 3 лет".
    #[serde(alias = "experience_years")]
    pub experience_requirement: String,
    pub travel: String,
}

impl VacancyRecord {
    /// Runs both structuring stages over raw posting text.
    pub fn from_text(text: &str) -> Self {
        structure_vacancy(&split_labelled_fields(text))
    }
}

/// Stage 1: splits posting text on known labels.
///
/// Text before the first label is discarded. A repeated label keeps its last value.
pub fn split_labelled_fields(text: &str) -> LabelledFields {
    let mut fields = HashMap::new();
    let matches: Vec<_> = RE_LABELS.find_iter(text).collect();

    for (i, m) in matches.iter().enumerate() {
        let Some(label) = FIELD_LABELS.iter().copied().find(|l| *l == m.as_str()) else {
            continue;
        };
        let end = matches.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
        let raw = trim_label_separator(&text[m.end()..end]);

        let value = if LIST_LABELS.contains(&label) {
            FieldValue::List(split_list_items(raw))
        } else {
            FieldValue::Scalar(collapse_whitespace(raw))
        };
        fields.insert(label, value);
    }

    LabelledFields(fields)
}

/// Stage 2: maps labelled fields onto a `VacancyRecord`.
pub fn structure_vacancy(fields: &LabelledFields) -> VacancyRecord {
    let city = fields.scalar(LABEL_CITY);
    let location = if city.is_empty() {
        fields.scalar(LABEL_REGION)
    } else {
        city
    };

    VacancyRecord {
        title: fields.scalar(LABEL_TITLE),
        location,
        responsibilities: fields.list(LABEL_RESPONSIBILITIES),
        requirements: fields.list(LABEL_REQUIREMENTS),
        preferred: fields.list(LABEL_PREFERRED),
        education: fields.scalar(LABEL_EDUCATION),
        experience_requirement: fields.scalar(LABEL_EXPERIENCE),
        travel: fields.scalar(LABEL_TRAVEL),
    }
}

fn trim_label_separator(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '—' | '–'))
        .trim_end()
}

/// `;` wins; otherwise blank lines and line-leading enumerators start new items.
fn split_list_items(value: &str) -> Vec<String> {
    if value.contains(';') {
        return value.split(';').filter_map(clean_item).collect();
    }

    let mut items = Vec::new();
    let mut current = String::new();
    for line in value.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            items.extend(clean_item(&current));
            current.clear();
            continue;
        }
        if RE_ITEM_MARKER.is_match(trimmed) && !current.trim().is_empty() {
            items.extend(clean_item(&current));
            current.clear();
        }
        current.push('\n');
        current.push_str(trimmed);
    }
    items.extend(clean_item(&current));
    items
}

fn clean_item(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_marker = RE_ITEM_MARKER.replace(trimmed, "");
    let item = collapse_whitespace(&without_marker);
    (!item.is_empty()).then_some(item)
}
