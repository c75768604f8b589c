//! Fragment Segmenter: candidate text → atomic, deduplicated fragments.
//!
//! Resumes are split by section header first. Each section has its own
//! rule. Interview answers are already atomic and are only cleaned.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::matching::models::CandidateInput;

static RE_SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(опыт работы|образование|навыки|дополнительная информация|обо мне)\s*[:—]?")
        .unwrap()
});

/// "Яндекс 2019 — настоящее время", "Март 2020 - Май 2022".
static RE_EXPERIENCE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[А-Яа-яЁё]+\s+[0-9]{4}\s*[—–-]\s*[А-Яа-яЁё\s\d]+").unwrap());

static RE_SKILL_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\n•–—\-\s]\s*").unwrap());

static RE_SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?…]+["»”')]*\s+"#).unwrap());

static RE_FALLBACK_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

const SKILL_TRIM: &[char] = &[' ', '.', ',', ';', ':', '-', '–', '—'];
const OPENING_QUOTES: &[char] = &['"', '«', '“', '\'', '('];

/// Lowercase, without the trailing dot.
const ABBREVIATIONS: &[&str] = &[
    "им", "г", "гг", "ул", "д", "т.е", "т.д", "т.п", "т.к", "др", "пр", "проф", "акад", "см",
    "напр", "тыс", "млн", "руб", "англ", "корп", "стр",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Experience,
    Education,
    Skills,
    About,
}

impl Section {
    fn from_header(header: &str) -> Self {
        match header.to_lowercase().as_str() {
            "опыт работы" => Section::Experience,
            "образование" => Section::Education,
            "навыки" => Section::Skills,
            _ => Section::About,
        }
    }
}

/// Splits running text into sentences.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Punctuation-driven splitter aware of common Russian abbreviations and initials.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSentenceSplitter;

impl SentenceSplitter for RuleSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in RE_SENTENCE_END.find_iter(text) {
            let next = text[m.end()..].chars().next();
            let opens_sentence = next.is_some_and(|c| {
                c.is_uppercase() || c.is_ascii_digit() || OPENING_QUOTES.contains(&c)
            });
            if !opens_sentence {
                continue;
            }
            if m.as_str().starts_with('.') && ends_with_abbreviation(&text[start..m.start()]) {
                continue;
            }
            sentences.push(text[start..m.end()].trim().to_string());
            start = m.end();
        }
        sentences.push(text[start..].trim().to_string());

        sentences.retain(|s| s.chars().count() > 2);
        sentences
    }
}

fn ends_with_abbreviation(preceding: &str) -> bool {
    let Some(word) = preceding.split_whitespace().last() else {
        return false;
    };
    let word = word.trim_start_matches(OPENING_QUOTES);
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_uppercase() {
            return true;
        }
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Splits on terminator runs followed by whitespace + capital letter (or end of
/// text), then by newline. Pieces of 5 characters or fewer are dropped.
fn fallback_sentences(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    for m in RE_FALLBACK_END.find_iter(text) {
        let rest = &text[m.end()..];
        let trimmed = rest.trim_start();
        let boundary = trimmed.is_empty()
            || (trimmed.len() < rest.len()
                && trimmed
                    .chars()
                    .next()
                    .is_some_and(|c| matches!(c, 'А'..='Я' | 'Ё')));
        if boundary {
            parts.push(&text[start..m.start()]);
            start = m.end();
        }
    }
    parts.push(&text[start..]);

    parts
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|s| s.chars().count() > 5)
        .map(str::to_string)
        .collect()
}

/// Candidate text → fragments. Holds the sentence splitter; `None` selects the
/// plain punctuation fallback for the whole resume.
#[derive(Clone)]
pub struct Segmenter {
    splitter: Option<Arc<dyn SentenceSplitter>>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(Some(Arc::new(RuleSentenceSplitter)))
    }
}

impl Segmenter {
    pub fn new(splitter: Option<Arc<dyn SentenceSplitter>>) -> Self {
        Self { splitter }
    }

    pub fn segment(&self, input: &CandidateInput) -> Vec<String> {
        match input {
            CandidateInput::InterviewAnswers(answers) => dedup(
                answers
                    .iter()
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .map(str::to_string),
            ),
            CandidateInput::Resume(text) => self.segment_resume(text),
        }
    }

    fn segment_resume(&self, text: &str) -> Vec<String> {
        let Some(splitter) = self.splitter.as_deref() else {
            return dedup(fallback_sentences(text).into_iter().filter(|f| f.chars().count() > 2));
        };

        let headers: Vec<_> = RE_SECTION_HEADER.captures_iter(text).collect();
        let mut fragments = Vec::new();

        let preamble_end = headers
            .first()
            .and_then(|c| c.get(0))
            .map_or(text.len(), |m| m.start());
        fragments.extend(splitter.split(&text[..preamble_end]));

        for (i, caps) in headers.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let body_end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = text[whole.end()..body_end].trim();
            if body.is_empty() {
                continue;
            }

            match Section::from_header(name.as_str()) {
                Section::Experience => {
                    for block in experience_blocks(body) {
                        fragments.extend(splitter.split(&block));
                    }
                }
                Section::Skills => fragments.extend(split_skills(body)),
                Section::Education | Section::About => fragments.extend(splitter.split(body)),
            }
        }

        dedup(fragments.into_iter().filter(|f| f.chars().count() > 2))
    }
}

/// Splits the experience section at each "Employer YYYY — ..." marker.
/// Text before the first marker is dropped; no marker keeps the whole body.
fn experience_blocks(body: &str) -> Vec<String> {
    let starts: Vec<usize> = RE_EXPERIENCE_MARKER.find_iter(body).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![body.trim().to_string()];
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).copied().unwrap_or(body.len());
            body[*start..end].trim().to_string()
        })
        .filter(|block| block.chars().count() > 10)
        .collect()
}

fn split_skills(body: &str) -> Vec<String> {
    RE_SKILL_SEPARATOR
        .split(body)
        .map(|s| s.trim_matches(SKILL_TRIM))
        .filter(|s| s.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

fn dedup(fragments: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    fragments
        .into_iter()
        .filter(|f| seen.insert(f.clone()))
        .collect()
}
