//! Text Normalizer — collapses extracted document text into one clean line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Line, paragraph and exotic space separators that become a plain space.
static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\n\r\x0B\x0C\x{00A0}\x{1680}\x{2000}-\x{200F}\x{2028}-\x{202F}\x{205F}\x{2060}\x{3000}]",
    )
    .unwrap()
});

/// C0/C1 control characters not already mapped to a space.
static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x{7F}-\x{9F}]").unwrap());

static RE_BIDI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{200E}\x{200F}\x{202A}-\x{202E}]").unwrap());

static RE_BULLETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[•▪▶➢‣⁃*]").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalizes raw extracted text into a single trimmed line.
///
/// Order matters: separators become spaces before controls are stripped, so
/// a vertical tab splits words instead of gluing them. The function is
/// idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = replace_tabs(text);
    let text = RE_SEPARATORS.replace_all(&text, " ");
    let text = RE_CONTROL.replace_all(&text, "");
    let text = RE_BIDI.replace_all(&text, "");
    // stripping can splice a backslash and a `t` into a new escaped tab
    let text = replace_tabs(&text);
    let text = RE_BULLETS.replace_all(&text, " ");
    let text = replace_bare_hyphens(&text);
    let text = RE_WHITESPACE.replace_all(&text, " ");

    text.trim().to_string()
}

/// Collapses whitespace runs and trims, without touching any other character.
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn replace_tabs(text: &str) -> String {
    text.replace("\\t", " ").replace('\t', " ")
}

/// A hyphen survives only when it joins two alphanumerics (`Python-разработчик`,
/// `1-2`); list markers such as ` - item` turn into spaces.
fn replace_bare_hyphens(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c != '-' {
                return c;
            }
            let joins_words = i > 0
                && chars[i - 1].is_alphanumeric()
                && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
            if joins_words {
                '-'
            } else {
                ' '
            }
        })
        .collect()
}
