//! Article text helpers: sentence splitting, boilerplate filtering, and
//! deriving a publisher name from an article URL.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://").expect("url regex"));

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bsubscribe\b|\bread more\b|\bclick here\b").expect("boilerplate regex")
});

/// Tokens that end in a period without ending a sentence (compared lowercase,
/// without the final period).
static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "etc", "inc", "ltd", "co",
        "corp", "dept", "gov", "sen", "rep", "pres", "gen", "col", "lt", "sgt", "capt", "adm",
        "rev", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
        "dec", "no", "fig", "approx", "est", "u.s", "u.k", "u.n", "e.g", "i.e", "a.m", "p.m",
        "d.c",
    ]
    .into_iter()
    .collect()
});

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

fn starts_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘' | '«')
}

/// `true` if the text right before a period ends in a known abbreviation or
/// a single-letter initial.
fn ends_with_abbreviation(before: &str) -> bool {
    let last = before
        .split_whitespace()
        .last()
        .unwrap_or("")
        .trim_start_matches(['"', '\'', '(', '[', '“', '‘']);
    let lower = last.to_lowercase();
    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_alphabetic();
    }
    ABBREVIATIONS.contains(lower.as_str())
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let t = s.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}

fn split_block(block: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = block.char_indices().collect();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminal(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && is_terminal(chars[j].1) {
            j += 1;
        }
        while j < chars.len() && is_closer(chars[j].1) {
            j += 1;
        }

        if j < chars.len() && chars[j].1.is_whitespace() {
            let mut k = j;
            while k < chars.len() && chars[k].1.is_whitespace() {
                k += 1;
            }
            let abbreviated = c == '.' && j == i + 1 && ends_with_abbreviation(&block[start..pos]);
            if k < chars.len() && starts_sentence(chars[k].1) && !abbreviated {
                push_trimmed(out, &block[start..chars[j].0]);
                start = chars[k].0;
                i = k;
                continue;
            }
        }
        i = j;
    }

    if start < block.len() {
        push_trimmed(out, &block[start..]);
    }
}

/// Split article text into sentences, preserving order.
///
/// Line breaks always end a sentence; `.`, `!` and `?` end one when followed
/// by whitespace and a capital, digit or opening quote, unless the period
/// closes an abbreviation or an initial.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for block in text.split(['\n', '\r']) {
        split_block(block, &mut out);
    }
    out
}

/// `false` for fragments not worth scoring: too short, containing a link,
/// or newsletter/navigation boilerplate.
pub fn is_substantive(sentence: &str, min_chars: usize) -> bool {
    let s = sentence.trim();
    s.chars().count() >= min_chars && !URL_RE.is_match(s) && !BOILERPLATE_RE.is_match(s)
}

/// Split and (optionally) filter in one pass.
pub fn prepare_sentences(text: &str, filter_boilerplate: bool, min_chars: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if !filter_boilerplate {
        return sentences;
    }
    sentences
        .into_iter()
        .filter(|s| is_substantive(s, min_chars))
        .collect()
}

/// Sentence fingerprint for log fields: the first six bytes of its SHA-256,
/// rendered as hex. Logs carry this instead of article text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LogId([u8; 6]);

impl LogId {
    pub(crate) fn of(text: &str) -> Self {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(text.as_bytes());
        let mut id = [0u8; 6];
        id.copy_from_slice(&digest[..6]);
        LogId(id)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

/// Publisher name from an article URL: host without `www.`, then the label
/// before the last two when the host has more than two labels, otherwise
/// the first label (`foxnews.com` → `foxnews`, `edition.cnn.com` → `edition`).
pub fn source_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
    let base = if parts.len() > 2 {
        parts[parts.len() - 3]
    } else {
        parts.first().copied()?
    };
    Some(base.to_string())
}
