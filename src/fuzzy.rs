//! Fuzzy name similarity on a 0–100 scale.
//!
//! Names are normalized (lowercase, punctuation and dashes to spaces,
//! whitespace collapsed) and compared three ways: the plain edit ratio,
//! the ratio of alphabetically sorted tokens, and the token-set ratio
//! (shared tokens against shared-plus-remainder). The best of the three
//! is the score, so "The New York Times" and "new york times" score 100.

use std::collections::BTreeSet;

/// Lowercase, map every non-alphanumeric char to a space, collapse spaces.
pub fn normalize(s: &str) -> String {
    let lowered: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized Levenshtein similarity in `[0, 1]`; empty input scores 0.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

fn sorted_tokens(s: &str) -> String {
    let mut toks: Vec<&str> = s.split_whitespace().collect();
    toks.sort_unstable();
    toks.join(" ")
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();

    let shared = ta.intersection(&tb).copied().collect::<Vec<_>>().join(" ");
    let only_a = ta.difference(&tb).copied().collect::<Vec<_>>().join(" ");
    let only_b = tb.difference(&ta).copied().collect::<Vec<_>>().join(" ");

    let joined = |rest: &str| format!("{shared} {rest}").trim().to_string();
    let with_a = joined(&only_a);
    let with_b = joined(&only_b);

    ratio(&shared, &with_a)
        .max(ratio(&shared, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Similarity of two raw names, rounded to an integer in `0..=100`.
pub fn similarity(a: &str, b: &str) -> u8 {
    let (a, b) = (normalize(a), normalize(b));
    similarity_normalized(&a, &b)
}

/// Same as [`similarity`] for inputs already passed through [`normalize`].
pub fn similarity_normalized(a: &str, b: &str) -> u8 {
    let best = ratio(a, b)
        .max(token_sort_ratio(a, b))
        .max(token_set_ratio(a, b));
    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  The Wall—Street  Journal! "), "the wall street journal");
        assert_eq!(normalize("nytimes.com"), "nytimes com");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn identical_names_score_100() {
        assert_eq!(similarity("Reuters", "reuters"), 100);
    }

    #[test]
    fn extra_tokens_do_not_hurt_token_set() {
        assert_eq!(similarity("The New York Times", "New York Times"), 100);
        assert_eq!(similarity("Fox News Channel", "Fox News"), 100);
    }

    #[test]
    fn token_order_is_ignored() {
        assert_eq!(similarity("Times New York", "New York Times"), 100);
    }

    #[test]
    fn small_typos_stay_high() {
        let s = similarity("Breitbart Newz", "Breitbart News");
        assert!(s >= 90, "score was {s}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let s = similarity("totally-unknown-source-xyz", "Fox News");
        assert!(s < 50, "score was {s}");
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(similarity("", "CNN"), 0);
        assert_eq!(similarity("...", "..."), 0);
    }
}
