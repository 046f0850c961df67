//! # Belief Fusion
//! Pure, testable combination of the prior, source, article and sentence
//! signals into one posterior. No I/O and no state between calls.
//!
//! For each label ℓ:
//!
//! ```text
//! score[ℓ] = w_prior·ln(prior[ℓ]+1) + w_source·ln(source[ℓ]+1)
//!          + w_article·ln(article[ℓ]+1) + Σ_s w_sentence·ln(sentence_s[ℓ]+1)
//! ```
//!
//! then a max-shifted softmax. The `+1` offset keeps every log argument
//! at least 1 and is part of the calibration; it must not be replaced by a
//! small epsilon. The predicted label is the posterior argmax with ties
//! resolved as left, then center, then right.

use serde::Serialize;

use crate::bias::{BiasDistribution, BiasLabel};
use crate::config::FusionWeights;
use crate::error::{BiasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fusion {
    pub posterior: BiasDistribution,
    pub label: BiasLabel,
    /// Pre-softmax weighted log-scores, kept for auditing.
    pub scores: BiasDistribution,
}

fn check_signal(name: &str, d: &BiasDistribution) -> Result<()> {
    if d.to_array().iter().all(|p| p.is_finite() && *p >= 0.0) {
        Ok(())
    } else {
        Err(BiasError::config(format!(
            "{name} distribution must be finite and non-negative (got {d:?})"
        )))
    }
}

/// Weighted log-scores before normalization.
pub fn log_scores(
    priors: &BiasDistribution,
    source: &BiasDistribution,
    article: &BiasDistribution,
    sentences: &[BiasDistribution],
    w: &FusionWeights,
) -> BiasDistribution {
    let mut scores = BiasDistribution::default();
    for label in BiasLabel::ALL {
        let sentence_term: f64 = sentences
            .iter()
            .map(|s| w.sentence * s[label].ln_1p())
            .sum();
        scores[label] = w.prior * priors[label].ln_1p()
            + w.source * source[label].ln_1p()
            + w.article * article[label].ln_1p()
            + sentence_term;
    }
    scores
}

/// Max-shifted softmax over label scores.
pub fn normalize_scores(scores: &BiasDistribution) -> BiasDistribution {
    let max = BiasLabel::ALL
        .iter()
        .map(|l| scores[*l])
        .fold(f64::NEG_INFINITY, f64::max);
    let exps = scores.to_array().map(|s| (s - max).exp());
    let total: f64 = exps.iter().sum();
    BiasDistribution::from_array(exps.map(|e| e / total))
}

/// Fuse all signals into a posterior and a predicted label.
///
/// Rejects negative/non-finite weights and negative/non-finite signal
/// values as configuration errors; nothing is clamped. Weights large enough
/// to overflow a log-score are rejected the same way.
pub fn fuse(
    priors: &BiasDistribution,
    source: &BiasDistribution,
    article: &BiasDistribution,
    sentences: &[BiasDistribution],
    weights: &FusionWeights,
) -> Result<Fusion> {
    weights.validate()?;
    check_signal("prior", priors)?;
    check_signal("source", source)?;
    check_signal("article", article)?;
    for (i, s) in sentences.iter().enumerate() {
        check_signal(&format!("sentence {i}"), s)?;
    }

    let scores = log_scores(priors, source, article, sentences, weights);
    if !scores.to_array().iter().all(|s| s.is_finite()) {
        return Err(BiasError::config(format!(
            "weighted log-scores overflow (got {scores:?}); reduce the fusion weights"
        )));
    }
    let posterior = normalize_scores(&scores);
    Ok(Fusion {
        posterior,
        label: posterior.argmax(),
        scores,
    })
}
