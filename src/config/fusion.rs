//! Fusion weights, confidence thresholds and the default priors.
//!
//! `[fusion]` in `config/bias.toml` sets the process defaults; requests may
//! override any subset through `FusionOverrides`. The merged `FusionParams`
//! is validated once, before any inference runs.

use serde::{Deserialize, Serialize};

use crate::bias::{BiasDistribution, BiasLabel};
use crate::error::{BiasError, Result};

/// Background distribution used before article evidence, and as the
/// fallback for unmatched sources, failed inference and non-claim sentences.
pub const DEFAULT_PRIORS: BiasDistribution = BiasDistribution::new(0.25, 0.50, 0.25);

/// Per-signal weights. Zero means the signal is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub prior: f64,
    pub source: f64,
    pub article: f64,
    pub sentence: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            prior: 2.5,
            source: 3.0,
            article: 2.0,
            sentence: 0.10,
        }
    }
}

impl FusionWeights {
    /// Rejects negative or non-finite weights. Never clamps.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("prior", self.prior),
            ("source", self.source),
            ("article", self.article),
            ("sentence", self.sentence),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(BiasError::config(format!(
                    "weight '{name}' must be a finite value >= 0 (got {w})"
                )));
            }
        }
        Ok(())
    }
}

/// Confidence floors: `claim` gates sentences, the per-label values gate
/// the stance classifier's argmax.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionThresholds {
    pub claim: f64,
    pub left: f64,
    pub center: f64,
    pub right: f64,
}

impl Default for FusionThresholds {
    fn default() -> Self {
        Self {
            claim: 0.5,
            left: 0.90,
            center: 0.5,
            right: 0.5,
        }
    }
}

impl FusionThresholds {
    pub fn for_label(&self, label: BiasLabel) -> f64 {
        match label {
            BiasLabel::Left => self.left,
            BiasLabel::Center => self.center,
            BiasLabel::Right => self.right,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, t) in [
            ("claim", self.claim),
            ("left", self.left),
            ("center", self.center),
            ("right", self.right),
        ] {
            if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                return Err(BiasError::config(format!(
                    "threshold '{name}' must lie in [0, 1] (got {t})"
                )));
            }
        }
        Ok(())
    }
}

/// Everything fusion and the classifiers need for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    pub priors: BiasDistribution,
    pub weights: FusionWeights,
    pub thresholds: FusionThresholds,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            priors: DEFAULT_PRIORS,
            weights: FusionWeights::default(),
            thresholds: FusionThresholds::default(),
        }
    }
}

impl FusionParams {
    pub fn validate(&self) -> Result<()> {
        if !self.priors.is_valid() {
            return Err(BiasError::config(format!(
                "priors must be finite probabilities in [0, 1] (got {:?})",
                self.priors
            )));
        }
        self.weights.validate()?;
        self.thresholds.validate()
    }

    /// Layer request overrides on top of these defaults. Does not validate.
    pub fn with_overrides(&self, o: &FusionOverrides) -> Self {
        let mut out = *self;
        if let Some(p) = o.priors {
            out.priors = p;
        }
        if let Some(w) = &o.weights {
            out.weights = FusionWeights {
                prior: w.prior.unwrap_or(out.weights.prior),
                source: w.source.unwrap_or(out.weights.source),
                article: w.article.unwrap_or(out.weights.article),
                sentence: w.sentence.unwrap_or(out.weights.sentence),
            };
        }
        if let Some(t) = &o.thresholds {
            out.thresholds = FusionThresholds {
                claim: t.claim.unwrap_or(out.thresholds.claim),
                left: t.left.unwrap_or(out.thresholds.left),
                center: t.center.unwrap_or(out.thresholds.center),
                right: t.right.unwrap_or(out.thresholds.right),
            };
        }
        out
    }
}

/// Per-request overrides. Absent fields keep the configured value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FusionOverrides {
    #[serde(default)]
    pub priors: Option<BiasDistribution>,
    #[serde(default)]
    pub weights: Option<WeightsOverride>,
    #[serde(default)]
    pub thresholds: Option<ThresholdsOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightsOverride {
    pub prior: Option<f64>,
    pub source: Option<f64>,
    pub article: Option<f64>,
    pub sentence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdsOverride {
    #[serde(alias = "claims")]
    pub claim: Option<f64>,
    pub left: Option<f64>,
    pub center: Option<f64>,
    pub right: Option<f64>,
}
