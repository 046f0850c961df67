//! # Stance Classifier
//! Wraps a [`StanceModel`](crate::models::StanceModel) into a calibrated
//! prediction: softmax distribution plus a thresholded label.
//!
//! Label policy: argmax of the distribution (ties left, center, right),
//! forced to `center` when the winner's probability is below its per-label
//! threshold. The distribution itself is never altered.

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::bias::{BiasDistribution, BiasLabel};
use crate::config::FusionThresholds;
use crate::error::{BiasError, Result};
use crate::models::DynStanceModel;

const UNIT: &str = "stance classifier";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StancePrediction {
    pub distribution: BiasDistribution,
    pub label: BiasLabel,
}

/// Stable softmax over `[left, center, right]` logits.
pub fn softmax(logits: [f64; 3]) -> Option<BiasDistribution> {
    if logits.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.map(|x| (x - max).exp());
    let total: f64 = exps.iter().sum();
    Some(BiasDistribution::from_array(exps.map(|e| e / total)))
}

/// Argmax, overridden to `center` below the winner's confidence floor.
pub fn thresholded_label(dist: &BiasDistribution, thresholds: &FusionThresholds) -> BiasLabel {
    let winner = dist.argmax();
    if dist[winner] >= thresholds.for_label(winner) {
        winner
    } else {
        BiasLabel::Center
    }
}

pub struct StanceClassifier {
    model: DynStanceModel,
    /// Bounds concurrent model calls; one permit serializes them.
    permits: Semaphore,
}

impl StanceClassifier {
    pub fn new(model: DynStanceModel, max_concurrency: usize) -> Self {
        Self {
            model,
            permits: Semaphore::new(max_concurrency.max(1)),
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub async fn predict(&self, text: &str, thresholds: &FusionThresholds) -> Result<StancePrediction> {
        // Nothing to read: uninformative answer instead of a model call.
        if text.trim().is_empty() {
            let distribution = BiasDistribution::uniform();
            return Ok(StancePrediction {
                distribution,
                label: thresholded_label(&distribution, thresholds),
            });
        }

        let logits = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| BiasError::inference(UNIT, e))?;
            self.model
                .logits(text)
                .await
                .map_err(|e| BiasError::inference(UNIT, format!("{}: {e:#}", self.model.name())))?
        };

        let distribution = softmax(logits)
            .ok_or_else(|| BiasError::inference(UNIT, format!("non-finite logits {logits:?}")))?;
        Ok(StancePrediction {
            distribution,
            label: thresholded_label(&distribution, thresholds),
        })
    }
}
