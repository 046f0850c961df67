//! # Claim Gate
//! Decides which sentences are claims worth stance-scoring on their own.
//!
//! Sentences are embedded in one batch, each embedding goes through the
//! one-class novelty detector, and the raw decision score is squashed with
//! the logistic function into an estimated claim probability.
//! `is_claim = probability >= threshold`.

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{BiasError, Result};
use crate::models::{DynDetector, DynEncoder};
use crate::text::LogId;

/// Gate output for one sentence, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatedSentence {
    pub text: String,
    pub is_claim: bool,
    /// Logistic of the detector's decision score.
    pub probability: f64,
}

/// Numerically stable logistic function.
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub struct ClaimGate {
    encoder: DynEncoder,
    detector: DynDetector,
    /// Bounds concurrent encoder calls; one permit serializes them.
    permits: Semaphore,
}

impl ClaimGate {
    pub fn new(encoder: DynEncoder, detector: DynDetector, max_concurrency: usize) -> Self {
        Self {
            encoder,
            detector,
            permits: Semaphore::new(max_concurrency.max(1)),
        }
    }

    pub async fn classify(&self, sentences: &[String], threshold: f64) -> Result<Vec<GatedSentence>> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(BiasError::config(format!(
                "claim threshold must lie in [0, 1] (got {threshold})"
            )));
        }
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| BiasError::inference("claim gate", e))?;
            self.encoder
                .embed(sentences)
                .await
                .map_err(|e| BiasError::inference("claim gate", format!("{}: {e:#}", self.encoder.name())))?
        };

        if embeddings.len() != sentences.len() {
            return Err(BiasError::inference(
                "claim gate",
                format!(
                    "encoder returned {} embeddings for {} sentences",
                    embeddings.len(),
                    sentences.len()
                ),
            ));
        }

        let mut out = Vec::with_capacity(sentences.len());
        for (i, (text, emb)) in sentences.iter().zip(&embeddings).enumerate() {
            let score = self.detector.decision_function(emb).map_err(|e| {
                BiasError::inference(
                    "claim gate",
                    format!("{} on sentence {i}: {e:#}", self.detector.name()),
                )
            })?;
            let probability = logistic(score);
            let is_claim = probability >= threshold;
            debug!(
                sentence = i,
                id = %LogId::of(text),
                score,
                probability,
                is_claim,
                "claim gate"
            );
            out.push(GatedSentence {
                text: text.clone(),
                is_claim,
                probability,
            });
        }
        Ok(out)
    }
}
