use axum::{routing::get, Router};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{BiasError, Result};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register the analysis counters.
    ///
    /// Fails if a recorder is already installed in this process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| BiasError::startup("metrics", e))?;

        describe_counter!("bias_analyses_total", "Articles analysed");
        describe_counter!(
            "bias_source_match_miss_total",
            "Articles whose source fell back to priors"
        );
        describe_counter!(
            "bias_inference_failures_total",
            "Inference units that failed or timed out, by unit"
        );
        describe_counter!("bias_sentences_total", "Sentences scored after filtering");
        describe_counter!("bias_claim_sentences_total", "Sentences flagged as claims");

        // Emit zeroes so the series exist before the first request.
        counter!("bias_analyses_total").absolute(0);
        counter!("bias_source_match_miss_total").absolute(0);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
