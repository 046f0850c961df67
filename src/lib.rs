// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod bias;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod source_priors;
pub mod text;

// Model seams and the two wrappers around them
pub mod claim_gate;
pub mod models;
pub mod stance;

// Fusion + orchestration
pub mod analysis;
pub mod fusion;
pub mod resources;

// HTTP surface
pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::analysis::{AnalysisResult, ArticleInput, BiasAnalyzer};
pub use crate::api::router;
pub use crate::bias::{BiasDistribution, BiasLabel, SentenceLabel};
pub use crate::error::{BiasError, Result};
pub use crate::resources::{Resources, SharedResources};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "news_bias_analyzer=info,warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches from
/// compact lines to JSON. Calling twice is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
