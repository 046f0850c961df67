//! News Bias Service: binary entrypoint
//! Loads configuration and startup resources, then serves the Axum router.
//!
//! See `README.md` for the request/response shapes.

use std::sync::Arc;

use news_bias_analyzer::config::AppConfig;
use news_bias_analyzer::metrics::Metrics;
use news_bias_analyzer::{init_tracing, router, SharedResources};
use shuttle_axum::ShuttleAxum;
use tracing::{error, info};

static RESOURCES: SharedResources = SharedResources::new();

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load().map_err(|e| {
        error!(error = %e, "configuration rejected");
        anyhow::anyhow!(e)
    })?;

    // Everything is loaded before the first request; failure aborts startup.
    let resources = RESOURCES.get_or_load(&cfg).await.map_err(|e| {
        error!(error = %e, "startup resources unavailable");
        anyhow::anyhow!(e)
    })?;

    let metrics = Metrics::init().map_err(|e| anyhow::anyhow!(e))?;

    let app = router(Arc::new(resources.analyzer())).merge(metrics.router());
    info!("news bias service ready");

    Ok(app.into())
}
