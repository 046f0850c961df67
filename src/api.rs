use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analysis::{AnalysisResult, ArticleInput, BiasAnalyzer};
use crate::config::FusionOverrides;
use crate::error::{BiasError, ErrorKind};
use crate::source_priors::SourceMatch;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<BiasAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<BiasAnalyzer>) -> Self {
        Self { analyzer }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/debug/source-prior", get(debug_source_prior))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Convenience for callers holding only the analyzer.
pub fn router(analyzer: Arc<BiasAnalyzer>) -> Router {
    create_router(AppState::new(analyzer))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for BiasError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::EmptyArticle | ErrorKind::InvalidConfiguration => StatusCode::BAD_REQUEST,
            ErrorKind::NoSourceMatch => StatusCode::NOT_FOUND,
            ErrorKind::InferenceFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::StartupResource => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Article fields and fusion overrides share one flat JSON object.
#[derive(Deserialize)]
struct AnalyzeReq {
    #[serde(flatten)]
    article: ArticleInput,
    #[serde(flatten)]
    overrides: FusionOverrides,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<AnalysisResult>, BiasError> {
    let out = state.analyzer.analyze(&body.article, &body.overrides).await?;
    Ok(Json(out))
}

#[derive(Deserialize)]
struct SourceQuery {
    #[serde(default)]
    source: String,
}

#[derive(Serialize)]
struct SourcePriorOut {
    query: String,
    cutoff: u8,
    #[serde(flatten)]
    matched: SourceMatch,
}

async fn debug_source_prior(
    State(state): State<AppState>,
    Query(q): Query<SourceQuery>,
) -> Result<Json<SourcePriorOut>, BiasError> {
    let cutoff = state.analyzer.settings().match_cutoff;
    let matched = state.analyzer.sources().resolve(&q.source, cutoff)?;
    Ok(Json(SourcePriorOut {
        query: q.source,
        cutoff,
        matched,
    }))
}
