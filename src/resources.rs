//! Startup resources: the source-prior table, the claim detector, and the
//! model collaborators, bundled into one explicitly passed handle.
//!
//! Everything here is loaded once. Any failure is a `StartupResource` error
//! and the service refuses to start; requests never lazily load.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::analysis::{AnalysisSettings, BiasAnalyzer};
use crate::claim_gate::ClaimGate;
use crate::config::{AppConfig, StanceBackend};
use crate::error::{BiasError, Result};
use crate::models::{
    DynDetector, DynEncoder, DynStanceModel, HttpEncoder, HttpStanceModel, LinearStanceHead,
    OneClassSvm,
};
use crate::source_priors::SourcePriorTable;
use crate::stance::StanceClassifier;

const PROBE_SENTENCE: &str = "The senate passed the budget bill on Tuesday.";

pub struct Resources {
    pub sources: Arc<SourcePriorTable>,
    pub gate: Arc<ClaimGate>,
    pub stance: Arc<StanceClassifier>,
    pub settings: AnalysisSettings,
}

impl Resources {
    /// Load every resource named in `cfg`, optionally probing remote models.
    pub async fn load(cfg: &AppConfig) -> Result<Self> {
        let sources = SourcePriorTable::load_from_file(&cfg.resources.source_priors_path)?;

        let svm = OneClassSvm::load_from_file(&cfg.resources.claim_detector_path)?;
        let detector_dim = svm.dimension();
        let detector: DynDetector = Arc::new(svm);

        let encoder: DynEncoder = Arc::new(HttpEncoder::new(
            cfg.encoder.url.clone(),
            Duration::from_millis(cfg.encoder.timeout_ms),
        )?);

        let stance_model: DynStanceModel = match cfg.stance.backend {
            StanceBackend::Remote => Arc::new(HttpStanceModel::new(
                cfg.stance.url.clone(),
                Duration::from_millis(cfg.stance.timeout_ms),
            )?),
            StanceBackend::Linear => {
                let path = cfg.stance.checkpoint_path.as_ref().ok_or_else(|| {
                    BiasError::startup("stance classifier", "linear backend needs checkpoint_path")
                })?;
                Arc::new(LinearStanceHead::load_from_file(path, Arc::clone(&encoder))?)
            }
        };

        if cfg.analysis.probe_on_startup {
            probe(&encoder, detector_dim, &stance_model).await?;
        }

        info!(
            sources = sources.len(),
            encoder = %cfg.encoder.url,
            stance = stance_model.name(),
            "resources loaded"
        );

        Ok(Self::from_parts(
            sources,
            encoder,
            detector,
            stance_model,
            cfg,
        ))
    }

    /// Assemble from already-built collaborators.
    pub fn from_parts(
        sources: SourcePriorTable,
        encoder: DynEncoder,
        detector: DynDetector,
        stance_model: DynStanceModel,
        cfg: &AppConfig,
    ) -> Self {
        Self {
            sources: Arc::new(sources),
            gate: Arc::new(ClaimGate::new(
                encoder,
                detector,
                cfg.encoder.max_concurrency,
            )),
            stance: Arc::new(StanceClassifier::new(
                stance_model,
                cfg.stance.max_concurrency,
            )),
            settings: AnalysisSettings::from(cfg),
        }
    }

    pub fn analyzer(&self) -> BiasAnalyzer {
        BiasAnalyzer::new(
            Arc::clone(&self.sources),
            Arc::clone(&self.gate),
            Arc::clone(&self.stance),
            self.settings.clone(),
        )
    }
}

/// One call per collaborator so a dead endpoint fails startup, not the first request.
async fn probe(encoder: &DynEncoder, detector_dim: usize, stance: &DynStanceModel) -> Result<()> {
    let input = vec![PROBE_SENTENCE.to_string()];
    let emb = encoder
        .embed(&input)
        .await
        .map_err(|e| BiasError::startup("encoder", format!("probe failed: {e:#}")))?;
    let got = emb.first().map(Vec::len).unwrap_or(0);
    if got != detector_dim {
        return Err(BiasError::startup(
            "claim detector",
            format!("encoder yields {got}-dim embeddings, detector expects {detector_dim}"),
        ));
    }

    stance
        .logits(PROBE_SENTENCE)
        .await
        .map_err(|e| BiasError::startup("stance classifier", format!("probe failed: {e:#}")))?;
    info!("model probe ok");
    Ok(())
}

/// Process-wide single-flight initialization. Concurrent first callers
/// await the same load; a failed load is not cached and may be retried.
pub struct SharedResources {
    cell: OnceCell<Arc<Resources>>,
}

impl Default for SharedResources {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedResources {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub async fn get_or_load(&self, cfg: &AppConfig) -> Result<Arc<Resources>> {
        self.cell
            .get_or_try_init(|| async {
                Resources::load(cfg).await.map(Arc::new).inspect_err(|e| {
                    warn!(error = %e, "resource load failed");
                })
            })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<Resources>> {
        self.cell.get().cloned()
    }
}
