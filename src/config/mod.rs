//! Process configuration loaded once at startup.
//!
//! Source: TOML at `$BIAS_CONFIG_PATH` (default `config/bias.toml`), then a
//! handful of env overrides for paths and endpoints. Every section has
//! defaults, so an absent section is fine; an unreadable or malformed file
//! is a startup error.

pub mod fusion;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{BiasError, Result};
use crate::source_priors::DEFAULT_MATCH_CUTOFF;
pub use fusion::{
    FusionOverrides, FusionParams, FusionThresholds, FusionWeights, DEFAULT_PRIORS,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/bias.toml";
pub const ENV_CONFIG_PATH: &str = "BIAS_CONFIG_PATH";

pub const ENV_SOURCE_PRIORS_PATH: &str = "SOURCE_PRIORS_PATH";
pub const ENV_CLAIM_DETECTOR_PATH: &str = "CLAIM_DETECTOR_PATH";
pub const ENV_ENCODER_URL: &str = "ENCODER_URL";
pub const ENV_STANCE_URL: &str = "STANCE_URL";
pub const ENV_STANCE_CHECKPOINT_PATH: &str = "STANCE_CHECKPOINT_PATH";
pub const ENV_MATCH_CUTOFF: &str = "MATCH_CUTOFF";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resources: ResourcesConfig,
    pub encoder: EncoderConfig,
    pub stance: StanceConfig,
    pub analysis: AnalysisConfig,
    pub fusion: FusionParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// CSV with `source,P(left|source),P(center|source),P(right|source)`.
    pub source_priors_path: PathBuf,
    /// One-class SVM checkpoint (JSON).
    pub claim_detector_path: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            source_priors_path: PathBuf::from("data/source_priors.csv"),
            claim_detector_path: PathBuf::from("models/claim_detector.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// text-embeddings-inference style `/embed` endpoint.
    pub url: String,
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8081/embed".to_string(),
            timeout_ms: 10_000,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StanceBackend {
    /// Fine-tuned classifier behind an HTTP endpoint.
    #[default]
    Remote,
    /// Linear head over encoder embeddings, loaded from a local checkpoint.
    Linear,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StanceConfig {
    pub backend: StanceBackend,
    pub url: String,
    pub checkpoint_path: Option<PathBuf>,
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for StanceConfig {
    fn default() -> Self {
        Self {
            backend: StanceBackend::Remote,
            url: "http://127.0.0.1:8082/predict".to_string(),
            checkpoint_path: None,
            timeout_ms: 10_000,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Budget for each independent inference unit (article, gate, one sentence).
    pub inference_timeout_ms: u64,
    /// Fuzzy source-match cutoff on the 0–100 scale.
    pub match_cutoff: u8,
    /// Drop short/link/boilerplate sentences before scoring.
    pub filter_boilerplate: bool,
    pub min_sentence_chars: usize,
    /// Call every remote collaborator once during startup.
    pub probe_on_startup: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inference_timeout_ms: 15_000,
            match_cutoff: DEFAULT_MATCH_CUTOFF,
            filter_boilerplate: true,
            min_sentence_chars: 30,
            probe_on_startup: true,
        }
    }
}

impl AppConfig {
    /// Resolve the path from `BIAS_CONFIG_PATH` and load.
    ///
    /// An explicitly configured path must exist; the default path may be
    /// absent, in which case built-in defaults apply.
    pub fn load() -> Result<Self> {
        let (path, explicit) = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut cfg = if path.exists() || explicit {
            Self::load_from_file(&path)?
        } else {
            info!(path = %path.display(), "config file absent; using built-in defaults");
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            BiasError::startup("config", format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BiasError::startup("config", e))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(p) = std::env::var(ENV_SOURCE_PRIORS_PATH) {
            self.resources.source_priors_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(ENV_CLAIM_DETECTOR_PATH) {
            self.resources.claim_detector_path = PathBuf::from(p);
        }
        if let Ok(u) = std::env::var(ENV_ENCODER_URL) {
            self.encoder.url = u;
        }
        if let Ok(u) = std::env::var(ENV_STANCE_URL) {
            self.stance.url = u;
        }
        if let Ok(p) = std::env::var(ENV_STANCE_CHECKPOINT_PATH) {
            self.stance.checkpoint_path = Some(PathBuf::from(p));
        }
        if let Ok(raw) = std::env::var(ENV_MATCH_CUTOFF) {
            self.analysis.match_cutoff = raw.trim().parse::<u8>().map_err(|_| {
                BiasError::config(format!("{ENV_MATCH_CUTOFF} must be an integer 0-100"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        if self.analysis.match_cutoff > 100 {
            return Err(BiasError::config("analysis.match_cutoff must be <= 100"));
        }
        if self.encoder.max_concurrency == 0 || self.stance.max_concurrency == 0 {
            return Err(BiasError::config("max_concurrency must be at least 1"));
        }
        if self.stance.backend == StanceBackend::Linear && self.stance.checkpoint_path.is_none() {
            return Err(BiasError::config(
                "stance.backend = \"linear\" requires stance.checkpoint_path",
            ));
        }
        Ok(())
    }
}
