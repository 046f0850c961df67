use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BiasError>;

#[derive(Debug, Error)]
pub enum BiasError {
    /// A resource required before the first request could not be loaded.
    #[error("startup resource '{resource}' unavailable: {message}")]
    StartupResource { resource: String, message: String },

    /// Fuzzy lookup found no publisher above the cutoff. Never fatal.
    #[error("no source match for '{query}'")]
    NoSourceMatch { query: String },

    /// One inference unit (article, sentence, claim gate) failed or timed out.
    #[error("inference failed for {unit}: {message}")]
    Inference { unit: String, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("article text is empty")]
    EmptyArticle,
}

/// Caller-facing classification of a `BiasError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StartupResource,
    NoSourceMatch,
    InferenceFailure,
    InvalidConfiguration,
    EmptyArticle,
}

impl BiasError {
    pub fn startup(resource: impl Into<String>, message: impl ToString) -> Self {
        BiasError::StartupResource {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    pub fn inference(unit: impl Into<String>, message: impl ToString) -> Self {
        BiasError::Inference {
            unit: unit.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        BiasError::InvalidConfiguration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BiasError::StartupResource { .. } => ErrorKind::StartupResource,
            BiasError::NoSourceMatch { .. } => ErrorKind::NoSourceMatch,
            BiasError::Inference { .. } => ErrorKind::InferenceFailure,
            BiasError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            BiasError::EmptyArticle => ErrorKind::EmptyArticle,
        }
    }

    /// `true` for kinds the orchestrator records and moves past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BiasError::NoSourceMatch { .. } | BiasError::Inference { .. }
        )
    }
}

/// Non-fatal problem surfaced in the response diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&BiasError> for Issue {
    fn from(e: &BiasError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
