//! Model collaborators: the seams between the bias engine and whatever
//! actually runs inference.
//!
//! - [`SentenceEncoder`]: texts → embeddings (remote, async).
//! - [`NoveltyDetector`]: embedding → raw one-class decision score (local, sync).
//! - [`StanceModel`]: text → logits over `[left, center, right]` (async).
//!
//! Implementations return `anyhow::Result`; the `ClaimGate` and
//! `StanceClassifier` wrappers turn failures into typed inference errors.

pub mod http;
pub mod linear;
pub mod svm;

use async_trait::async_trait;
use std::sync::Arc;

pub use http::{HttpEncoder, HttpStanceModel};
pub use linear::LinearStanceHead;
pub use svm::{Kernel, OneClassSvm};

#[async_trait]
pub trait SentenceEncoder: Send + Sync {
    /// One embedding per input, in input order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    /// Name for diagnostics/logs.
    fn name(&self) -> &'static str;
}

pub trait NoveltyDetector: Send + Sync {
    /// Signed distance-like score; positive means "inlier" (a claim).
    fn decision_function(&self, embedding: &[f32]) -> anyhow::Result<f64>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait StanceModel: Send + Sync {
    /// Unnormalized scores ordered `[left, center, right]`.
    async fn logits(&self, text: &str) -> anyhow::Result<[f64; 3]>;
    fn name(&self) -> &'static str;
}

pub type DynEncoder = Arc<dyn SentenceEncoder>;
pub type DynDetector = Arc<dyn NoveltyDetector>;
pub type DynStanceModel = Arc<dyn StanceModel>;
