//! One-class SVM novelty detector evaluated from an exported checkpoint.
//!
//! Checkpoint (JSON):
//! ```json
//! {
//!   "kernel": "rbf",
//!   "gamma": 0.01,
//!   "coef0": 0.0,
//!   "degree": 3,
//!   "support_vectors": [[...], [...]],
//!   "dual_coef": [0.5, 0.5],
//!   "intercept": -0.3
//! }
//! ```
//! decision(x) = Σ dual_coef[i] · K(sv[i], x) + intercept

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::NoveltyDetector;
use crate::error::{BiasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Rbf,
    Linear,
    Poly,
    Sigmoid,
}

fn default_degree() -> i32 {
    3
}

#[derive(Debug, Deserialize)]
struct Checkpoint {
    kernel: Kernel,
    #[serde(default)]
    gamma: f64,
    #[serde(default)]
    coef0: f64,
    #[serde(default = "default_degree")]
    degree: i32,
    support_vectors: Vec<Vec<f32>>,
    dual_coef: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone)]
pub struct OneClassSvm {
    kernel: Kernel,
    gamma: f64,
    coef0: f64,
    degree: i32,
    support_vectors: Vec<Vec<f32>>,
    dual_coef: Vec<f64>,
    intercept: f64,
    dim: usize,
}

impl OneClassSvm {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            BiasError::startup("claim detector", format!("reading {}: {e}", path.display()))
        })?;
        let svm = Self::from_json_str(&data)?;
        info!(
            path = %path.display(),
            kernel = ?svm.kernel,
            support_vectors = svm.support_vectors.len(),
            dim = svm.dim,
            "claim detector loaded"
        );
        Ok(svm)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let ck: Checkpoint =
            serde_json::from_str(s).map_err(|e| BiasError::startup("claim detector", e))?;
        Self::from_checkpoint(ck)
    }

    fn from_checkpoint(ck: Checkpoint) -> Result<Self> {
        let bad = |msg: String| BiasError::startup("claim detector", msg);

        let dim = ck
            .support_vectors
            .first()
            .map(Vec::len)
            .ok_or_else(|| bad("checkpoint has no support vectors".into()))?;
        if dim == 0 {
            return Err(bad("support vectors are empty".into()));
        }
        if let Some(i) = ck.support_vectors.iter().position(|v| v.len() != dim) {
            return Err(bad(format!("support vector {i} has a different dimension")));
        }
        if ck.dual_coef.len() != ck.support_vectors.len() {
            return Err(bad(format!(
                "{} dual coefficients for {} support vectors",
                ck.dual_coef.len(),
                ck.support_vectors.len()
            )));
        }
        if ck.kernel != Kernel::Linear && !(ck.gamma.is_finite() && ck.gamma > 0.0) {
            return Err(bad(format!("gamma must be > 0 for {:?} kernel", ck.kernel)));
        }
        if !ck.intercept.is_finite() || ck.dual_coef.iter().any(|c| !c.is_finite()) {
            return Err(bad("non-finite coefficients".into()));
        }

        Ok(Self {
            kernel: ck.kernel,
            gamma: ck.gamma,
            coef0: ck.coef0,
            degree: ck.degree,
            support_vectors: ck.support_vectors,
            dual_coef: ck.dual_coef,
            intercept: ck.intercept,
            dim,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    fn kernel_eval(&self, sv: &[f32], x: &[f32]) -> f64 {
        match self.kernel {
            Kernel::Rbf => {
                let sq: f64 = sv
                    .iter()
                    .zip(x)
                    .map(|(a, b)| {
                        let d = f64::from(*a) - f64::from(*b);
                        d * d
                    })
                    .sum();
                (-self.gamma * sq).exp()
            }
            Kernel::Linear => dot(sv, x),
            Kernel::Poly => (self.gamma * dot(sv, x) + self.coef0).powi(self.degree),
            Kernel::Sigmoid => (self.gamma * dot(sv, x) + self.coef0).tanh(),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

impl NoveltyDetector for OneClassSvm {
    fn decision_function(&self, embedding: &[f32]) -> anyhow::Result<f64> {
        if embedding.len() != self.dim {
            anyhow::bail!(
                "embedding has {} dimensions, detector expects {}",
                embedding.len(),
                self.dim
            );
        }
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, a)| a * self.kernel_eval(sv, embedding))
            .sum();
        Ok(sum + self.intercept)
    }

    fn name(&self) -> &'static str {
        "one-class-svm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RBF: &str = r#"{
        "kernel": "rbf",
        "gamma": 0.5,
        "support_vectors": [[1.0, 0.0], [0.0, 1.0]],
        "dual_coef": [0.5, 0.5],
        "intercept": -0.3
    }"#;

    #[test]
    fn rbf_decision_matches_hand_computation() {
        let svm = OneClassSvm::from_json_str(RBF).unwrap();
        assert_eq!(svm.dimension(), 2);
        // x = sv[0]: K = 1 and exp(-0.5 * 2)
        let expected = 0.5 * 1.0 + 0.5 * (-1.0f64).exp() - 0.3;
        let got = svm.decision_function(&[1.0, 0.0]).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn far_points_fall_below_zero() {
        let svm = OneClassSvm::from_json_str(RBF).unwrap();
        assert!(svm.decision_function(&[10.0, 10.0]).unwrap() < 0.0);
    }

    #[test]
    fn linear_kernel_is_dot_product() {
        let svm = OneClassSvm::from_json_str(
            r#"{"kernel":"linear","support_vectors":[[1.0,2.0]],"dual_coef":[2.0],"intercept":1.0}"#,
        )
        .unwrap();
        let got = svm.decision_function(&[3.0, 4.0]).unwrap();
        assert!((got - (2.0 * 11.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn dimension_mismatch_is_inference_error() {
        let svm = OneClassSvm::from_json_str(RBF).unwrap();
        assert!(svm.decision_function(&[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn inconsistent_checkpoints_fail_to_load() {
        let ragged = r#"{"kernel":"rbf","gamma":1.0,"support_vectors":[[1.0],[1.0,2.0]],"dual_coef":[1.0,1.0],"intercept":0.0}"#;
        assert!(OneClassSvm::from_json_str(ragged).is_err());

        let coef_count = r#"{"kernel":"rbf","gamma":1.0,"support_vectors":[[1.0]],"dual_coef":[1.0,1.0],"intercept":0.0}"#;
        assert!(OneClassSvm::from_json_str(coef_count).is_err());

        let no_gamma = r#"{"kernel":"rbf","support_vectors":[[1.0]],"dual_coef":[1.0],"intercept":0.0}"#;
        assert!(OneClassSvm::from_json_str(no_gamma).is_err());

        assert!(matches!(
            OneClassSvm::from_json_str("{}"),
            Err(BiasError::StartupResource { .. })
        ));
    }
}
