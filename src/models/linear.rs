//! Linear stance head over sentence embeddings.
//!
//! Checkpoint (JSON): `{"labels": ["left","center","right"], "weights": [[..], [..], [..]], "bias": [b0, b1, b2]}`.
//! `labels` is optional and gives the row order of `weights`/`bias`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::{DynEncoder, StanceModel};
use crate::bias::BiasLabel;
use crate::error::{BiasError, Result};

#[derive(Debug, Deserialize)]
struct Checkpoint {
    #[serde(default)]
    labels: Option<Vec<String>>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f64>,
}

pub struct LinearStanceHead {
    encoder: DynEncoder,
    /// Rows indexed by `BiasLabel::index()`.
    weights: [Vec<f32>; 3],
    bias: [f64; 3],
    dim: usize,
}

impl LinearStanceHead {
    pub fn load_from_file<P: AsRef<Path>>(path: P, encoder: DynEncoder) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            BiasError::startup("stance classifier", format!("reading {}: {e}", path.display()))
        })?;
        let head = Self::from_json_str(&data, encoder)?;
        info!(path = %path.display(), dim = head.dim, "linear stance head loaded");
        Ok(head)
    }

    pub fn from_json_str(s: &str, encoder: DynEncoder) -> Result<Self> {
        let bad = |msg: String| BiasError::startup("stance classifier", msg);
        let ck: Checkpoint = serde_json::from_str(s).map_err(|e| bad(e.to_string()))?;

        if ck.weights.len() != 3 || ck.bias.len() != 3 {
            return Err(bad(format!(
                "expected 3 weight rows and 3 biases, got {} and {}",
                ck.weights.len(),
                ck.bias.len()
            )));
        }
        let dim = ck.weights[0].len();
        if dim == 0 || ck.weights.iter().any(|r| r.len() != dim) {
            return Err(bad("weight rows must be non-empty and equally sized".into()));
        }

        let order: Vec<BiasLabel> = match &ck.labels {
            None => BiasLabel::ALL.to_vec(),
            Some(names) => names
                .iter()
                .map(|n| BiasLabel::parse(n).ok_or_else(|| bad(format!("unknown label '{n}'"))))
                .collect::<Result<_>>()?,
        };
        if order.len() != 3 || BiasLabel::ALL.iter().any(|l| !order.contains(l)) {
            return Err(bad("labels must name left, center and right once each".into()));
        }

        let mut weights: [Vec<f32>; 3] = Default::default();
        let mut bias = [0.0; 3];
        for (row, label) in ck.weights.into_iter().zip(&order) {
            weights[label.index()] = row;
        }
        for (b, label) in ck.bias.into_iter().zip(&order) {
            bias[label.index()] = b;
        }

        Ok(Self {
            encoder,
            weights,
            bias,
            dim,
        })
    }

    fn apply(&self, x: &[f32]) -> anyhow::Result<[f64; 3]> {
        if x.len() != self.dim {
            anyhow::bail!(
                "embedding has {} dimensions, stance head expects {}",
                x.len(),
                self.dim
            );
        }
        let mut out = self.bias;
        for (o, row) in out.iter_mut().zip(&self.weights) {
            *o += row
                .iter()
                .zip(x)
                .map(|(w, v)| f64::from(*w) * f64::from(*v))
                .sum::<f64>();
        }
        Ok(out)
    }
}

#[async_trait]
impl StanceModel for LinearStanceHead {
    async fn logits(&self, text: &str) -> anyhow::Result<[f64; 3]> {
        let mut vectors = self.encoder.embed(&[text.to_string()]).await?;
        let x = vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("encoder returned no embedding"))?;
        self.apply(&x)
    }

    fn name(&self) -> &'static str {
        "linear-stance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SentenceEncoder;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl SentenceEncoder for Echo {
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
        fn name(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn applies_rows_in_declared_label_order() {
        let head = LinearStanceHead::from_json_str(
            r#"{"labels":["right","left","center"],
                "weights":[[1.0,0.0],[0.0,1.0],[0.5,0.5]],
                "bias":[0.0,0.1,0.2]}"#,
            Arc::new(Echo),
        )
        .unwrap();
        // "abcd" → x = [4, 1]
        let l = head.logits("abcd").await.unwrap();
        assert!((l[BiasLabel::Right.index()] - 4.0).abs() < 1e-9);
        assert!((l[BiasLabel::Left.index()] - 1.1).abs() < 1e-9);
        assert!((l[BiasLabel::Center.index()] - 2.7).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_shapes_and_labels() {
        let enc: DynEncoder = Arc::new(Echo);
        assert!(LinearStanceHead::from_json_str(
            r#"{"weights":[[1.0],[1.0]],"bias":[0,0]}"#,
            enc.clone()
        )
        .is_err());
        assert!(LinearStanceHead::from_json_str(
            r#"{"labels":["left","left","right"],"weights":[[1.0],[1.0],[1.0]],"bias":[0,0,0]}"#,
            enc
        )
        .is_err());
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_inference() {
        let head = LinearStanceHead::from_json_str(
            r#"{"weights":[[1.0,0.0,0.0],[0.0,1.0,0.0],[0.0,0.0,1.0]],"bias":[0,0,0]}"#,
            Arc::new(Echo),
        )
        .unwrap();
        assert!(head.logits("x").await.is_err());
    }
}
