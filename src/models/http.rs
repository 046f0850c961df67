//! HTTP-backed collaborators.
//!
//! `HttpEncoder` speaks the text-embeddings-inference `/embed` shape.
//! `HttpStanceModel` posts `{"text": ...}` to a classifier endpoint and
//! accepts either raw logits or a list of `{label, score}` probabilities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SentenceEncoder, StanceModel};
use crate::bias::BiasLabel;
use crate::error::{BiasError, Result};

const USER_AGENT: &str = "news-bias-analyzer/0.1";

fn build_http(resource: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .map_err(|e| BiasError::startup(resource, e))
}

async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet: String = text.chars().take(200).collect();
    format!("status {status}: {snippet}")
}

pub struct HttpEncoder {
    http: reqwest::Client,
    url: String,
}

impl HttpEncoder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http("encoder", timeout)?,
            url: url.into(),
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

#[async_trait]
impl SentenceEncoder for HttpEncoder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .http
            .post(&self.url)
            .json(&EmbedRequest {
                inputs: texts,
                truncate: true,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("embedding endpoint error ({})", error_body(resp).await);
        }

        let vectors: Vec<Vec<f32>> = resp.json().await?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "embedding endpoint returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }

    fn name(&self) -> &'static str {
        "http-encoder"
    }
}

pub struct HttpStanceModel {
    http: reqwest::Client,
    url: String,
}

impl HttpStanceModel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_http("stance classifier", timeout)?,
            url: url.into(),
        })
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PredictResponse {
    Logits { logits: Vec<f64> },
    Scores(Vec<LabelScore>),
    Batched(Vec<Vec<LabelScore>>),
}

/// Floor applied before taking logs of returned probabilities.
const MIN_PROB: f64 = 1e-12;

impl PredictResponse {
    /// Normalize either response shape to logits. Probabilities become
    /// log-probabilities, which softmax maps back to the same distribution.
    pub(crate) fn into_logits(self) -> anyhow::Result<[f64; 3]> {
        let scores = match self {
            PredictResponse::Logits { logits } => {
                return match logits.as_slice() {
                    [l, c, r] => Ok([*l, *c, *r]),
                    other => anyhow::bail!("expected 3 logits, got {}", other.len()),
                };
            }
            PredictResponse::Scores(s) => s,
            PredictResponse::Batched(mut b) => {
                if b.len() != 1 {
                    anyhow::bail!("expected a single prediction, got {}", b.len());
                }
                b.remove(0)
            }
        };

        let mut probs: [Option<f64>; 3] = [None; 3];
        for s in scores {
            let label = BiasLabel::parse(&s.label)
                .ok_or_else(|| anyhow::anyhow!("unknown stance label '{}'", s.label))?;
            probs[label.index()] = Some(s.score);
        }

        let mut out = [0.0; 3];
        for label in BiasLabel::ALL {
            let p = probs[label.index()]
                .ok_or_else(|| anyhow::anyhow!("missing score for '{label}'"))?;
            out[label.index()] = p.max(MIN_PROB).ln();
        }
        Ok(out)
    }
}

#[async_trait]
impl StanceModel for HttpStanceModel {
    async fn logits(&self, text: &str) -> anyhow::Result<[f64; 3]> {
        let resp = self
            .http
            .post(&self.url)
            .json(&PredictRequest { text })
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("stance endpoint error ({})", error_body(resp).await);
        }

        let body: PredictResponse = resp.json().await?;
        body.into_logits()
    }

    fn name(&self) -> &'static str {
        "http-stance"
    }
}
