//! # Analysis orchestrator
//! Runs one article through source lookup, claim gating, stance scoring and
//! belief fusion, and assembles the auditable response.
//!
//! Recovery policy:
//! - unmatched source → priors stand in for the source signal;
//! - article stance failure/timeout → priors stand in for the article signal;
//! - claim gate failure/timeout → every sentence is treated as non-claim;
//! - one claim sentence failing/timing out → that sentence gets the priors
//!   and `not claim`, the rest continue.
//!
//! Each of these is recorded in `diagnostics.issues`. Only invalid fusion
//! parameters and empty articles fail the request.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bias::{BiasDistribution, BiasLabel, SentenceLabel};
use crate::claim_gate::{ClaimGate, GatedSentence};
use crate::config::{AppConfig, FusionOverrides, FusionParams};
use crate::error::{BiasError, Issue, Result};
use crate::fusion;
use crate::source_priors::{SourceMatch, SourcePriorTable};
use crate::stance::{StanceClassifier, StancePrediction};
use crate::text;

/// One article to analyse. Scraping happens upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleInput {
    pub text: String,
    /// Publisher name as scraped; derived from `url` when absent.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Per-sentence audit record, in article order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimSentence {
    pub index: usize,
    pub text: String,
    pub is_claim: bool,
    /// Estimated claim probability from the gate; absent if the gate failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_probability: Option<f64>,
    pub label: SentenceLabel,
    /// Distribution fed to fusion for this sentence.
    pub probs: BiasDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Canonical publisher matched, `None` when no match cleared the cutoff.
    #[serde(rename = "match")]
    pub match_name: Option<String>,
    pub match_score: Option<u8>,
    pub source_matched: bool,
    /// Fraction of sentences flagged as claims (0 when there are none).
    pub per_political: f64,
    pub article_probs: BiasDistribution,
    pub article_label: BiasLabel,
    pub source_probs: BiasDistribution,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source_bias: BiasLabel,
    pub bias_prediction: BiasLabel,
    pub bias_distribution: BiasDistribution,
    pub sentence_predictions: Vec<ClaimSentence>,
    pub diagnostics: Diagnostics,
}

/// Orchestrator knobs, taken from `AppConfig` at startup.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub inference_timeout: Duration,
    pub match_cutoff: u8,
    pub filter_boilerplate: bool,
    pub min_sentence_chars: usize,
    pub defaults: FusionParams,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AnalysisSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            inference_timeout: Duration::from_millis(cfg.analysis.inference_timeout_ms),
            match_cutoff: cfg.analysis.match_cutoff,
            filter_boilerplate: cfg.analysis.filter_boilerplate,
            min_sentence_chars: cfg.analysis.min_sentence_chars,
            defaults: cfg.fusion,
        }
    }
}

pub struct BiasAnalyzer {
    sources: Arc<SourcePriorTable>,
    gate: Arc<ClaimGate>,
    stance: Arc<StanceClassifier>,
    settings: AnalysisSettings,
}

/// Re-label an inference error with the unit it happened in.
fn in_unit(err: BiasError, unit: &str) -> BiasError {
    match err {
        BiasError::Inference { message, .. } => BiasError::inference(unit, message),
        other => other,
    }
}

fn timed_out(unit: &str, budget: Duration) -> BiasError {
    BiasError::inference(unit, format!("timed out after {} ms", budget.as_millis()))
}

fn record_failure(issues: &mut Vec<Issue>, err: &BiasError, unit_kind: &'static str) {
    warn!(error = %err, unit = unit_kind, "inference unit failed; continuing");
    counter!("bias_inference_failures_total", "unit" => unit_kind).increment(1);
    issues.push(Issue::from(err));
}

impl BiasAnalyzer {
    pub fn new(
        sources: Arc<SourcePriorTable>,
        gate: Arc<ClaimGate>,
        stance: Arc<StanceClassifier>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            sources,
            gate,
            stance,
            settings,
        }
    }

    pub fn sources(&self) -> &SourcePriorTable {
        &self.sources
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Configured defaults with the request's overrides applied and validated.
    pub fn resolve_params(&self, overrides: &FusionOverrides) -> Result<FusionParams> {
        let params = self.settings.defaults.with_overrides(overrides);
        params.validate()?;
        Ok(params)
    }

    /// Source lookup with the configured cutoff.
    pub fn lookup_source(&self, name: &str) -> Option<SourceMatch> {
        self.sources.lookup(name, self.settings.match_cutoff)
    }

    pub async fn analyze(
        &self,
        article: &ArticleInput,
        overrides: &FusionOverrides,
    ) -> Result<AnalysisResult> {
        let params = self.resolve_params(overrides)?;
        let priors = params.priors;
        let budget = self.settings.inference_timeout;

        let raw = article.text.trim();
        if raw.is_empty() {
            return Err(BiasError::EmptyArticle);
        }

        let sentences = text::prepare_sentences(
            raw,
            self.settings.filter_boilerplate,
            self.settings.min_sentence_chars,
        );
        let article_text = if sentences.is_empty() {
            raw.to_string()
        } else {
            sentences.join("\n")
        };

        let mut issues = Vec::new();

        // Source signal.
        let source_name = article
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| article.url.as_deref().and_then(text::source_from_url));

        let matched = source_name.as_deref().and_then(|n| self.lookup_source(n));
        let source_probs = match &matched {
            Some(m) => m.distribution,
            None => {
                let err = BiasError::NoSourceMatch {
                    query: source_name.clone().unwrap_or_default(),
                };
                info!(source = ?source_name, "no source match; using priors");
                counter!("bias_source_match_miss_total").increment(1);
                issues.push(Issue::from(&err));
                priors
            }
        };

        // Article stance and claim gate are independent units.
        let (article_res, gate_res) = tokio::join!(
            tokio::time::timeout(budget, self.stance.predict(&article_text, &params.thresholds)),
            tokio::time::timeout(budget, self.gate.classify(&sentences, params.thresholds.claim)),
        );

        let article_pred = article_res
            .unwrap_or_else(|_| Err(timed_out("article", budget)))
            .map_err(|e| in_unit(e, "article"));
        let article_pred = match article_pred {
            Ok(p) => p,
            Err(e) if e.is_recoverable() => {
                record_failure(&mut issues, &e, "article");
                StancePrediction {
                    distribution: priors,
                    label: priors.argmax(),
                }
            }
            Err(e) => return Err(e),
        };

        let gated = gate_res
            .unwrap_or_else(|_| Err(timed_out("claim gate", budget)))
            .map_err(|e| in_unit(e, "claim gate"));
        let gated: Vec<Option<GatedSentence>> = match gated {
            Ok(g) => g.into_iter().map(Some).collect(),
            Err(e) if e.is_recoverable() => {
                record_failure(&mut issues, &e, "claim_gate");
                vec![None; sentences.len()]
            }
            Err(e) => return Err(e),
        };

        let sentence_predictions =
            self.score_sentences(&sentences, &gated, &params, &mut issues).await;

        let sentence_probs: Vec<BiasDistribution> =
            sentence_predictions.iter().map(|s| s.probs).collect();
        let fused = fusion::fuse(
            &priors,
            &source_probs,
            &article_pred.distribution,
            &sentence_probs,
            &params.weights,
        )?;

        let total = sentence_predictions.len();
        let claims = sentence_predictions.iter().filter(|s| s.is_claim).count();
        let per_political = if total == 0 {
            0.0
        } else {
            claims as f64 / total as f64
        };

        counter!("bias_analyses_total").increment(1);
        counter!("bias_sentences_total").increment(total as u64);
        counter!("bias_claim_sentences_total").increment(claims as u64);
        info!(
            source = ?source_name,
            matched = ?matched.as_ref().map(|m| m.name.as_str()),
            prediction = %fused.label,
            model = self.stance.model_name(),
            sentences = total,
            claims,
            issues = issues.len(),
            "article analysed"
        );

        Ok(AnalysisResult {
            title: article.title.clone(),
            source: source_name,
            url: article.url.clone(),
            source_bias: source_probs.argmax(),
            bias_prediction: fused.label,
            bias_distribution: fused.posterior,
            sentence_predictions,
            diagnostics: Diagnostics {
                match_name: matched.as_ref().map(|m| m.name.clone()),
                match_score: matched.as_ref().map(|m| m.score),
                source_matched: matched.is_some(),
                per_political,
                article_probs: article_pred.distribution,
                article_label: article_pred.label,
                source_probs,
                issues,
            },
        })
    }

    /// Stance-score every claim sentence as its own task and budget.
    /// Non-claims and failures carry the priors and `not claim`.
    async fn score_sentences(
        &self,
        sentences: &[String],
        gated: &[Option<GatedSentence>],
        params: &FusionParams,
        issues: &mut Vec<Issue>,
    ) -> Vec<ClaimSentence> {
        let priors = params.priors;
        let budget = self.settings.inference_timeout;

        let mut out: Vec<ClaimSentence> = sentences
            .iter()
            .zip(gated)
            .enumerate()
            .map(|(index, (text, g))| ClaimSentence {
                index,
                text: text.clone(),
                is_claim: g.as_ref().is_some_and(|g| g.is_claim),
                claim_probability: g.as_ref().map(|g| g.probability),
                label: SentenceLabel::NotClaim,
                probs: priors,
                error: None,
            })
            .collect();

        let mut tasks = JoinSet::new();
        for s in out.iter().filter(|s| s.is_claim) {
            let stance = Arc::clone(&self.stance);
            let text = s.text.clone();
            let index = s.index;
            let thresholds = params.thresholds;
            tasks.spawn(async move {
                let unit = format!("sentence {index}");
                let res = match tokio::time::timeout(budget, stance.predict(&text, &thresholds)).await
                {
                    Ok(r) => r.map_err(|e| in_unit(e, &unit)),
                    Err(_) => Err(timed_out(&unit, budget)),
                };
                (index, res)
            });
        }

        let mut results: Vec<Option<Result<StancePrediction>>> =
            (0..out.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, res)) => results[index] = Some(res),
                Err(e) => warn!(error = %e, "sentence task did not complete"),
            }
        }

        for s in out.iter_mut().filter(|s| s.is_claim) {
            let res = results[s.index].take().unwrap_or_else(|| {
                Err(BiasError::inference(
                    format!("sentence {}", s.index),
                    "task aborted",
                ))
            });
            match res {
                Ok(pred) => {
                    debug!(
                        sentence = s.index,
                        id = %text::LogId::of(&s.text),
                        label = %pred.label,
                        "claim scored"
                    );
                    s.probs = pred.distribution;
                    s.label = pred.label.into();
                }
                Err(e) => {
                    record_failure(issues, &e, "sentence");
                    s.error = Some(e.to_string());
                }
            }
        }
        out
    }
}
