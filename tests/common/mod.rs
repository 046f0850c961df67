// tests/common/mod.rs
// In-process collaborators so the pipeline runs without model servers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use news_bias_analyzer::analysis::{AnalysisSettings, BiasAnalyzer};
use news_bias_analyzer::claim_gate::ClaimGate;
use news_bias_analyzer::models::{NoveltyDetector, SentenceEncoder, StanceModel};
use news_bias_analyzer::source_priors::SourcePriorTable;
use news_bias_analyzer::stance::StanceClassifier;

pub const PRIORS_CSV: &str = "\
source,P(left|source),P(center|source),P(right|source)
Reuters,0.15,0.75,0.10
Fox News,0.05,0.20,0.75
The Guardian,0.65,0.30,0.05
Center Daily,0.10,0.80,0.10
";

pub fn table() -> SourcePriorTable {
    SourcePriorTable::from_reader(PRIORS_CSV.as_bytes()).expect("fixture table parses")
}

/// Embeds each sentence as `[word_count]`.
pub struct WordCountEncoder;

#[async_trait]
impl SentenceEncoder for WordCountEncoder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| vec![t.split_whitespace().count() as f32])
            .collect())
    }
    fn name(&self) -> &'static str {
        "word-count"
    }
}

pub struct DownEncoder;

#[async_trait]
impl SentenceEncoder for DownEncoder {
    async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

/// Decision score = words - 6.5: sentences of seven or more words are claims.
pub struct LongSentenceDetector;

impl NoveltyDetector for LongSentenceDetector {
    fn decision_function(&self, e: &[f32]) -> anyhow::Result<f64> {
        Ok(f64::from(e[0]) - 6.5)
    }
    fn name(&self) -> &'static str {
        "long-sentence"
    }
}

pub fn ln3(p: [f64; 3]) -> [f64; 3] {
    p.map(f64::ln)
}

/// Keyword-driven stance model.
///
/// Multi-line input is the article-level call and returns `article`.
/// Single sentences: `FAIL` errors, `SLOW` sleeps past any test budget,
/// `tax` leans left, `border` leans right, anything else leans center.
pub struct KeywordStance {
    pub article: Option<[f64; 3]>,
    pub calls: AtomicUsize,
}

impl KeywordStance {
    pub fn new() -> Arc<Self> {
        Self::with_article(Some([0.3, 0.4, 0.3]))
    }

    /// `None` makes the article-level call fail.
    pub fn with_article(article: Option<[f64; 3]>) -> Arc<Self> {
        Arc::new(Self {
            article,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl StanceModel for KeywordStance {
    async fn logits(&self, text: &str) -> anyhow::Result<[f64; 3]> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains('\n') {
            return match self.article {
                Some(p) => Ok(ln3(p)),
                None => anyhow::bail!("article model unavailable"),
            };
        }
        if text.contains("FAIL") {
            anyhow::bail!("model crashed");
        }
        if text.contains("SLOW") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let lower = text.to_lowercase();
        if lower.contains("tax") {
            Ok(ln3([0.8, 0.15, 0.05]))
        } else if lower.contains("border") {
            Ok(ln3([0.05, 0.15, 0.8]))
        } else {
            Ok(ln3([0.1, 0.8, 0.1]))
        }
    }
    fn name(&self) -> &'static str {
        "keyword"
    }
}

pub fn settings() -> AnalysisSettings {
    AnalysisSettings {
        inference_timeout: Duration::from_millis(500),
        ..AnalysisSettings::default()
    }
}

pub fn analyzer_with(
    encoder: Arc<dyn SentenceEncoder>,
    stance: Arc<dyn StanceModel>,
    settings: AnalysisSettings,
) -> BiasAnalyzer {
    BiasAnalyzer::new(
        Arc::new(table()),
        Arc::new(ClaimGate::new(encoder, Arc::new(LongSentenceDetector), 2)),
        Arc::new(StanceClassifier::new(stance, 4)),
        settings,
    )
}

pub fn analyzer() -> BiasAnalyzer {
    analyzer_with(Arc::new(WordCountEncoder), KeywordStance::new(), settings())
}

pub const TAX_CLAIM: &str = "The new tax plan will punish working families across the country.";
pub const BORDER_CLAIM: &str = "Open border policies have made every single community less safe.";
pub const SHORT_FACT: &str = "Officials confirmed the scheduled announcement.";
pub const SHORT_FACT_2: &str = "Lawmakers return to Washington tomorrow.";
