//! # Source Prior Table
//!
//! Publisher name → prior bias distribution, loaded once from CSV and never
//! mutated afterwards.
//!
//! - CSV columns: `source,P(left|source),P(center|source),P(right|source)`
//!   (plain `left,center,right` headers are accepted too).
//! - Any unparsable row, out-of-range probability or empty name aborts the
//!   load; the process must not serve with a partial table.
//! - Lookup is fuzzy (see [`crate::fuzzy`]); the best score wins and ties go
//!   to the row that appears first in the file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::bias::BiasDistribution;
use crate::error::{BiasError, Result};
use crate::fuzzy;

/// Default similarity cutoff on the 0–100 scale.
pub const DEFAULT_MATCH_CUTOFF: u8 = 70;

#[derive(Debug, Clone)]
struct SourceEntry {
    name: String,
    normalized: String,
    distribution: BiasDistribution,
}

/// Result of a successful fuzzy lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMatch {
    pub name: String,
    pub score: u8,
    pub distribution: BiasDistribution,
}

#[derive(Debug, Deserialize)]
struct Row {
    source: String,
    #[serde(rename = "P(left|source)", alias = "left")]
    left: f64,
    #[serde(rename = "P(center|source)", alias = "center")]
    center: f64,
    #[serde(rename = "P(right|source)", alias = "right")]
    right: f64,
}

#[derive(Debug, Clone)]
pub struct SourcePriorTable {
    entries: Vec<SourceEntry>,
}

impl SourcePriorTable {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            BiasError::startup("source priors", format!("opening {}: {e}", path.display()))
        })?;
        let table = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            sources = table.len(),
            "source prior table loaded"
        );
        Ok(table)
    }

    /// Parse CSV from any reader. Row numbers in errors are 1-based file lines.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (i, rec) in rdr.deserialize::<Row>().enumerate() {
            let line = i + 2;
            let row = rec.map_err(|e| {
                BiasError::startup("source priors", format!("line {line}: {e}"))
            })?;

            let normalized = fuzzy::normalize(&row.source);
            if normalized.is_empty() {
                return Err(BiasError::startup(
                    "source priors",
                    format!("line {line}: empty source name"),
                ));
            }
            let distribution = BiasDistribution::new(row.left, row.center, row.right);
            if !distribution.is_valid() {
                return Err(BiasError::startup(
                    "source priors",
                    format!(
                        "line {line}: probabilities for '{}' must lie in [0, 1]",
                        row.source
                    ),
                ));
            }
            if !seen.insert(normalized.clone()) {
                warn!(source = %row.source, line, "duplicate source row ignored");
                continue;
            }

            entries.push(SourceEntry {
                name: row.source,
                normalized,
                distribution,
            });
        }

        if entries.is_empty() {
            return Err(BiasError::startup("source priors", "table has no rows"));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Best-scoring row regardless of cutoff. First row wins ties.
    pub fn closest(&self, query: &str) -> Option<SourceMatch> {
        let q = fuzzy::normalize(query);
        if q.is_empty() {
            return None;
        }

        let mut best: Option<(&SourceEntry, u8)> = None;
        for entry in &self.entries {
            let score = fuzzy::similarity_normalized(&q, &entry.normalized);
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((entry, score)),
            }
            if score == 100 {
                break;
            }
        }

        best.map(|(e, score)| SourceMatch {
            name: e.name.clone(),
            score,
            distribution: e.distribution,
        })
    }

    /// Fuzzy lookup; `None` when the best score is below `cutoff`.
    pub fn lookup(&self, query: &str, cutoff: u8) -> Option<SourceMatch> {
        let found = self.closest(query)?;
        if found.score < cutoff {
            debug!(
                best = %found.name,
                score = found.score,
                cutoff,
                "source lookup below cutoff"
            );
            return None;
        }
        Some(found)
    }

    /// Like [`lookup`](Self::lookup) but reports the miss as a typed error.
    pub fn resolve(&self, query: &str, cutoff: u8) -> Result<SourceMatch> {
        self.lookup(query, cutoff)
            .ok_or_else(|| BiasError::NoSourceMatch {
                query: query.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
source,P(left|source),P(center|source),P(right|source)
CNN,0.70,0.25,0.05
Fox News,0.05,0.20,0.75
Reuters,0.15,0.75,0.10
The New York Times,0.60,0.35,0.05
";

    fn table() -> SourcePriorTable {
        SourcePriorTable::from_reader(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn loads_rows_in_order() {
        let t = table();
        assert_eq!(t.len(), 4);
        assert_eq!(
            t.names().collect::<Vec<_>>(),
            vec!["CNN", "Fox News", "Reuters", "The New York Times"]
        );
    }

    #[test]
    fn exact_and_fuzzy_matches() {
        let t = table();
        let m = t.lookup("reuters", DEFAULT_MATCH_CUTOFF).unwrap();
        assert_eq!(m.name, "Reuters");
        assert_eq!(m.score, 100);
        assert!((m.distribution.center - 0.75).abs() < 1e-12);

        let m = t.lookup("New York Times", DEFAULT_MATCH_CUTOFF).unwrap();
        assert_eq!(m.name, "The New York Times");
    }

    #[test]
    fn unknown_source_returns_none() {
        let t = table();
        assert!(t.lookup("totally-unknown-source-xyz", DEFAULT_MATCH_CUTOFF).is_none());
        assert!(matches!(
            t.resolve("totally-unknown-source-xyz", DEFAULT_MATCH_CUTOFF),
            Err(BiasError::NoSourceMatch { .. })
        ));
    }

    #[test]
    fn cutoff_is_inclusive() {
        let t = table();
        let best = t.closest("Reutrs").unwrap();
        assert_eq!(best.name, "Reuters");
        assert!(best.score < 100);
        assert!(t.lookup("Reutrs", best.score).is_some());
        assert!(t.lookup("Reutrs", best.score + 1).is_none());
    }

    #[test]
    fn ties_go_to_first_row() {
        let csv = "\
source,left,center,right
Daily News,0.5,0.3,0.2
Morning News,0.1,0.3,0.6
";
        let t = SourcePriorTable::from_reader(csv.as_bytes()).unwrap();
        // "news" is a token subset of both names, so both score 100.
        let m = t.lookup("News", DEFAULT_MATCH_CUTOFF).unwrap();
        assert_eq!(m.score, 100);
        assert_eq!(m.name, "Daily News");
    }

    #[test]
    fn malformed_row_is_fatal() {
        let csv = "source,left,center,right\nCNN,0.7,abc,0.05\n";
        let err = SourcePriorTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, BiasError::StartupResource { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn out_of_range_probability_is_fatal() {
        let csv = "source,left,center,right\nCNN,1.7,0.1,0.05\n";
        assert!(SourcePriorTable::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn empty_table_is_fatal() {
        let csv = "source,left,center,right\n";
        assert!(SourcePriorTable::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn duplicate_names_keep_first() {
        let csv = "source,left,center,right\nCNN,0.7,0.2,0.1\ncnn,0.1,0.2,0.7\n";
        let t = SourcePriorTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(t.len(), 1);
        let m = t.lookup("CNN", DEFAULT_MATCH_CUTOFF).unwrap();
        assert!((m.distribution.left - 0.7).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_startup_error() {
        let err = SourcePriorTable::load_from_file("/nonexistent/priors.csv").unwrap_err();
        assert!(matches!(err, BiasError::StartupResource { .. }));
    }
}
