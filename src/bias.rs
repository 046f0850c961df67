//! # Bias labels and distributions
//! Closed three-way label set and the fixed-size probability record indexed by it.
//!
//! Every distribution in the crate (priors, source rows, classifier outputs,
//! fused posteriors) is a `BiasDistribution`. Missing keys on input
//! deserialize as `0.0`, which is also how fusion treats them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Political orientation.
///
/// Declaration order is the tie-break precedence used by every argmax in the
/// crate: `Left`, then `Center`, then `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasLabel {
    Left,
    Center,
    Right,
}

impl BiasLabel {
    /// All labels in precedence order.
    pub const ALL: [BiasLabel; 3] = [BiasLabel::Left, BiasLabel::Center, BiasLabel::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            BiasLabel::Left => "left",
            BiasLabel::Center => "center",
            BiasLabel::Right => "right",
        }
    }

    /// Position in classifier output vectors (`[left, center, right]`).
    pub fn index(self) -> usize {
        match self {
            BiasLabel::Left => 0,
            BiasLabel::Center => 1,
            BiasLabel::Right => 2,
        }
    }

    /// Parse a label name as emitted by classifiers and CSV headers.
    /// Accepts `left|center|right` (any case) and `LABEL_0..2`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "label_0" => Some(BiasLabel::Left),
            "center" | "centre" | "label_1" => Some(BiasLabel::Center),
            "right" | "label_2" => Some(BiasLabel::Right),
            _ => None,
        }
    }
}

impl fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-sentence label: a stance for scored claims, `not claim` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentenceLabel {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "center")]
    Center,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "not claim")]
    NotClaim,
}

impl From<BiasLabel> for SentenceLabel {
    fn from(l: BiasLabel) -> Self {
        match l {
            BiasLabel::Left => SentenceLabel::Left,
            BiasLabel::Center => SentenceLabel::Center,
            BiasLabel::Right => SentenceLabel::Right,
        }
    }
}

/// Probability mass over {left, center, right}.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BiasDistribution {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub center: f64,
    #[serde(default)]
    pub right: f64,
}

impl BiasDistribution {
    pub const fn new(left: f64, center: f64, right: f64) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    /// Equal mass on every label.
    pub const fn uniform() -> Self {
        Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }

    /// Build from a classifier vector ordered `[left, center, right]`.
    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.left, self.center, self.right]
    }

    pub fn sum(&self) -> f64 {
        self.left + self.center + self.right
    }

    /// Label with the highest mass; ties resolve as left, center, right.
    pub fn argmax(&self) -> BiasLabel {
        let mut best = BiasLabel::Left;
        for label in [BiasLabel::Center, BiasLabel::Right] {
            if self[label] > self[best] {
                best = label;
            }
        }
        best
    }

    /// `true` if every component is finite and inside `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.to_array()
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    }

    /// `true` if the components sum to one within `tol`.
    pub fn is_normalized(&self, tol: f64) -> bool {
        (self.sum() - 1.0).abs() <= tol
    }
}

impl Index<BiasLabel> for BiasDistribution {
    type Output = f64;

    fn index(&self, label: BiasLabel) -> &f64 {
        match label {
            BiasLabel::Left => &self.left,
            BiasLabel::Center => &self.center,
            BiasLabel::Right => &self.right,
        }
    }
}

impl IndexMut<BiasLabel> for BiasDistribution {
    fn index_mut(&mut self, label: BiasLabel) -> &mut f64 {
        match label {
            BiasLabel::Left => &mut self.left,
            BiasLabel::Center => &mut self.center,
            BiasLabel::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_largest() {
        let d = BiasDistribution::new(0.1, 0.2, 0.7);
        assert_eq!(d.argmax(), BiasLabel::Right);
    }

    #[test]
    fn argmax_ties_follow_left_center_right() {
        assert_eq!(BiasDistribution::uniform().argmax(), BiasLabel::Left);
        assert_eq!(
            BiasDistribution::new(0.2, 0.4, 0.4).argmax(),
            BiasLabel::Center
        );
        assert_eq!(
            BiasDistribution::new(0.4, 0.2, 0.4).argmax(),
            BiasLabel::Left
        );
    }

    #[test]
    fn missing_keys_deserialize_as_zero() {
        let d: BiasDistribution = serde_json::from_str(r#"{"left":0.6}"#).unwrap();
        assert_eq!(d, BiasDistribution::new(0.6, 0.0, 0.0));
    }

    #[test]
    fn sentence_label_serializes_not_claim_with_space() {
        let v = serde_json::to_value(SentenceLabel::NotClaim).unwrap();
        assert_eq!(v, serde_json::json!("not claim"));
        let v = serde_json::to_value(SentenceLabel::from(BiasLabel::Right)).unwrap();
        assert_eq!(v, serde_json::json!("right"));
    }

    #[test]
    fn parse_accepts_hf_style_names() {
        assert_eq!(BiasLabel::parse("LABEL_0"), Some(BiasLabel::Left));
        assert_eq!(BiasLabel::parse(" Center "), Some(BiasLabel::Center));
        assert_eq!(BiasLabel::parse("label_2"), Some(BiasLabel::Right));
        assert_eq!(BiasLabel::parse("neutral"), None);
    }

    #[test]
    fn validity_checks_range_and_finiteness() {
        assert!(BiasDistribution::new(0.0, 1.0, 0.0).is_valid());
        assert!(!BiasDistribution::new(-0.1, 0.5, 0.6).is_valid());
        assert!(!BiasDistribution::new(f64::NAN, 0.5, 0.5).is_valid());
    }
}
