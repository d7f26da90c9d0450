//! Diff records and match analysis between a live field and a desired one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Weight of one critical difference in the score penalty.
const CRITICAL_WEIGHT: f64 = 0.8;
/// Weight of one minor difference in the score penalty.
const MINOR_WEIGHT: f64 = 0.2;
/// Penalty normalization; five critical differences already drive the score to 0.
const SCORE_SCALE: f64 = 5.0;

/// How structurally significant a difference is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Type-defining: type code, UI type, options, numeric bounds, rating scale.
    Critical,
    /// Cosmetic: description text, formatting.
    Minor,
}

/// One itemized difference between the live and the desired field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDifference {
    /// Dotted path of the differing attribute, e.g. `property.options`.
    pub property: String,
    /// Live value; `None` when the live field lacks it.
    pub from: Option<Value>,
    /// Desired value; `None` when the desired configuration lacks it.
    pub to: Option<Value>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConfigurationDifference {
    /// Creates a critical difference.
    pub fn critical(property: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            property: property.into(),
            from,
            to,
            severity: Severity::Critical,
            description: None,
        }
    }

    /// Creates a minor difference.
    pub fn minor(property: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            property: property.into(),
            from,
            to,
            severity: Severity::Minor,
            description: None,
        }
    }

    /// Attaches a human readable explanation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// What the analysis suggests doing about the differences it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    NoAction,
    UpdateField,
    /// A type-level change is too invasive to patch in place safely.
    RecreateField,
}

/// Scored, itemized comparison of a live field against a desired one.
///
/// Built only through [`MatchAnalysis::from_differences`], which keeps
/// `is_full_match`, an empty diff, a score of exactly 1 and
/// [`RecommendedAction::NoAction`] in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub is_full_match: bool,
    pub differences: Vec<ConfigurationDifference>,
    pub match_score: f64,
    pub recommended_action: RecommendedAction,
}

impl MatchAnalysis {
    /// Derives the score and recommended action from a list of differences.
    pub fn from_differences(differences: Vec<ConfigurationDifference>) -> Self {
        let critical = differences.iter().filter(|d| d.is_critical()).count();
        let minor = differences.len() - critical;

        let recommended_action = if differences.is_empty() {
            RecommendedAction::NoAction
        } else if critical > 0 {
            RecommendedAction::RecreateField
        } else {
            RecommendedAction::UpdateField
        };

        Self {
            is_full_match: differences.is_empty(),
            match_score: Self::score(critical, minor),
            differences,
            recommended_action,
        }
    }

    /// A full match with nothing to do.
    pub fn full_match() -> Self {
        Self::from_differences(Vec::new())
    }

    /// `max(0, 1 - (critical * 0.8 + minor * 0.2) / 5)`.
    pub fn score(critical: usize, minor: usize) -> f64 {
        if critical == 0 && minor == 0 {
            return 1.0;
        }
        let penalty = (critical as f64 * CRITICAL_WEIGHT + minor as f64 * MINOR_WEIGHT) / SCORE_SCALE;
        (1.0 - penalty).clamp(0.0, 1.0)
    }

    /// Number of critical differences.
    pub fn critical_count(&self) -> usize {
        self.differences.iter().filter(|d| d.is_critical()).count()
    }

    /// Whether any difference is type-level.
    pub fn has_critical(&self) -> bool {
        self.differences.iter().any(ConfigurationDifference::is_critical)
    }
}
