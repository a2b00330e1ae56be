use serde::{Deserialize, Serialize};

/// Crossing any threshold at or above this value is a final-warning event.
pub const FINAL_WARNING_THRESHOLD: f64 = 9.0;

/// Reaching this total triggers the termination review.
pub const TERMINATION_THRESHOLD: f64 = 15.0;

pub const FALLBACK_CONSEQUENCE: &str = "See employee handbook for consequence details";

/// One configured consequence step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub threshold: f64,
    pub consequence: String,
}

/// Ascending list of consequence steps read from settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Threshold>", into = "Vec<Threshold>")]
pub struct ThresholdTable {
    entries: Vec<Threshold>,
}

impl From<Vec<Threshold>> for ThresholdTable {
    fn from(entries: Vec<Threshold>) -> Self {
        Self::new(entries)
    }
}

impl From<ThresholdTable> for Vec<Threshold> {
    fn from(table: ThresholdTable) -> Self {
        table.entries
    }
}

impl ThresholdTable {
    pub fn new(mut entries: Vec<Threshold>) -> Self {
        entries.retain(|entry| entry.threshold.is_finite());
        entries.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self { entries }
    }

    pub fn entries(&self) -> &[Threshold] {
        &self.entries
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|entry| entry.threshold).collect()
    }

    /// Thresholds `T` with `old < T <= new`, ascending. Decreases never alert.
    pub fn detect(&self, old_points: f64, new_points: f64) -> Vec<f64> {
        if new_points <= old_points {
            return Vec::new();
        }

        self.entries
            .iter()
            .map(|entry| entry.threshold)
            .filter(|threshold| old_points < *threshold && *threshold <= new_points)
            .collect()
    }

    /// Configured consequence text, if any, for an exact threshold value.
    pub fn consequence_for(&self, threshold: f64) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.threshold == threshold)
            .map(|entry| entry.consequence.trim())
            .filter(|text| !text.is_empty())
    }

    pub fn consequence_or_fallback(&self, threshold: f64) -> &str {
        self.consequence_for(threshold).unwrap_or(FALLBACK_CONSEQUENCE)
    }

    /// Highest step at or below the given total.
    pub fn highest_reached(&self, points: f64) -> Option<&Threshold> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.threshold <= points)
    }
}

/// Free-function form of [`ThresholdTable::detect`].
pub fn detect_thresholds(table: &ThresholdTable, old_points: f64, new_points: f64) -> Vec<f64> {
    table.detect(old_points, new_points)
}

/// Alert tier derived from the set of crossed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Informational,
    FinalWarning,
    Termination,
}

impl SeverityTier {
    pub fn from_crossed(crossed: &[f64]) -> Self {
        if crossed
            .iter()
            .any(|threshold| *threshold == TERMINATION_THRESHOLD)
        {
            SeverityTier::Termination
        } else if crossed
            .iter()
            .any(|threshold| *threshold >= FINAL_WARNING_THRESHOLD)
        {
            SeverityTier::FinalWarning
        } else {
            SeverityTier::Informational
        }
    }

    pub const fn is_high_priority(self) -> bool {
        matches!(self, SeverityTier::FinalWarning | SeverityTier::Termination)
    }
}
