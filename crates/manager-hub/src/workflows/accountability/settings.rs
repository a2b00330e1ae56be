use serde::{Deserialize, Serialize};

use super::thresholds::{Threshold, ThresholdTable};

/// Infraction category with its current point value and illustrative examples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub point_value: i32,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Per-request snapshot of the administrative settings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub thresholds: ThresholdTable,
    pub buckets: Vec<Bucket>,
    pub valid_locations: Vec<String>,
}

impl Settings {
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        let name = name.trim();
        self.buckets
            .iter()
            .find(|bucket| bucket.name.eq_ignore_ascii_case(name))
    }

    pub fn is_valid_location(&self, location: &str) -> bool {
        let location = location.trim();
        self.valid_locations
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(location))
    }

    /// The handbook defaults shipped with a fresh install.
    pub fn standard() -> Self {
        let thresholds = ThresholdTable::new(vec![
            threshold(2.0, "Verbal coaching with manager"),
            threshold(3.0, "Documented verbal warning"),
            threshold(5.0, "Written warning"),
            threshold(6.0, "Written warning and schedule review"),
            threshold(9.0, "Final written warning"),
            threshold(12.0, "Suspension pending director review"),
            threshold(15.0, "Termination review"),
        ]);

        let buckets = vec![
            bucket(
                "Minor",
                1,
                &["Late clock-in under 10 minutes", "Uniform not to standard"],
            ),
            bucket(
                "Moderate",
                3,
                &["No-call tardy over 30 minutes", "Leaving station unattended"],
            ),
            bucket(
                "Major",
                5,
                &["Food safety violation", "Insubordination"],
            ),
            bucket(
                "Severe",
                8,
                &["No-call no-show", "Cash handling violation"],
            ),
        ];

        Self {
            thresholds,
            buckets,
            valid_locations: vec![
                "Downtown".to_string(),
                "Riverside".to_string(),
                "Airport".to_string(),
            ],
        }
    }
}

fn threshold(value: f64, consequence: &str) -> Threshold {
    Threshold {
        threshold: value,
        consequence: consequence.to_string(),
    }
}

fn bucket(name: &str, point_value: i32, examples: &[&str]) -> Bucket {
    Bucket {
        name: name.to_string(),
        point_value,
        examples: examples.iter().map(|example| example.to_string()).collect(),
    }
}
