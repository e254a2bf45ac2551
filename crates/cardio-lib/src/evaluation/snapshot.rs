//! Benchmark results shown on the insights page

use serde::{Deserialize, Serialize};

/// Whether the numbers were measured or are the illustrative defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotOrigin {
    Measured,
    Illustrative,
}

/// Aggregate stats for the primary model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub main_model: String,
    /// Percent, one decimal place
    pub accuracy: f64,
    /// Two decimal places
    pub roc_auc: f64,
    /// Row count of the reference dataset, formatted for display
    pub dataset_size: String,
    pub features: usize,
}

/// One model's benchmark row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub name: String,
    /// Percent, one decimal place
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ComparisonRow {
    fn new(name: &str, accuracy: f64, precision: f64, recall: f64, f1: f64) -> Self {
        Self {
            name: name.to_string(),
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub stats: ModelStats,
    pub comparison: Vec<ComparisonRow>,
    pub origin: SnapshotOrigin,
}

impl MetricsSnapshot {
    /// Fixed numbers shown when no measurement is possible
    pub fn illustrative() -> Self {
        Self {
            stats: ModelStats {
                main_model: "Random Forest (Demo)".to_string(),
                accuracy: 73.1,
                roc_auc: 0.79,
                dataset_size: "70,000+".to_string(),
                features: 11,
            },
            comparison: vec![
                ComparisonRow::new("Random Forest", 73.1, 0.74, 0.71, 0.72),
                ComparisonRow::new("Decision Tree", 71.5, 0.72, 0.69, 0.70),
                ComparisonRow::new("Logistic Regression", 69.8, 0.70, 0.68, 0.69),
                ComparisonRow::new("Naive Bayes", 68.2, 0.69, 0.65, 0.67),
                ComparisonRow::new("Linear Regression", 65.5, 0.65, 0.60, 0.62),
            ],
            origin: SnapshotOrigin::Illustrative,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.origin == SnapshotOrigin::Measured
    }
}

/// `70000` -> `"70,000"`
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(500), "500");
        assert_eq!(format_count(12_000), "12,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_illustrative_snapshot() {
        let snapshot = MetricsSnapshot::illustrative();
        assert!(!snapshot.is_measured());
        assert_eq!(snapshot.comparison.len(), 5);
        assert_eq!(snapshot.stats.features, 11);
        assert!(snapshot
            .comparison
            .windows(2)
            .all(|w| w[0].accuracy >= w[1].accuracy));
    }

    #[test]
    fn test_serializes_origin_lowercase() {
        let json = serde_json::to_value(MetricsSnapshot::illustrative()).unwrap();
        assert_eq!(json["origin"], "illustrative");
        assert_eq!(json["stats"]["dataset_size"], "70,000+");
    }
}
