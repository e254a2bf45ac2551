//! Core data models for the risk predictor

use serde::{Deserialize, Serialize};

/// Canonical feature order used whenever a model does not declare its own
pub const CANONICAL_FEATURES: [&str; 12] = [
    "age",
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
    "BMI",
];

/// Name of the derived Body-Mass-Index feature
pub const BMI_FEATURE: &str = "BMI";

/// Raw clinical and lifestyle record for one subject
///
/// Field names follow the reference dataset columns. Age is expressed in
/// days, height in centimeters and weight in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub age: f32,
    pub gender: f32,
    pub height: f32,
    pub weight: f32,
    pub ap_hi: f32,
    pub ap_lo: f32,
    pub cholesterol: f32,
    pub gluc: f32,
    #[serde(default)]
    pub smoke: Option<f32>,
    #[serde(default)]
    pub alco: Option<f32>,
    #[serde(default)]
    pub active: Option<f32>,
}

/// Ordered mapping from feature name to value for exactly one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, f32)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append a feature, replacing the value if the name is already present
    pub fn insert(&mut self, name: impl Into<String>, value: f32) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Values in insertion order
    pub fn values(&self) -> Vec<f32> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project onto the given names, in that order.
    ///
    /// Returns the names that could not be satisfied on failure.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<f32>, Vec<String>> {
        let mut values = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.get(name.as_ref()) {
                Some(v) => values.push(v),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(values)
        } else {
            Err(missing)
        }
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

/// User-facing risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    High,
}

impl RiskLabel {
    /// High when either the predicted class is positive or the probability
    /// exceeds 0.5. The two signals can disagree; either one is enough.
    pub fn from_prediction(label: u8, probability: f32) -> Self {
        if label == 1 || probability > 0.5 {
            RiskLabel::High
        } else {
            RiskLabel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a prediction came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    /// A loaded classifier produced the result
    Model { name: String },
    /// No classifier loaded; threshold heuristic over raw readings
    Heuristic,
    /// Healthy lifestyle answers short-circuited the clinical stage
    LifestyleScreen,
}

impl PredictionSource {
    /// Heuristic and screening results are approximations
    pub fn is_low_confidence(&self) -> bool {
        !matches!(self, PredictionSource::Model { .. })
    }
}

/// Label and probability before risk/suggestion post-processing
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub label: u8,
    pub probability: f32,
    pub source: PredictionSource,
}

/// Prediction returned to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk: RiskLabel,
    pub probability: f32,
    pub suggestion: String,
    pub source: PredictionSource,
    pub generated_at: i64,
}

impl PredictionResult {
    /// Probability as a percentage rounded to one decimal place
    pub fn probability_percent(&self) -> f32 {
        (self.probability * 1000.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_label_or_rule() {
        assert_eq!(RiskLabel::from_prediction(0, 0.62), RiskLabel::High);
        assert_eq!(RiskLabel::from_prediction(1, 0.12), RiskLabel::High);
        assert_eq!(RiskLabel::from_prediction(0, 0.5), RiskLabel::Low);
        assert_eq!(RiskLabel::from_prediction(0, 0.1), RiskLabel::Low);
    }

    #[test]
    fn test_feature_vector_insert_replaces() {
        let mut v = FeatureVector::new();
        v.insert("age", 1.0);
        v.insert("BMI", 2.0);
        v.insert("age", 3.0);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get("age"), Some(3.0));
        assert_eq!(v.names().collect::<Vec<_>>(), vec!["age", "BMI"]);
    }

    #[test]
    fn test_projection_reports_missing() {
        let mut v = FeatureVector::new();
        v.insert("age", 1.0);
        let err = v.project(&["age", "cholesterol", "BMI"]).unwrap_err();
        assert_eq!(err, vec!["cholesterol".to_string(), "BMI".to_string()]);
    }

    #[test]
    fn test_health_record_lifestyle_fields_optional() {
        let json = r#"{"age": 18393, "gender": 2, "height": 168, "weight": 62,
            "ap_hi": 110, "ap_lo": 80, "cholesterol": 1, "gluc": 1}"#;
        let record: HealthRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.smoke, None);
        assert_eq!(record.active, None);
    }

    #[test]
    fn test_probability_percent_rounding() {
        let result = PredictionResult {
            risk: RiskLabel::High,
            probability: 0.6237,
            suggestion: String::new(),
            source: PredictionSource::Heuristic,
            generated_at: 0,
        };
        assert!((result.probability_percent() - 62.4).abs() < 1e-4);
    }
}
