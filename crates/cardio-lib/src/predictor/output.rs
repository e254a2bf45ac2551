//! Prediction output formatting
//!
//! Converts a raw label/probability pair into the user-facing
//! [`PredictionResult`] with a risk category and lifestyle suggestion.

use crate::models::{PredictionResult, RawPrediction, RiskLabel};

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Probabilities below this get the reassuring suggestion
    pub low_risk_below: f32,
    /// Probabilities below this (and above `low_risk_below`) get the moderate suggestion
    pub moderate_risk_below: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            low_risk_below: 0.3,
            moderate_risk_below: 0.7,
        }
    }
}

pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            config: OutputConfig::default(),
        }
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, raw: RawPrediction) -> PredictionResult {
        let probability = raw.probability.clamp(0.0, 1.0);
        PredictionResult {
            risk: RiskLabel::from_prediction(raw.label, probability),
            probability,
            suggestion: self.suggestion(probability).to_string(),
            source: raw.source,
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn suggestion(&self, probability: f32) -> &'static str {
        if probability < self.config.low_risk_below {
            "Your heart health looks good! Keep up the active lifestyle."
        } else if probability < self.config.moderate_risk_below {
            "Moderate risk. Consider reducing salt intake and doing more cardio."
        } else {
            "High risk detected. Please consult a cardiologist regularly."
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}
