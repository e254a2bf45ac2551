//! Feature construction for model inference
//!
//! Turns a raw [`HealthRecord`] into the canonical [`FeatureVector`],
//! filling neutral lifestyle defaults and deriving Body-Mass-Index.

use crate::error::PredictError;
use crate::models::{FeatureVector, HealthRecord, BMI_FEATURE};

/// Body-Mass-Index from height in centimeters and weight in kilograms.
///
/// Shared by single-record inference and the evaluation dataset path.
pub fn bmi(height_cm: f32, weight_kg: f32) -> f32 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Values used when the caller leaves lifestyle answers out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifestyleDefaults {
    pub smoke: f32,
    pub alco: f32,
    pub active: f32,
}

impl Default for LifestyleDefaults {
    fn default() -> Self {
        Self {
            smoke: 0.0,
            alco: 0.0,
            active: 1.0,
        }
    }
}

/// Builds feature vectors in canonical order
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    defaults: LifestyleDefaults,
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: LifestyleDefaults) -> Self {
        Self { defaults }
    }

    pub fn build(&self, record: &HealthRecord) -> Result<FeatureVector, PredictError> {
        validate(record)?;

        let mut features = FeatureVector::new();
        features.insert("age", record.age);
        features.insert("gender", record.gender);
        features.insert("height", record.height);
        features.insert("weight", record.weight);
        features.insert("ap_hi", record.ap_hi);
        features.insert("ap_lo", record.ap_lo);
        features.insert("cholesterol", record.cholesterol);
        features.insert("gluc", record.gluc);
        features.insert("smoke", record.smoke.unwrap_or(self.defaults.smoke));
        features.insert("alco", record.alco.unwrap_or(self.defaults.alco));
        features.insert("active", record.active.unwrap_or(self.defaults.active));
        features.insert(BMI_FEATURE, bmi(record.height, record.weight));
        Ok(features)
    }
}

fn validate(record: &HealthRecord) -> Result<(), PredictError> {
    if !(record.height.is_finite() && record.height > 0.0) {
        return Err(PredictError::InvalidRecord(format!(
            "height must be a positive number of centimeters, got {}",
            record.height
        )));
    }
    if !(record.weight.is_finite() && record.weight > 0.0) {
        return Err(PredictError::InvalidRecord(format!(
            "weight must be a positive number of kilograms, got {}",
            record.weight
        )));
    }
    let readings = [
        ("age", Some(record.age)),
        ("gender", Some(record.gender)),
        ("ap_hi", Some(record.ap_hi)),
        ("ap_lo", Some(record.ap_lo)),
        ("cholesterol", Some(record.cholesterol)),
        ("gluc", Some(record.gluc)),
        ("smoke", record.smoke),
        ("alco", record.alco),
        ("active", record.active),
    ];
    let invalid = readings
        .iter()
        .find_map(|(name, v)| v.filter(|v| !v.is_finite()).map(|v| (name, v)));
    if let Some((name, value)) = invalid {
        return Err(PredictError::InvalidRecord(format!(
            "{} must be a finite number, got {}",
            name, value
        )));
    }
    Ok(())
}
