//! Lifestyle screening ahead of the clinical stage
//!
//! People with healthy lifestyle answers are cleared straight away with a
//! low-risk result; everybody else goes on to give clinical readings for
//! the model-based assessment.

use crate::models::{PredictionResult, PredictionSource, RiskLabel};
use serde::{Deserialize, Serialize};

/// Age in years above which the clinical stage is always required
pub const SCREENING_AGE_LIMIT_YEARS: f32 = 45.0;

/// Probability reported for people cleared by screening
pub const CLEARED_PROBABILITY: f32 = 0.10;

const CLEARED_SUGGESTION: &str =
    "Your lifestyle markers are healthy. Maintain your activity levels.";

/// Answers from the lifestyle questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleAnswers {
    pub age_years: f32,
    pub smoke: bool,
    pub alco: bool,
    pub active: bool,
}

impl LifestyleAnswers {
    /// Age in days, the unit the models and dataset use
    pub fn age_in_days(&self) -> f32 {
        self.age_years * 365.0
    }

    /// An unreadable age always sends the person on to the clinical stage
    pub fn is_risky(&self) -> bool {
        !self.age_years.is_finite()
            || self.age_years > SCREENING_AGE_LIMIT_YEARS
            || self.smoke
            || self.alco
            || !self.active
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screening {
    /// Healthy answers; no clinical readings needed
    Cleared(PredictionResult),
    /// Clinical readings must be collected and run through the engine
    NeedsClinical,
}

pub fn screen_lifestyle(answers: &LifestyleAnswers) -> Screening {
    if answers.is_risky() {
        return Screening::NeedsClinical;
    }
    Screening::Cleared(PredictionResult {
        risk: RiskLabel::Low,
        probability: CLEARED_PROBABILITY,
        suggestion: CLEARED_SUGGESTION.to_string(),
        source: PredictionSource::LifestyleScreen,
        generated_at: chrono::Utc::now().timestamp(),
    })
}
