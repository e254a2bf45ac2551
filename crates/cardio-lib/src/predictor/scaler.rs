//! Fitted feature standardization
//!
//! Mirrors a fitted standard scaler: `(x - mean) / scale` per column.
//! Loaded from a JSON artifact of the form `{"mean": [...], "scale": [...]}`.

use crate::error::PredictError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> anyhow::Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let scaler: StandardScaler = serde_json::from_slice(bytes)?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "scaler mean has {} values but scale has {}",
                self.mean.len(),
                self.scale.len()
            );
        }
        if self.mean.is_empty() {
            anyhow::bail!("scaler has no columns");
        }
        Ok(())
    }

    /// Number of columns the scaler was fitted on
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Standardize a single row in place
    pub fn transform(&self, row: &mut [f32]) -> Result<(), PredictError> {
        if row.len() != self.width() {
            return Err(PredictError::Scaler {
                expected: self.width(),
                actual: row.len(),
            });
        }
        for ((value, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            // Constant columns were fitted with zero variance
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *value = (*value - mean) / scale;
        }
        Ok(())
    }

    pub fn transform_rows(&self, rows: &mut [Vec<f32>]) -> Result<(), PredictError> {
        rows.iter_mut().try_for_each(|row| self.transform(row))
    }
}
