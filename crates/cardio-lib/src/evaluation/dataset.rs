//! Reference dataset loading and splitting

use crate::models::BMI_FEATURE;
use crate::predictor::bmi;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Preferred name of the label column
pub const TARGET_COLUMN: &str = "cardio";

/// Where the evaluation dataset comes from
pub trait DatasetSource: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Whether the dataset exists at all
    fn is_available(&self) -> bool;

    /// Read the full dataset
    fn load(&self) -> Result<Dataset>;
}

/// CSV file with a header row and numeric cells
#[derive(Debug, Clone)]
pub struct CsvDataset {
    path: PathBuf,
    delimiter: u8,
}

impl CsvDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvDataset {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<Dataset> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Failed to open dataset {:?}", self.path))?;
        Dataset::from_csv_reader(file, self.delimiter)
            .with_context(|| format!("Failed to parse dataset {:?}", self.path))
    }
}

/// Numeric table, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f32>>) -> Result<Self> {
        if columns.is_empty() {
            anyhow::bail!("dataset has no columns");
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            anyhow::bail!(
                "row {} has {} values, header has {} columns",
                i,
                row.len(),
                columns.len()
            );
        }
        for (i, row) in rows.iter().enumerate() {
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                anyhow::bail!("Row {} column {:?}: {} is not finite", i + 1, columns[j], row[j]);
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()
            .context("Failed to read header row")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read row {}", i + 1))?;
            let row = record
                .iter()
                .zip(&columns)
                .map(|(cell, column)| {
                    let value = cell.parse::<f32>().with_context(|| {
                        format!("Row {} column {:?}: {:?} is not numeric", i + 1, column, cell)
                    })?;
                    if !value.is_finite() {
                        anyhow::bail!(
                            "Row {} column {:?}: {:?} is not finite",
                            i + 1,
                            column,
                            cell
                        );
                    }
                    Ok(value)
                })
                .collect::<Result<Vec<f32>>>()?;
            rows.push(row);
        }

        Self::new(columns, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Add a BMI column when height and weight exist and BMI does not
    pub fn derive_bmi(&mut self) -> bool {
        if self.column_index(BMI_FEATURE).is_some() {
            return false;
        }
        let (Some(h), Some(w)) = (self.column_index("height"), self.column_index("weight")) else {
            return false;
        };
        for row in &mut self.rows {
            let value = bmi(row[h], row[w]);
            row.push(value);
        }
        self.columns.push(BMI_FEATURE.to_string());
        true
    }

    /// Index of the label column: `cardio` if present, else the last column
    pub fn target_index(&self) -> usize {
        self.column_index(TARGET_COLUMN)
            .unwrap_or(self.columns.len() - 1)
    }

    /// Separate the label column from the feature columns
    pub fn into_features_and_target(self) -> (FeatureTable, Vec<u8>) {
        let target = self.target_index();
        let columns = self
            .columns
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, c)| c)
            .collect();

        let mut labels = Vec::with_capacity(self.rows.len());
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                labels.push(u8::from(row.remove(target) > 0.5));
                row
            })
            .collect();

        (FeatureTable { columns, rows }, labels)
    }
}

/// Feature columns of the dataset without the label
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Keep only the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Rows restricted to the named columns, in that order.
    ///
    /// Returns the names that are not in the table on failure.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Vec<f32>>, Vec<String>> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.columns.iter().position(|c| c == name.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i]).collect())
            .collect())
    }
}

/// Indices of a shuffled held-out slice of `ceil(n * test_fraction)` rows
pub fn holdout_indices(n: usize, test_fraction: f64, seed: u64) -> Vec<usize> {
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(n_test.min(n));
    indices
}

pub fn select<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i]).collect()
}
