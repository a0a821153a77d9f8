//! Training table parsing and loading.
//!
//! A table is comma-delimited text. The first line is a header whose column
//! count fixes the row width; every other line is a row of floats. Training
//! tables carry a category label in the first column followed by the twelve
//! audio features in [`crate::features::FEATURE_TABLE`] order.

mod file_source;

pub use file_source::{FetchError, FileSource, HttpFileSource, LocalFileSource};

#[cfg(feature = "mock")]
pub use file_source::MockFileSource;

use crate::features::{AudioFeatureVector, FEATURE_COUNT};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Label column plus one column per audio feature.
pub const TRAINING_TABLE_WIDTH: usize = FEATURE_COUNT + 1;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to fetch dataset '{name}': {source}")]
    Fetch {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("Dataset is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Dataset has no header line")]
    Empty,

    #[error("Line {line}: expected {expected} fields, found {found}")]
    RowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}, column {column}: '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("Training table must have {expected} columns, header has {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Parse a delimited table into numeric rows, header excluded.
///
/// Any malformed field or ragged row fails the whole parse. Line and column
/// numbers in errors are 1-based and count the header as line 1.
pub fn parse_table(text: &str) -> Result<Vec<Vec<f64>>, DatasetError> {
    parse_with_header(text).map(|(_, rows)| rows)
}

fn parse_with_header(text: &str) -> Result<(Vec<String>, Vec<Vec<f64>>), DatasetError> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    let (header_line, body) = lines.split_first().ok_or(DatasetError::Empty)?;
    let header: Vec<String> = header_line
        .split(',')
        .map(|field| field.trim().to_string())
        .collect();
    let width = header.len();

    let mut rows = Vec::with_capacity(body.len());
    for (i, line) in body.iter().enumerate() {
        let line_no = i + 2;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != width {
            return Err(DatasetError::RowWidth {
                line: line_no,
                expected: width,
                found: fields.len(),
            });
        }

        let mut row = Vec::with_capacity(width);
        for (col, field) in fields.iter().enumerate() {
            let trimmed = field.trim();
            let value = trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetError::InvalidNumber {
                    line: line_no,
                    column: col + 1,
                    value: trimmed.to_string(),
                })?;
            row.push(value);
        }
        rows.push(row);
    }

    Ok((header, rows))
}

/// A parsed training table: label column first, then the audio features.
///
/// Only [`Dataset::parse`] builds one, so every row is known to carry a
/// label and exactly [`FEATURE_COUNT`] features.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    header: Vec<String>,
    labels: Vec<f64>,
    features: Vec<AudioFeatureVector>,
}

impl Dataset {
    /// Parse a training table, checking it has the label + feature layout.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let (header, rows) = parse_with_header(text)?;
        if header.len() != TRAINING_TABLE_WIDTH {
            return Err(DatasetError::ColumnCount {
                expected: TRAINING_TABLE_WIDTH,
                found: header.len(),
            });
        }

        let mut labels = Vec::with_capacity(rows.len());
        let mut features = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let width_error = || DatasetError::RowWidth {
                line: i + 2,
                expected: TRAINING_TABLE_WIDTH,
                found: row.len(),
            };
            let (label, values) = row.split_first().ok_or_else(width_error)?;
            let vector = AudioFeatureVector::from_slice(values).map_err(|_| width_error())?;
            labels.push(*label);
            features.push(vector);
        }

        Ok(Self {
            header,
            labels,
            features,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Label column values, in source order.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// First row whose label column equals `label`.
    pub fn row_for_label(&self, label: usize) -> Option<AudioFeatureVector> {
        self.labels
            .iter()
            .zip(&self.features)
            .find(|(&l, _)| l == label as f64)
            .map(|(_, row)| *row)
    }

    /// Every row with its label stripped, in source order.
    pub fn feature_rows(&self) -> &[AudioFeatureVector] {
        &self.features
    }
}

/// Fetches a named table through a [`FileSource`] and parses it.
pub struct DatasetLoader {
    source: Arc<dyn FileSource>,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self { source }
    }

    pub async fn load(&self, name: &str) -> Result<Dataset, DatasetError> {
        let bytes = self
            .source
            .fetch(name)
            .await
            .map_err(|source| DatasetError::Fetch {
                name: name.to_string(),
                source,
            })?;
        let text = String::from_utf8(bytes)?;
        let dataset = Dataset::parse(&text)?;
        info!(name, rows = dataset.len(), "Loaded dataset");
        Ok(dataset)
    }
}
