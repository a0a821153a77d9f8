//! Assembly of aligned (encoding, target) training rows.

use super::TrainingError;
use crate::dataset::Dataset;
use crate::features::{AudioFeatureVector, NormalizedFeatureVector, FEATURE_COUNT};
use crate::mood::{CombinedEncoding, MoodSelection, JOINT_SPACE_SIZE};
use ndarray::Array2;

/// How target rows for curated encodings are produced when the table has
/// no curated label rows of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CuratedLabels {
    /// Reuse the rows of the curated encoding's own category block.
    #[default]
    Resample,
    /// Synthesize nothing. Any curated encoding leaves the set unaligned.
    Strict,
}

/// Which encodings go into a training run and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPlan {
    /// One entry per dataset category block, in block order.
    pub categories: Vec<CombinedEncoding>,
    pub replication: usize,
    /// Extra encodings appended after the category blocks.
    pub curated: Vec<CombinedEncoding>,
    pub curated_labels: CuratedLabels,
}

impl TrainingPlan {
    /// Every joint slot in slot order.
    pub fn identity(replication: usize) -> Self {
        Self {
            categories: CombinedEncoding::all_identities().collect(),
            replication,
            curated: Vec::new(),
            curated_labels: CuratedLabels::Resample,
        }
    }

    /// A plan for a single category.
    pub fn single(encoding: CombinedEncoding, replication: usize) -> Self {
        Self {
            categories: vec![encoding],
            replication,
            curated: Vec::new(),
            curated_labels: CuratedLabels::Resample,
        }
    }

    /// Append the curated emotion + event pairings.
    pub fn with_curated(mut self, labels: CuratedLabels) -> Self {
        self.curated = MoodSelection::curated().map(|s| s.encode()).collect();
        self.curated_labels = labels;
        self
    }

    /// Target rows for each category and, when the table carries them,
    /// for each curated encoding. Accepted layouts, with `n` categories,
    /// `c` curated encodings and replication `r`:
    ///
    /// - `n * r` rows grouped by category
    /// - `n` rows, one per category, each repeated `r` times
    /// - `(n + c) * r` rows grouped by category, curated blocks last
    /// - `n + c` rows, curated rows last, each repeated `r` times
    fn label_blocks<'a>(
        &self,
        rows: &'a [AudioFeatureVector],
    ) -> Result<LabelBlocks<'a>, TrainingError> {
        let n = self.categories.len();
        let c = self.curated.len();
        let rep = self.replication;
        let shape_error = || TrainingError::DatasetShape {
            rows: rows.len(),
            categories: n,
            replication: rep,
        };
        if rep == 0 {
            return Err(shape_error());
        }

        let mut categories: Vec<Vec<&'a AudioFeatureVector>> = if n > 0 && rows.len() == n * rep {
            rows.chunks(rep).map(|block| block.iter().collect()).collect()
        } else if rows.len() == n {
            rows.iter().map(|row| vec![row; rep]).collect()
        } else if c > 0 && rows.len() == (n + c) * rep {
            rows.chunks(rep).map(|block| block.iter().collect()).collect()
        } else if c > 0 && rows.len() == n + c {
            rows.iter().map(|row| vec![row; rep]).collect()
        } else {
            return Err(shape_error());
        };

        let curated = (categories.len() > n).then(|| categories.split_off(n));
        Ok(LabelBlocks {
            categories,
            curated,
        })
    }
}

struct LabelBlocks<'a> {
    categories: Vec<Vec<&'a AudioFeatureVector>>,
    /// Present only when the table holds its own curated label rows.
    curated: Option<Vec<Vec<&'a AudioFeatureVector>>>,
}

/// Aligned input and target matrices, one row per training example.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    inputs: Array2<f32>,
    targets: Array2<f32>,
}

impl TrainingSet {
    /// Fails unless there are as many targets as inputs. Nothing is
    /// truncated or padded.
    pub fn new(
        inputs: &[CombinedEncoding],
        targets: &[NormalizedFeatureVector],
    ) -> Result<Self, TrainingError> {
        if inputs.len() != targets.len() {
            return Err(TrainingError::ShapeMismatch {
                inputs: inputs.len(),
                outputs: targets.len(),
            });
        }
        if inputs.is_empty() {
            return Err(TrainingError::Empty);
        }

        let mut x = Array2::zeros((inputs.len(), JOINT_SPACE_SIZE));
        let mut y = Array2::zeros((targets.len(), FEATURE_COUNT));
        for (row, (encoding, target)) in inputs.iter().zip(targets).enumerate() {
            x[[row, encoding.hot_index()]] = 1.0;
            for (col, &value) in target.as_slice().iter().enumerate() {
                y[[row, col]] = value as f32;
            }
        }

        Ok(Self {
            inputs: x,
            targets: y,
        })
    }

    /// Build the training rows for `plan` from a training table.
    pub fn assemble(dataset: &Dataset, plan: &TrainingPlan) -> Result<Self, TrainingError> {
        let blocks = plan.label_blocks(dataset.feature_rows())?;

        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        for (encoding, block) in plan.categories.iter().zip(&blocks.categories) {
            for row in block {
                inputs.push(*encoding);
                targets.push(row.normalize());
            }
        }

        if let Some(curated) = &blocks.curated {
            for (encoding, block) in plan.curated.iter().zip(curated) {
                for row in block {
                    inputs.push(*encoding);
                    targets.push(row.normalize());
                }
            }
            return Self::new(&inputs, &targets);
        }

        for encoding in &plan.curated {
            inputs.extend(std::iter::repeat(*encoding).take(plan.replication));
            if plan.curated_labels == CuratedLabels::Resample {
                let position = plan
                    .categories
                    .iter()
                    .position(|c| c == encoding)
                    .ok_or(TrainingError::CuratedWithoutCategory {
                        slot: encoding.hot_index(),
                    })?;
                targets.extend(blocks.categories[position].iter().map(|row| row.normalize()));
            }
        }

        Self::new(&inputs, &targets)
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }

    pub fn inputs(&self) -> &Array2<f32> {
        &self.inputs
    }

    pub fn targets(&self) -> &Array2<f32> {
        &self.targets
    }
}
