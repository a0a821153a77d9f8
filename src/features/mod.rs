//! Audio feature domain knowledge and normalization.

mod table;
mod vector;

pub use table::{
    denormalize, normalize, AudioFeature, FeatureRange, FEATURE_COUNT, FEATURE_TABLE,
};
pub use vector::{AudioFeatureVector, FeatureCountMismatch, NormalizedFeatureVector};
