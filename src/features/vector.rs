use super::table::{denormalize, normalize, AudioFeature, FEATURE_COUNT, FEATURE_TABLE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Expected {FEATURE_COUNT} feature values, got {0}")]
pub struct FeatureCountMismatch(pub usize);

/// Twelve audio features in their natural domain ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioFeatureVector(pub [f64; FEATURE_COUNT]);

/// Twelve audio features rescaled to [0, 1] by [`FEATURE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedFeatureVector(pub [f64; FEATURE_COUNT]);

macro_rules! feature_vector_accessors {
    ($name:ident) => {
        impl $name {
            pub fn from_slice(values: &[f64]) -> Result<Self, FeatureCountMismatch> {
                let array: [f64; FEATURE_COUNT] = values
                    .try_into()
                    .map_err(|_| FeatureCountMismatch(values.len()))?;
                Ok(Self(array))
            }

            pub fn get(&self, feature: AudioFeature) -> f64 {
                self.0[feature.index()]
            }

            pub fn set(&mut self, feature: AudioFeature, value: f64) {
                self.0[feature.index()] = value;
            }

            /// `(feature, value)` pairs in table order.
            pub fn iter(&self) -> impl Iterator<Item = (AudioFeature, f64)> + '_ {
                AudioFeature::ALL.iter().copied().zip(self.0.iter().copied())
            }

            pub fn as_slice(&self) -> &[f64] {
                &self.0
            }
        }
    };
}

feature_vector_accessors!(AudioFeatureVector);
feature_vector_accessors!(NormalizedFeatureVector);

impl AudioFeatureVector {
    pub fn normalize(&self) -> NormalizedFeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, range) in FEATURE_TABLE.iter().enumerate() {
            out[i] = normalize(self.0[i], range.min, range.max);
        }
        NormalizedFeatureVector(out)
    }
}

impl NormalizedFeatureVector {
    pub fn denormalize(&self) -> AudioFeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, range) in FEATURE_TABLE.iter().enumerate() {
            out[i] = denormalize(self.0[i], range.min, range.max);
        }
        AudioFeatureVector(out)
    }
}

impl fmt::Display for AudioFeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (feature, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{:<17} {:>9.3}", feature.name(), value)?;
        }
        Ok(())
    }
}
