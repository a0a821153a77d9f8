//! The twelve audio features and their authoritative value ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const FEATURE_COUNT: usize = 12;

/// Audio features, in the fixed order used by datasets, the model output
/// and the recommendation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFeature {
    Acousticness,
    Danceability,
    Energy,
    Instrumentalness,
    Key,
    Liveness,
    Loudness,
    Mode,
    Speechiness,
    Tempo,
    TimeSignature,
    Valence,
}

/// Natural domain of one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub feature: AudioFeature,
    pub min: f64,
    pub max: f64,
}

pub const FEATURE_TABLE: [FeatureRange; FEATURE_COUNT] = [
    FeatureRange { feature: AudioFeature::Acousticness, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Danceability, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Energy, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Instrumentalness, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Key, min: -1.0, max: 11.0 },
    FeatureRange { feature: AudioFeature::Liveness, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Loudness, min: -60.0, max: 0.0 },
    FeatureRange { feature: AudioFeature::Mode, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Speechiness, min: 0.0, max: 1.0 },
    FeatureRange { feature: AudioFeature::Tempo, min: 35.0, max: 256.0 },
    FeatureRange { feature: AudioFeature::TimeSignature, min: 3.0, max: 7.0 },
    FeatureRange { feature: AudioFeature::Valence, min: 0.0, max: 1.0 },
];

impl AudioFeature {
    pub const ALL: [AudioFeature; FEATURE_COUNT] = [
        AudioFeature::Acousticness,
        AudioFeature::Danceability,
        AudioFeature::Energy,
        AudioFeature::Instrumentalness,
        AudioFeature::Key,
        AudioFeature::Liveness,
        AudioFeature::Loudness,
        AudioFeature::Mode,
        AudioFeature::Speechiness,
        AudioFeature::Tempo,
        AudioFeature::TimeSignature,
        AudioFeature::Valence,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name, as used in dataset headers and query parameters.
    pub fn name(self) -> &'static str {
        match self {
            AudioFeature::Acousticness => "acousticness",
            AudioFeature::Danceability => "danceability",
            AudioFeature::Energy => "energy",
            AudioFeature::Instrumentalness => "instrumentalness",
            AudioFeature::Key => "key",
            AudioFeature::Liveness => "liveness",
            AudioFeature::Loudness => "loudness",
            AudioFeature::Mode => "mode",
            AudioFeature::Speechiness => "speechiness",
            AudioFeature::Tempo => "tempo",
            AudioFeature::TimeSignature => "time_signature",
            AudioFeature::Valence => "valence",
        }
    }

    pub fn range(self) -> FeatureRange {
        FEATURE_TABLE[self.index()]
    }

    /// Features that only take whole values.
    pub fn is_discrete(self) -> bool {
        matches!(
            self,
            AudioFeature::Key | AudioFeature::Mode | AudioFeature::TimeSignature
        )
    }
}

impl fmt::Display for AudioFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(value - min) / (max - min)`. Callers guarantee `min < max`.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    (value - min) / (max - min)
}

/// `value * (max - min) + min`. Callers guarantee `min < max`.
pub fn denormalize(value: f64, min: f64, max: f64) -> f64 {
    value * (max - min) + min
}
