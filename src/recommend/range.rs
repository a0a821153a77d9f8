//! Per-feature query windows and their geometric widening.

use crate::config::RecommendationSettings;
use crate::features::{AudioFeature, AudioFeatureVector, FEATURE_COUNT};
use serde::Serialize;

const TEMPO_HALF_WIDTH: f64 = 10.0;
const CONTINUOUS_HALF_WIDTH: f64 = 0.05;
const KEY_STEP: f64 = 1.0;

/// Closed `[min, max]` range for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeatureWindow {
    pub min: f64,
    pub max: f64,
}

impl FeatureWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One window per feature, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QueryWindows(pub [FeatureWindow; FEATURE_COUNT]);

impl QueryWindows {
    pub fn get(&self, feature: AudioFeature) -> FeatureWindow {
        self.0[feature.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AudioFeature, FeatureWindow)> + '_ {
        AudioFeature::ALL.iter().copied().zip(self.0.iter().copied())
    }
}

/// Two-decimal rounding applied to every window bound.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Windows around `target` before any widening. Discrete features get a
/// zero-width window, tempo ±10 and everything else ±0.05.
pub fn base_windows(target: &AudioFeatureVector) -> QueryWindows {
    let mut windows = [FeatureWindow::default(); FEATURE_COUNT];
    for (feature, value) in target.iter() {
        let half = if feature.is_discrete() {
            0.0
        } else if feature == AudioFeature::Tempo {
            TEMPO_HALF_WIDTH
        } else {
            CONTINUOUS_HALF_WIDTH
        };
        windows[feature.index()] = FeatureWindow::new(round2(value - half), round2(value + half));
    }
    QueryWindows(windows)
}

/// How windows widen when a query comes back empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Growth of each window's distance from the target per attempt.
    pub expansion_factor: f64,
    /// Growth of the downward loudness offset per attempt.
    pub loudness_lower_factor: f64,
    /// Growth of the upward loudness offset per attempt.
    pub loudness_upper_factor: f64,
}

impl ExpansionPolicy {
    pub fn new(config: &RecommendationSettings) -> Self {
        Self {
            max_attempts: config.max_attempts,
            expansion_factor: config.expansion_factor,
            loudness_lower_factor: config.loudness_lower_factor,
            loudness_upper_factor: config.loudness_upper_factor,
        }
    }

    /// Whether another attempt may follow the 1-based `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Windows for the 1-based `attempt`.
    ///
    /// - key: the base window ± 1 on every attempt
    /// - loudness: the base bounds move down by `loudness_lower_factor^(attempt-1)`
    ///   and up by `loudness_upper_factor^(attempt-1)`
    /// - everything else: the distance of each base bound from the target
    ///   is scaled by `expansion_factor^(attempt-1)`, so zero-width windows
    ///   stay zero-width
    pub fn windows_for_attempt(&self, target: &AudioFeatureVector, attempt: u32) -> QueryWindows {
        let base = base_windows(target);
        let exponent = attempt.saturating_sub(1) as i32;
        let scale = self.expansion_factor.powi(exponent);

        let mut windows = base.0;
        for (feature, window) in base.iter() {
            let middle = target.get(feature);
            windows[feature.index()] = match feature {
                AudioFeature::Key => FeatureWindow::new(window.min - KEY_STEP, window.max + KEY_STEP),
                AudioFeature::Loudness => FeatureWindow::new(
                    round2(window.min - self.loudness_lower_factor.powi(exponent)),
                    round2(window.max + self.loudness_upper_factor.powi(exponent)),
                ),
                _ => FeatureWindow::new(
                    round2(middle - (middle - window.min).abs() * scale),
                    round2(middle + (middle - window.max).abs() * scale),
                ),
            };
        }
        QueryWindows(windows)
    }
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            expansion_factor: 1.5,
            loudness_lower_factor: 1.8,
            loudness_upper_factor: 2.7,
        }
    }
}
