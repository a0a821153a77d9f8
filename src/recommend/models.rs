use super::range::QueryWindows;
use crate::features::AudioFeatureVector;
use serde::{Deserialize, Serialize};

/// A recommended track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
}

/// One parameterized recommendation query.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub limit: u32,
    pub seed_genres: Vec<String>,
    pub target: AudioFeatureVector,
    pub windows: QueryWindows,
}

impl RecommendationRequest {
    /// Query string pairs: `limit`, `seed_genres`, then `target_`, `min_`
    /// and `max_` for every feature.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("seed_genres".to_string(), self.seed_genres.join(",")),
        ];
        for ((feature, target), (_, window)) in self.target.iter().zip(self.windows.iter()) {
            let name = feature.name();
            pairs.push((format!("target_{}", name), target.to_string()));
            pairs.push((format!("min_{}", name), window.min.to_string()));
            pairs.push((format!("max_{}", name), window.max.to_string()));
        }
        pairs
    }
}
