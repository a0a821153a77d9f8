//! Turning predicted audio features into track recommendations.

mod models;
mod query;
mod range;
mod spotify;

pub use models::{RecommendationRequest, Track};
pub use query::{QueryOutcome, RangeExpansionQuery};
pub use range::{base_windows, round2, ExpansionPolicy, FeatureWindow, QueryWindows};
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for RecommendationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RecommendationError::Timeout
        } else {
            RecommendationError::Connection(e.to_string())
        }
    }
}

/// A service answering parameterized recommendation queries.
///
/// An empty result is `Ok(vec![])`, not an error.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Track>, RecommendationError>;
}
