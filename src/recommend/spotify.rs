//! Spotify Web API adapter: client-credentials token and recommendations.

use super::models::{RecommendationRequest, Track};
use super::{RecommendationError, RecommendationSource};
use crate::config::RecommendationSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tokens are refreshed this long before they actually expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: Client,
    token_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(settings: &RecommendationSettings) -> Result<Self, RecommendationError> {
        let (client_id, client_secret) = match (&settings.client_id, &settings.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                (id.clone(), secret.clone())
            }
            _ => {
                return Err(RecommendationError::Auth(
                    "client_id and client_secret are required".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .map_err(|e| RecommendationError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            token_url: settings.token_url.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    /// Cached access token, fetching a new one when missing or close to expiry.
    async fn access_token(&self) -> Result<String, RecommendationError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<CachedToken, RecommendationError> {
        debug!(url = %self.token_url, "Requesting access token");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(RecommendationError::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RecommendationError::Auth(format!("Malformed token response: {}", e)))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl RecommendationSource for SpotifyClient {
    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Track>, RecommendationError> {
        let token = self.access_token().await?;
        let url = format!("{}/recommendations", self.api_base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.forget_token().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendationError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: RecommendationsResponse = response.json().await.map_err(|e| {
            RecommendationError::InvalidResponse(format!(
                "Failed to parse recommendations response: {}",
                e
            ))
        })?;

        let tracks: Vec<Track> = body.tracks.into_iter().map(Track::from).collect();
        debug!(count = tracks.len(), "Received recommendations");
        Ok(tracks)
    }
}

// Spotify API types

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    preview_url: Option<String>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<SpotifyTrack> for Track {
    fn from(t: SpotifyTrack) -> Self {
        Track {
            id: t.id,
            name: t.name,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            preview_url: t.preview_url,
            external_url: t.external_urls.and_then(|u| u.spotify),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_credentials() {
        let settings = RecommendationSettings::default();
        assert!(matches!(
            SpotifyClient::new(&settings),
            Err(RecommendationError::Auth(_))
        ));

        let settings = RecommendationSettings {
            client_id: Some("id".to_string()),
            client_secret: Some(String::new()),
            ..RecommendationSettings::default()
        };
        assert!(SpotifyClient::new(&settings).is_err());
    }

    #[test]
    fn test_track_conversion() {
        let raw: RecommendationsResponse = serde_json::from_str(
            r#"{"tracks": [
                {"id": "1", "name": "One", "artists": [{"name": "A"}, {"name": "B"}],
                 "preview_url": "https://p/1", "external_urls": {"spotify": "https://s/1"}},
                {"id": "2", "name": "Two", "preview_url": null}
            ]}"#,
        )
        .unwrap();
        let tracks: Vec<Track> = raw.tracks.into_iter().map(Track::from).collect();

        assert_eq!(tracks[0].artists, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(tracks[0].preview_url.as_deref(), Some("https://p/1"));
        assert_eq!(tracks[0].external_url.as_deref(), Some("https://s/1"));
        assert!(tracks[1].artists.is_empty());
        assert!(tracks[1].preview_url.is_none());
        assert!(tracks[1].external_url.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let settings = RecommendationSettings {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            token_url: "http://127.0.0.1:9/token".to_string(),
            timeout_sec: 2,
            ..RecommendationSettings::default()
        };
        let client = SpotifyClient::new(&settings).unwrap();
        let request = RecommendationRequest {
            limit: 1,
            seed_genres: vec!["pop".to_string()],
            target: Default::default(),
            windows: Default::default(),
        };
        let err = client.recommend(&request).await.unwrap_err();
        assert!(matches!(
            err,
            RecommendationError::Connection(_) | RecommendationError::Timeout
        ));
    }
}
