//! Stub recommendation service
//!
//! Serves the token and recommendation endpoints on a random local port and
//! records every request it receives.

#![allow(dead_code)]

use super::constants::*;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chromatica::config::RecommendationSettings;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// How the stub answers recommendation queries.
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Return tracks on every query.
    Tracks,
    /// Return an empty track list this many times, then tracks.
    EmptyUntil(usize),
    /// Never return tracks.
    AlwaysEmpty,
    /// Fail every recommendation query with this status.
    ApiError(u16),
    /// Reject the token request.
    RejectToken,
}

struct StubState {
    behavior: StubBehavior,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
    queries: Mutex<Vec<Vec<(String, String)>>>,
    authorizations: Mutex<Vec<String>>,
}

pub struct StubSpotify {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,
    state: Arc<StubState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubSpotify {
    pub async fn spawn(behavior: StubBehavior) -> Self {
        let state = Arc::new(StubState {
            behavior,
            token_requests: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/token", post(token))
            .route("/v1/recommendations", get(recommendations))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Stub server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Settings pointing a client at this stub, with credentials set.
    pub fn settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            token_url: format!("{}/token", self.base_url),
            api_base_url: format!("{}/v1", self.base_url),
            client_id: Some(STUB_CLIENT_ID.to_string()),
            client_secret: Some(STUB_CLIENT_SECRET.to_string()),
            timeout_sec: 5,
            ..RecommendationSettings::default()
        }
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.token_requests.lock().unwrap().clone()
    }

    /// Query pairs of every recommendation request, in arrival order.
    pub fn queries(&self) -> Vec<Vec<(String, String)>> {
        self.state.queries.lock().unwrap().clone()
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.state.authorizations.lock().unwrap().clone()
    }
}

async fn token(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(form);
    if let StubBehavior::RejectToken = state.behavior {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }
    Json(json!({
        "access_token": STUB_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn recommendations(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.authorizations.lock().unwrap().push(authorization);

    let count = {
        let mut queries = state.queries.lock().unwrap();
        queries.push(query);
        queries.len()
    };

    let tracks = match state.behavior {
        StubBehavior::Tracks => true,
        StubBehavior::EmptyUntil(n) => count > n,
        StubBehavior::AlwaysEmpty => false,
        StubBehavior::ApiError(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, "stub failure").into_response();
        }
        StubBehavior::RejectToken => false,
    };

    if !tracks {
        return Json(json!({"tracks": [], "seeds": []})).into_response();
    }
    Json(json!({
        "tracks": [
            {
                "id": "track-1",
                "name": "Sunny Road",
                "artists": [{"name": "The Stubs"}],
                "preview_url": "https://p.example/track-1",
                "external_urls": {"spotify": "https://open.example/track/track-1"}
            },
            {
                "id": "track-2",
                "name": "Long Weekend",
                "artists": [{"name": "The Stubs"}, {"name": "Guest"}],
                "preview_url": null,
                "external_urls": {}
            }
        ],
        "seeds": []
    }))
    .into_response()
}
