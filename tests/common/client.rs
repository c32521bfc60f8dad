//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all music endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use chrono::{Duration as ChronoDuration, Utc};
use music_catalog_server::auth::TokenClaims;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

/// How the client presents its token
enum Credentials {
    None,
    Bearer(String),
    Cookie(String),
}

/// HTTP test client carrying a session token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    credentials: Credentials,
}

/// Encodes a token for `email` expiring `valid_for` from now (negative for expired tokens).
pub fn make_token(email: &str, valid_for: ChronoDuration) -> String {
    let username = email.split('@').next().unwrap_or(email);
    TokenClaims::new(email, username, Utc::now() + valid_for).encode()
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            credentials: Credentials::None,
        }
    }

    /// Creates a client sending a valid bearer token for the main test principal
    pub fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER_EMAIL)
    }

    /// Creates a client sending a valid bearer token for `email`
    pub fn authenticated_as(base_url: String, email: &str) -> Self {
        Self::with_bearer_token(base_url, make_token(email, ChronoDuration::hours(1)))
    }

    pub fn with_bearer_token(base_url: String, token: String) -> Self {
        Self {
            credentials: Credentials::Bearer(token),
            ..Self::new(base_url)
        }
    }

    /// Sends the token in the session cookie instead of the Authorization header
    pub fn with_cookie_token(base_url: String, token: String) -> Self {
        Self {
            credentials: Credentials::Cookie(token),
            ..Self::new(base_url)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::Bearer(token) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            Credentials::Cookie(token) => {
                request.header("Cookie", format!("session_token={}", token))
            }
        }
    }

    // ========================================================================
    // Public Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Music Endpoints
    // ========================================================================

    /// GET /v1/music/search?<params>
    pub async fn search(&self, params: &[(&str, &str)]) -> Response {
        let request = self
            .client
            .get(format!("{}/v1/music/search", self.base_url))
            .query(params);
        self.authorize(request)
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /v1/music/subscriptions
    pub async fn list_subscriptions(&self) -> Response {
        let request = self
            .client
            .get(format!("{}/v1/music/subscriptions", self.base_url));
        self.authorize(request)
            .send()
            .await
            .expect("List subscriptions request failed")
    }

    /// POST /v1/music/subscriptions/{id}
    pub async fn subscribe(&self, item_id: &str) -> Response {
        let request = self
            .client
            .post(format!("{}/v1/music/subscriptions/{}", self.base_url, item_id));
        self.authorize(request)
            .send()
            .await
            .expect("Subscribe request failed")
    }

    /// DELETE /v1/music/subscriptions/{id}
    pub async fn unsubscribe(&self, item_id: &str) -> Response {
        let request = self
            .client
            .delete(format!("{}/v1/music/subscriptions/{}", self.base_url, item_id));
        self.authorize(request)
            .send()
            .await
            .expect("Unsubscribe request failed")
    }
}
