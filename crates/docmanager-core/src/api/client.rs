//! API client for communicating with the DocManager REST backend.
//!
//! This module provides the `ApiClient` struct for the JWT exchanges and
//! the account endpoints. Every method returns a typed `ApiError` so the
//! session layer can tell a rejected credential from an unreachable server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AccessToken, Activation, Credentials, PasswordResetConfirm, PasswordResetRequest,
    RefreshRequest, Registration, TokenPair, User,
};

use super::{ApiError, AuthBackend};

// ============================================================================
// Constants
// ============================================================================

/// Path prefix shared by every backend endpoint
const API_PREFIX: &str = "api/v1";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the DocManager backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `http://localhost:8000/`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }

    fn transport_error(err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::NetworkError(err)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            debug!(url = url, error = %e, "Request failed before a response arrived");
            Self::transport_error(e)
        })?;
        Self::check_response(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, ApiError> {
        let body = response.text().await.map_err(Self::transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = Self::send(self.client.post(&url).json(body), &url).await?;
        Self::parse(response, &url).await
    }

    /// POST where the response body carries nothing we need.
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        Self::send(self.client.post(&url).json(body), &url).await?;
        Ok(())
    }

    async fn get_authorized<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let request = self
                .client
                .get(&url)
                .header(header::AUTHORIZATION, format!("Bearer {}", access_token));

            match Self::send(request, &url).await {
                Ok(response) => return Self::parse(response, &url).await,
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ===== JWT Exchanges =====

    /// Exchange email and password for an access/refresh token pair
    pub async fn create_token(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let pair: TokenPair = self.post("accounts/jwt/create/", credentials).await?;
        if pair.access.is_empty() {
            return Err(ApiError::InvalidResponse("Empty access token in login response".to_string()));
        }
        Ok(pair)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let token: AccessToken = self
            .post("accounts/jwt/refresh/", &RefreshRequest { refresh: refresh_token })
            .await?;
        if token.access.is_empty() {
            return Err(ApiError::InvalidResponse("Empty access token in refresh response".to_string()));
        }
        Ok(token.access)
    }

    // ===== Account Methods =====

    /// Fetch the account the access token belongs to
    pub async fn current_user(&self, access_token: &str) -> Result<User, ApiError> {
        self.get_authorized("accounts/users/me/", access_token).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        self.post_unit("accounts/users/", registration).await
    }

    pub async fn activate(&self, activation: &Activation) -> Result<(), ApiError> {
        self.post_unit("accounts/users/activation/", activation).await
    }

    /// Ask the backend to email a password reset link
    pub async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        let body = PasswordResetRequest { email: email.to_string() };
        self.post_unit("accounts/users/reset_password/", &body).await
    }

    pub async fn reset_password_confirm(&self, confirm: &PasswordResetConfirm) -> Result<(), ApiError> {
        self.post_unit("accounts/users/reset_password_confirm/", confirm).await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn create_token(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        ApiClient::create_token(self, credentials).await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        ApiClient::refresh_access_token(self, refresh_token).await
    }
}
