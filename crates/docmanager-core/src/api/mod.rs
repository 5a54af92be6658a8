//! REST API client module for the DocManager backend.
//!
//! This module provides the `ApiClient` for the JWT login/refresh
//! exchanges and the account endpoints, plus the `AuthBackend` trait the
//! session controller talks through.
//!
//! Authenticated calls carry `Authorization: Bearer <access>`.

pub mod client;
pub mod error;

use async_trait::async_trait;

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;

use crate::models::{Credentials, TokenPair};

/// The token endpoints the session controller depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST accounts/jwt/create/`
    async fn create_token(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;

    /// `POST accounts/jwt/refresh/`, returning the new access token
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError>;
}
