//! Core library for the DocManager client.
//!
//! Talks to the DocManager REST backend, keeps the access/refresh token
//! pair, restores sessions on start and decides which routes and menu
//! entries a user may see.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;

pub use api::{ApiClient, ApiError, AuthBackend};
pub use auth::{
    GuardDecision, GuardState, Notice, RefreshOutcome, Role, RouteGuard, SessionController,
    TokenKind, TokenStore,
};
pub use config::{Config, TokenStorage};
pub use navigation::{menu_for, MenuSection, MenuTarget, Route};
