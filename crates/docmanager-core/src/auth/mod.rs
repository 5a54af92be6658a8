//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `TokenStore`: durable storage for the access and refresh tokens
//!   (file, OS keychain, or memory)
//! - `SessionController`: login, refresh and logout, and the published
//!   authenticated flag
//! - `RouteGuard`: redirects away from protected routes once the startup
//!   refresh attempt has resolved
//! - `Role`/`Capability`: what each account role may see

pub mod guard;
pub mod roles;
pub mod session;
pub mod tokens;

pub use guard::{GuardDecision, GuardState, Notice, RouteGuard};
pub use roles::{Capability, Role};
pub use session::{RefreshOutcome, SessionController, SessionState};
pub use tokens::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenKind, TokenStore};
