//! Data models for DocManager account entities.
//!
//! - `User`: the signed-in account as returned by `accounts/users/me/`
//! - Request/response bodies for the JWT and account endpoints

pub mod account;
pub mod user;

pub use account::{
    AccessToken, Activation, Credentials, PasswordResetConfirm, PasswordResetRequest,
    RefreshRequest, Registration, TokenPair,
};
pub use user::User;
