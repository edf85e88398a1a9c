//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! repositories and the auth primitives.

pub mod auth;
pub mod user;

pub use auth::{AuthError, AuthService, IssuedAccessToken, IssuedTokens};
pub use user::UserService;
