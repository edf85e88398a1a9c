//! Authentication primitives
//!
//! HS256 access tokens, argon2/bcrypt password hashing and the request guard
//! that resolves Bearer tokens.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenError};
pub use middleware::{auth_middleware, AuthUser};
pub use password::{PasswordError, PasswordService};
