//! Error types for the Placer application

use thiserror::Error;

/// Input validation failures for auth requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Email too long")]
    EmailTooLong,

    #[error("Username must be at most {max} characters")]
    UsernameTooLong { max: usize },

    #[error("Username contains invalid characters")]
    UsernameInvalid,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Password too long")]
    PasswordTooLong { max: usize },
}

impl ValidationError {
    /// Name of the request field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required(field) => field,
            ValidationError::InvalidEmail | ValidationError::EmailTooLong => "email",
            ValidationError::UsernameTooLong { .. } | ValidationError::UsernameInvalid => {
                "username"
            }
            ValidationError::PasswordTooShort { .. } | ValidationError::PasswordTooLong { .. } => {
                "password"
            }
        }
    }
}
