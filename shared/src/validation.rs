//! Input validation functions
//!
//! This module provides validation utilities for registration and login input.
//! Email syntax checks delegate to the `validator` crate.

use crate::errors::ValidationError;
use validator::ValidateEmail;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Validate email format
///
/// Emails are compared case-sensitively by the store, so no normalization
/// happens here.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::EmailTooLong);
    }
    let has_dotted_domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain.contains('.'))
        .unwrap_or(false);
    if !has_dotted_domain || !email.validate_email() {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Required("username"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::UsernameTooLong {
            max: MAX_USERNAME_LEN,
        });
    }
    if username.chars().any(char::is_control) {
        return Err(ValidationError::UsernameInvalid);
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("password"));
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong {
            max: MAX_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Validate a full registration payload, reporting the first failing field
pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_username(username)?;
    validate_password(password)
}
