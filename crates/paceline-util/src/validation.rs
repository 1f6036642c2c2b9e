use thiserror::Error;

/// Hard limit on message text length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("value is empty")]
    Empty,
    #[error("value is too long (max {max}, got {got})")]
    TooLong { max: usize, got: usize },
    #[error("invalid format")]
    InvalidFormat,
}

/// Validate and normalize message text: trim surrounding whitespace, reject
/// empty results and anything over [`MAX_MESSAGE_CHARS`] characters.
pub fn validate_message_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong {
            max: MAX_MESSAGE_CHARS,
            got: chars,
        });
    }
    Ok(trimmed)
}

pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    let len = name.len();
    if len < 2 {
        return Err(ValidationError::Empty);
    }
    if len > 32 {
        return Err(ValidationError::TooLong { max: 32, got: len });
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 255 {
        return Err(ValidationError::TooLong {
            max: 255,
            got: email.len(),
        });
    }
    let parts: Vec<&str> = email.splitn(2, '@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ValidationError::InvalidFormat);
    }
    if !parts[1].contains('.') {
        return Err(ValidationError::InvalidFormat);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::Empty);
    }
    Ok(())
}
