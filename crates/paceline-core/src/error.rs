use paceline_util::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed identifier in a request path or realtime command.
    #[error("invalid id")]
    InvalidId,
    #[error("{0}")]
    Validation(String),
    /// Also covers resources the caller is not allowed to see; their
    /// existence is not disclosed.
    #[error("not found")]
    NotFound,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("database error: {0}")]
    Database(#[from] paceline_db::DbError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
