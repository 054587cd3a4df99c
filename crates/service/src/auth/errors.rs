use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    Unauthorized,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token error: {0}")]
    TokenError(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Unauthorized => 1004,
            AuthError::MissingToken => 1005,
            AuthError::InvalidToken(_) => 1006,
            AuthError::TokenError(_) => 1102,
        }
    }
}
