use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Callback state did not match the pending attempt, or no attempt was
    /// pending. Deliberately carries no detail.
    #[error("state validation failed")]
    CsrfValidation,

    #[error("token exchange rejected (status {status}): {}", code.as_deref().unwrap_or("unknown_error"))]
    TokenExchange {
        status: u16,
        code: Option<String>,
        description: Option<String>,
    },

    /// The refresh token was rejected outright. The session is dead and a
    /// new authorization is required.
    #[error("token refresh rejected (status {status}): {}", code.as_deref().unwrap_or("unknown_error"))]
    RefreshRejected {
        status: u16,
        code: Option<String>,
        description: Option<String>,
    },

    #[error("not authenticated")]
    Authentication,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("API error (status {status})")]
    Api { status: u16, body: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_refresh_displays_the_oauth_error_code() {
        let err = Error::RefreshRejected {
            status: 400,
            code: Some("invalid_grant".to_string()),
            description: Some("Refresh token revoked".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("invalid_grant"));
    }

    #[test]
    fn missing_error_code_falls_back_to_a_placeholder() {
        let err = Error::TokenExchange {
            status: 500,
            code: None,
            description: None,
        };
        assert!(err.to_string().contains("unknown_error"));
    }
}
