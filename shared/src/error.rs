use lambda_http::http::StatusCode;
use thiserror::Error;

/// Every failure a request can end in. Each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, invalid enum value, duplicate record.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    InvalidInvite(String),

    /// Identity provider rejected the credentials.
    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::InvalidInvite(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Upload(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Pastor").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Store("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(ApiError::NotFound("Church").to_string(), "Church not found");
        assert_eq!(
            ApiError::Store("timeout".into()).to_string(),
            "Store error: timeout"
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ApiError::from(json_err)
            .to_string()
            .starts_with("Invalid request body"));
    }
}
