//! IAM Error Types
//!
//! The policy-level failure taxonomy. Raw library errors (argon2,
//! jsonwebtoken, base64, serde_json) are caught where they occur and
//! re-raised as one of these variants; they never cross the policy
//! boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// IAM-specific result type alias
pub type IamResult<T> = Result<T, IamError>;

/// IAM-specific error variants
#[derive(Debug, Error)]
pub enum IamError {
    /// Bad email or password. Always reported generically, after the
    /// randomized delay, so "no such user" and "wrong password" are
    /// indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Account exists but is disabled
    #[error("inactive_user")]
    InactiveUser,

    /// Access token failed signature, structure or expiry checks
    #[error("invalid_token")]
    InvalidToken,

    /// Token did not resolve to a live user/session
    #[error("invalid_user")]
    InvalidUser,

    /// The stored refresh record is past its expiry
    #[error("expired_token")]
    ExpiredToken,

    /// Stateless refresh envelope failed signature or expiry checks.
    /// Normalized to [`IamError::InvalidUser`] before reaching callers.
    #[error("invalid_refresh_token")]
    InvalidRefreshToken,

    /// Principal check failed
    #[error("Insufficient permissions")]
    PermissionDenied,

    /// Password hashing pool failure
    #[error("Hashing error: {0}")]
    Hashing(#[from] platform::password::PasswordHashError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IamError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            IamError::InvalidCredentials => StatusCode::BAD_REQUEST,
            IamError::InactiveUser => StatusCode::PRECONDITION_FAILED,
            IamError::InvalidToken
            | IamError::InvalidUser
            | IamError::InvalidRefreshToken
            | IamError::PermissionDenied => StatusCode::FORBIDDEN,
            IamError::ExpiredToken => StatusCode::EXPECTATION_FAILED,
            IamError::Hashing(_) | IamError::Database(_) | IamError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IamError::InvalidCredentials => ErrorKind::BadRequest,
            IamError::InactiveUser => ErrorKind::PreconditionFailed,
            IamError::InvalidToken
            | IamError::InvalidUser
            | IamError::InvalidRefreshToken
            | IamError::PermissionDenied => ErrorKind::Forbidden,
            IamError::ExpiredToken => ErrorKind::ExpectationFailed,
            IamError::Hashing(_) | IamError::Database(_) | IamError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IamError::Database(e) => {
                tracing::error!(error = %e, "IAM database error");
            }
            IamError::Hashing(e) => {
                tracing::error!(error = %e, "Password hashing failure");
            }
            IamError::Internal(msg) => {
                tracing::error!(message = %msg, "IAM internal error");
            }
            IamError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            _ => {
                tracing::debug!(error = %self, "IAM error");
            }
        }
    }
}

impl IntoResponse for IamError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_follows_taxonomy() {
        assert_eq!(
            IamError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IamError::InactiveUser.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(IamError::InvalidUser.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            IamError::ExpiredToken.status_code(),
            StatusCode::EXPECTATION_FAILED
        );
        assert_eq!(
            IamError::PermissionDenied.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_generic_credential_message() {
        // The message must not disclose which half of the credential failed.
        let msg = IamError::InvalidCredentials.to_string();
        assert_eq!(msg, "Incorrect username or password");
    }
}
