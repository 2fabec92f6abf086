//! Authentication and token lifecycle error types.
//!
//! Every protocol failure is folded into the fixed OAuth 2.0 error
//! vocabulary through [`AuthError::oauth_error_code`], so handlers never
//! leak internal failures as unstructured responses.

use std::fmt;

use axum::http::StatusCode;

/// Errors that can occur during token issuance, revocation and validation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The client is unknown, inactive, or failed authentication.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, consumed
    /// or does not match the request.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The authenticated client may not use the requested grant type.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// An already consumed authorization code was presented again.
    ///
    /// Surfaces to clients as `invalid_grant`.
    #[error("Authorization code replay detected for client {client_id}")]
    ReplayDetected {
        /// Client the replayed code was issued to.
        client_id: String,
    },

    /// Signature, issuer or expiry check failed on a presented token.
    #[error("Token verification failed: {message}")]
    VerificationError {
        /// Description of the verification failure.
        message: String,
    },

    /// A stored secret could not be decrypted.
    #[error("Decryption failed: {message}")]
    DecryptionError {
        /// Description of the decryption failure.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `ReplayDetected` error.
    #[must_use]
    pub fn replay_detected(client_id: impl Into<String>) -> Self {
        Self::ReplayDetected {
            client_id: client_id.into(),
        }
    }

    /// Creates a new `VerificationError`.
    #[must_use]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::VerificationError {
            message: message.into(),
        }
    }

    /// Creates a new `DecryptionError`.
    #[must_use]
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::DecryptionError {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidGrant { .. }
                | Self::UnauthorizedClient { .. }
                | Self::UnsupportedGrantType { .. }
                | Self::ReplayDetected { .. }
                | Self::VerificationError { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns `true` for failures that should be logged as security events.
    #[must_use]
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            Self::ReplayDetected { .. } | Self::DecryptionError { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } | Self::UnsupportedGrantType { .. } => {
                ErrorCategory::Validation
            }
            Self::InvalidClient { .. } | Self::UnauthorizedClient { .. } => {
                ErrorCategory::Authentication
            }
            Self::InvalidGrant { .. } | Self::VerificationError { .. } => ErrorCategory::Token,
            Self::ReplayDetected { .. } | Self::DecryptionError { .. } => ErrorCategory::Security,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::ReplayDetected { .. } => "invalid_grant",
            Self::VerificationError { .. } => "invalid_token",
            Self::DecryptionError { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status used when this error is returned from the
    /// token endpoint.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidClient { .. } | Self::VerificationError { .. } => {
                StatusCode::UNAUTHORIZED
            }
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the description sent to clients.
    ///
    /// Server-side failures are collapsed to a generic message so internal
    /// details never reach the wire.
    #[must_use]
    pub fn public_description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::UnauthorizedClient { message }
            | Self::VerificationError { message } => message.clone(),
            Self::UnsupportedGrantType { grant_type } => {
                format!("Grant type '{grant_type}' is not supported")
            }
            Self::ReplayDetected { .. } => "Authorization code has already been used".to_string(),
            _ => "The server encountered an unexpected error".to_string(),
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client identity verification errors.
    Authentication,
    /// Grant and token validation errors.
    Token,
    /// Request validation errors.
    Validation,
    /// Replay and tampering signals.
    Security,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Security => write!(f, "security"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::invalid_grant("expired authorization code");
        assert_eq!(err.to_string(), "Invalid grant: expired authorization code");

        let err = AuthError::replay_detected("dashboard");
        assert_eq!(
            err.to_string(),
            "Authorization code replay detected for client dashboard"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_client("test");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthError::storage("store down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());

        assert!(AuthError::replay_detected("c").is_security_event());
        assert!(AuthError::decryption("bad tag").is_security_event());
        assert!(!AuthError::invalid_grant("x").is_security_event());
    }

    #[test]
    fn test_replay_surfaces_as_invalid_grant() {
        let err = AuthError::replay_detected("client-1");
        assert_eq!(err.oauth_error_code(), "invalid_grant");
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.category(), ErrorCategory::Security);
        assert!(!err.public_description().contains("client-1"));
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_request("test").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::invalid_client("test").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::invalid_grant("test").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            AuthError::decryption("test").oauth_error_code(),
            "server_error"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(
            AuthError::invalid_client("x").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::invalid_grant("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::internal("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AuthError::storage("connection to 10.0.0.3 refused");
        assert!(!err.public_description().contains("10.0.0.3"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Security.to_string(), "security");
        assert_eq!(ErrorCategory::Token.to_string(), "token");
    }
}
