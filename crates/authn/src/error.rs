//! Authentication error types.
//!
//! This module defines errors that can occur during credential verification
//! and session token handling.
//!
//! # Enumeration Resistance
//!
//! [`AuthError::PrincipalNotFound`] and [`AuthError::InvalidCredentials`]
//! are distinct variants so the service layer can log and count them
//! separately, but they render the same message. A caller probing for
//! account names learns nothing from the response body; only internal
//! telemetry can tell the two apart.

use thiserror::Error;

use aulario_directory::DirectoryError;

/// Authentication and session token errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Malformed token - cannot be decoded.
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token not yet valid (nbf claim in future).
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Algorithm not in allowed list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Required claim is missing.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// The `sub` claim is not a well-formed `kind:id` subject.
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// No principal matches the presented name or token subject.
    ///
    /// Renders identically to [`InvalidCredentials`](Self::InvalidCredentials)
    /// so responses cannot be used to enumerate account names.
    #[error("Invalid credentials")]
    PrincipalNotFound,

    /// The presented secret does not match the stored one.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Secret hashing or hash parsing failed.
    ///
    /// This is an internal fault (corrupt stored hash, parameter error),
    /// never a wrong-password signal.
    #[error("Secret hashing error: {0}")]
    SecretHash(String),

    /// The input failed validation before any credential check.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The session signing key could not be parsed.
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    /// Directory lookup or write failed.
    ///
    /// Wraps the original [`DirectoryError`] to preserve the full error
    /// source chain for debugging and structured logging.
    #[error("Directory error")]
    Directory(
        /// The underlying directory error.
        #[from]
        #[source]
        DirectoryError,
    ),
}

impl AuthError {
    /// Creates a new `InvalidTokenFormat` error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat(message.into())
    }

    /// Creates a new `TokenExpired` error.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Creates a new `TokenNotYetValid` error.
    #[must_use]
    pub fn token_not_yet_valid() -> Self {
        Self::TokenNotYetValid
    }

    /// Creates a new `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim(claim.into())
    }

    /// Creates a new `InvalidSubject` error.
    #[must_use]
    pub fn invalid_subject(message: impl Into<String>) -> Self {
        Self::InvalidSubject(message.into())
    }

    /// Creates a new `SecretHash` error.
    #[must_use]
    pub fn secret_hash(message: impl Into<String>) -> Self {
        Self::SecretHash(message.into())
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new `InvalidSessionKey` error.
    #[must_use]
    pub fn invalid_session_key(message: impl Into<String>) -> Self {
        Self::InvalidSessionKey(message.into())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                AuthError::InvalidTokenFormat("Invalid token structure".into())
            },
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm => {
                AuthError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            _ => AuthError::InvalidTokenFormat(format!("Token error: {}", err)),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_token_format("test");
        assert_eq!(err.to_string(), "Invalid token format: test");

        let err = AuthError::token_expired();
        assert_eq!(err.to_string(), "Token expired");

        let err = AuthError::missing_claim("sub");
        assert_eq!(err.to_string(), "Missing claim: sub");
    }

    #[test]
    fn test_not_found_and_bad_secret_render_identically() {
        // The two outcomes must be indistinguishable to a caller.
        assert_eq!(
            AuthError::PrincipalNotFound.to_string(),
            AuthError::InvalidCredentials.to_string()
        );
    }

    #[test]
    fn test_error_from_jsonwebtoken() {
        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        let auth_err: AuthError = jwt_err.into();
        assert!(matches!(auth_err, AuthError::TokenExpired));

        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        let auth_err: AuthError = jwt_err.into();
        assert!(matches!(auth_err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_directory_error_source_chain() {
        use std::error::Error;

        let dir_err = DirectoryError::validation("bad name");
        let err: AuthError = dir_err.into();
        let source = err.source().expect("directory source must be preserved");
        assert_eq!(source.to_string(), "Validation failed: bad name");
    }
}
