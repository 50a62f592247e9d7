//! Session token algorithm validation.
//!
//! This module provides security checks for token algorithms, ensuring only
//! approved asymmetric algorithms are accepted.
//!
//! # Security
//!
//! These validators implement security best practices:
//! - Strict algorithm checks to prevent algorithm substitution attacks
//! - Only asymmetric algorithms are allowed
//! - Symmetric algorithms and "none" are always rejected

use crate::error::AuthError;

/// Forbidden token algorithms that are never accepted for security reasons.
///
/// These algorithms are blocked because:
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
///
/// Only EdDSA (Ed25519) is currently supported.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted token algorithms.
///
/// Currently only EdDSA (Ed25519) is supported end-to-end: session tokens
/// are issued and verified exclusively with the process-wide Ed25519 key
/// in [`crate::session::SessionKey`].
///
/// Per RFC 8725 Section 3.1, validators must reject algorithms they do not
/// fully implement — listing others here without verification support would
/// produce confusing errors at the signature verification stage.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["EdDSA"];

/// Validate a token algorithm against security policies.
///
/// This function enforces strict algorithm security per RFC 8725:
/// - ALWAYS rejects symmetric algorithms (HS256, HS384, HS512)
/// - ALWAYS rejects "none" algorithm
/// - Only accepts EdDSA (Ed25519)
///
/// # Arguments
///
/// * `alg` - The algorithm from the token header
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if:
/// - Algorithm is symmetric (HS256, HS384, HS512)
/// - Algorithm is "none"
/// - Algorithm is not in [`ACCEPTED_ALGORITHMS`]
///
/// # Examples
///
/// ```
/// use aulario_authn::validation::validate_algorithm;
///
/// // EdDSA is accepted
/// assert!(validate_algorithm("EdDSA").is_ok());
///
/// // Symmetric algorithm rejected
/// assert!(validate_algorithm("HS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    // Check against forbidden algorithms
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not allowed for security reasons",
            alg
        )));
    }

    // Check if in accepted list
    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not in accepted list (only EdDSA is supported)",
            alg
        )));
    }

    Ok(())
}
