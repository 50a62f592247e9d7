//! # Aulario Authentication
//!
//! Credential verification and session tokens for the Aulario backend.
//!
//! This crate provides:
//! - **Credential verification**: Policy-dispatched secret checks (Argon2id for students,
//!   constant-time plaintext comparison for teachers and admins)
//! - **Session tokens**: Stateless EdDSA-signed bearer tokens
//! - **Algorithm validation**: Security checks for token algorithms
//! - **The auth service**: One front door for login, registration, and token validation
//!
//! ## Security Properties
//!
//! - Only EdDSA is accepted for tokens; `none` and symmetric algorithms are explicitly rejected
//! - Unknown names and wrong secrets produce indistinguishable responses
//! - Token validation always re-resolves the principal, so deleted accounts lose all sessions
//!
//! ## Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use aulario_authn::{AuthService, SessionKey};
//! use aulario_directory::{PrincipalDirectory, PrincipalKind};
//! use aulario_storage::MemoryBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = PrincipalDirectory::new(MemoryBackend::new());
//! let service =
//!     AuthService::new(directory, Arc::new(SessionKey::generate()), Duration::from_secs(86_400));
//!
//! let outcome = service.login(PrincipalKind::Teacher, "Berta", "secret").await?;
//! let authed = service.authenticate(&outcome.token).await?;
//! println!("Hello, {}", authed.principal.name);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Session configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Secret hashing and verification.
pub mod password;
/// The authentication service.
pub mod service;
/// Session token issue and verification.
pub mod session;
/// Algorithm validation.
pub mod validation;

/// Test utilities (feature-gated).
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-export key types for convenience
pub use config::{DEFAULT_TOKEN_TTL, ConfigError, SessionConfig, SessionSettings};
pub use error::{AuthError, Result};
pub use password::{SecretPolicy, hash_secret, verify_secret};
pub use service::{AuthService, AuthenticatedPrincipal, LoginOutcome};
pub use session::{SessionClaims, SessionKey, issue, verify};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
