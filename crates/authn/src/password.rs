//! Secret hashing and verification.
//!
//! Two storage policies coexist in the directory: student secrets are
//! hashed (Argon2id with a per-record random salt), while teacher and admin
//! secrets are stored plaintext for compatibility with the records they
//! were migrated from. [`verify_secret`] dispatches on the stored scheme,
//! so callers never care which policy a record uses — and a kind can be
//! migrated to hashed storage without touching any call site.
//!
//! Plaintext comparison is constant-time ([`subtle`]) to avoid timing
//! side-channels.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;

use aulario_directory::{PrincipalKind, StoredSecret};

use crate::error::AuthError;

/// How a principal kind's secrets are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretPolicy {
    /// Argon2id hash with per-record random salt.
    Hashed,
    /// Plaintext storage, compared in constant time.
    Plaintext,
}

impl SecretPolicy {
    /// The storage policy for a given principal kind.
    ///
    /// Students are hashed; teachers and admins keep the plaintext policy
    /// their records were migrated with. Any kind added later should hash.
    #[must_use]
    pub fn for_kind(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Student => Self::Hashed,
            PrincipalKind::Teacher | PrincipalKind::Admin => Self::Plaintext,
        }
    }
}

/// Produces the stored form of a presented secret under the given policy.
///
/// # Errors
///
/// - [`AuthError::Validation`] if the secret is empty
/// - [`AuthError::SecretHash`] if Argon2 hashing fails
pub fn hash_secret(policy: SecretPolicy, presented: &str) -> Result<StoredSecret, AuthError> {
    if presented.is_empty() {
        return Err(AuthError::validation("secret must not be empty"));
    }

    match policy {
        SecretPolicy::Plaintext => Ok(StoredSecret::Plain { secret: presented.to_owned() }),
        SecretPolicy::Hashed => {
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(presented.as_bytes(), &salt)
                .map_err(|e| AuthError::secret_hash(e.to_string()))?;
            Ok(StoredSecret::Argon2 { hash: hash.to_string() })
        },
    }
}

/// Checks a presented secret against stored material.
///
/// Dispatches on the stored scheme, not on the principal kind, so records
/// hashed under an older or newer policy verify correctly.
///
/// # Returns
///
/// - `Ok(true)` if the secret matches
/// - `Ok(false)` if it doesn't
///
/// # Errors
///
/// - [`AuthError::SecretHash`] if a stored Argon2 hash cannot be parsed. This signals corrupt
///   stored material, never a wrong password.
pub fn verify_secret(stored: &StoredSecret, presented: &str) -> Result<bool, AuthError> {
    match stored {
        StoredSecret::Plain { secret } => {
            // Length check first: ct_eq requires equal-length inputs. The
            // length itself is not secret.
            let stored_bytes = secret.as_bytes();
            let presented_bytes = presented.as_bytes();
            if stored_bytes.len() != presented_bytes.len() {
                return Ok(false);
            }
            Ok(stored_bytes.ct_eq(presented_bytes).into())
        },
        StoredSecret::Argon2 { hash } => {
            let parsed = PasswordHash::new(hash)
                .map_err(|e| AuthError::secret_hash(format!("stored hash is invalid: {e}")))?;
            match Argon2::default().verify_password(presented.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::secret_hash(e.to_string())),
            }
        },
    }
}
