//! The authentication service.
//!
//! [`AuthService`] is the one front door for sign-in, registration, and
//! token validation, shared by all three principal kinds. It composes the
//! principal directory (lookup and creation), the credential verifier
//! (policy-dispatched secret checks), and the session module (EdDSA
//! tokens).
//!
//! # Login Failure Order
//!
//! Login always runs lookup first, then secret verification. The two
//! failures are distinct error variants — so telemetry can tell probing
//! from typos — but render identical messages, so callers cannot
//! enumerate account names.
//!
//! # Token Validation
//!
//! [`authenticate`](AuthService::authenticate) always re-looks the
//! principal up by the stable id in the token subject. A token therefore
//! never outlives its account: deletion kills every outstanding session at
//! the next validation, and renames are transparent.

use std::{sync::Arc, time::Duration};

use aulario_directory::{
    PrincipalDirectory, PrincipalKind, PrincipalProfile, PrincipalView, StudentProfile,
};
use aulario_storage::StorageBackend;

use crate::{
    config::SessionConfig,
    error::AuthError,
    password::{SecretPolicy, hash_secret, verify_secret},
    session::{SessionClaims, SessionKey, issue, verify},
};

/// A successful login or student registration: the session token and the
/// secret-free view of who it belongs to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The signed session token.
    pub token: String,
    /// Who the token was issued to.
    pub principal: PrincipalView,
}

/// A successfully validated session: the verified claims and the principal
/// they resolve to right now.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    /// The verified token claims.
    pub claims: SessionClaims,
    /// The principal as currently stored (post re-lookup).
    pub principal: PrincipalView,
}

/// Sign-in, registration, and token validation over a storage backend.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use aulario_authn::{AuthService, SessionKey};
/// use aulario_directory::{PrincipalDirectory, StudentProfile};
/// use aulario_storage::MemoryBackend;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let directory = PrincipalDirectory::new(MemoryBackend::new());
/// let service = AuthService::new(
///     directory,
///     std::sync::Arc::new(SessionKey::generate()),
///     Duration::from_secs(86_400),
/// );
///
/// let outcome = service
///     .register_student("Ana", "pw1", StudentProfile::new("Aula 3"))
///     .await
///     .unwrap();
///
/// let authed = service.authenticate(&outcome.token).await.unwrap();
/// assert_eq!(authed.principal.name, "Ana");
/// # });
/// ```
pub struct AuthService<B> {
    directory: PrincipalDirectory<B>,
    key: Arc<SessionKey>,
    token_ttl: Duration,
}

impl<B> AuthService<B>
where
    B: StorageBackend,
{
    /// Creates a service with an explicit key and token lifetime.
    #[must_use]
    pub fn new(directory: PrincipalDirectory<B>, key: Arc<SessionKey>, token_ttl: Duration) -> Self {
        Self { directory, key, token_ttl }
    }

    /// Creates a service from a resolved [`SessionConfig`].
    #[must_use]
    pub fn from_config(directory: PrincipalDirectory<B>, config: SessionConfig) -> Self {
        Self { directory, key: Arc::new(config.key), token_ttl: config.token_ttl }
    }

    /// Signs a principal in.
    ///
    /// Looks the principal up by kind and name, verifies the presented
    /// secret under the record's stored policy, and issues a session
    /// token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::PrincipalNotFound`] if no such principal exists
    /// - [`AuthError::InvalidCredentials`] if the secret doesn't match
    ///
    /// Both render the same message; see the module docs.
    #[tracing::instrument(skip(self, secret))]
    pub async fn login(
        &self,
        kind: PrincipalKind,
        name: &str,
        secret: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(record) = self.directory.find_by_name(kind, name).await? else {
            tracing::debug!("login failed: unknown principal");
            return Err(AuthError::PrincipalNotFound);
        };

        if !verify_secret(&record.secret, secret)? {
            tracing::debug!(id = %record.id, "login failed: secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = SessionClaims::for_principal(kind, &record.id, self.token_ttl);
        let token = issue(&self.key, &claims)?;

        tracing::debug!(id = %record.id, "login succeeded");
        Ok(LoginOutcome { token, principal: record.view() })
    }

    /// Registers a student and signs them in immediately.
    ///
    /// The secret is stored under the student policy (Argon2id hash).
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if the secret is empty
    /// - [`AuthError::Directory`] wrapping `DuplicateName` if the name is taken, or `Validation`
    ///   for a bad name
    #[tracing::instrument(skip(self, secret, profile))]
    pub async fn register_student(
        &self,
        name: &str,
        secret: &str,
        profile: StudentProfile,
    ) -> Result<LoginOutcome, AuthError> {
        let stored = hash_secret(SecretPolicy::for_kind(PrincipalKind::Student), secret)?;
        let record =
            self.directory.create(name, stored, PrincipalProfile::Student(profile)).await?;

        let claims =
            SessionClaims::for_principal(PrincipalKind::Student, &record.id, self.token_ttl);
        let token = issue(&self.key, &claims)?;

        tracing::debug!(id = %record.id, "student registered");
        Ok(LoginOutcome { token, principal: record.view() })
    }

    /// Registers a principal of any kind, without issuing a token.
    ///
    /// The secret is stored under [`SecretPolicy::for_kind`]. Students
    /// must come with a profile; other kinds must not.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] for an empty secret or a missing/extraneous student profile
    /// - [`AuthError::Directory`] wrapping `DuplicateName` or name validation failures
    #[tracing::instrument(skip(self, secret, student))]
    pub async fn register(
        &self,
        kind: PrincipalKind,
        name: &str,
        secret: &str,
        student: Option<StudentProfile>,
    ) -> Result<PrincipalView, AuthError> {
        let profile = match (kind, student) {
            (PrincipalKind::Student, Some(profile)) => PrincipalProfile::Student(profile),
            (PrincipalKind::Student, None) => {
                return Err(AuthError::validation("student registration requires a profile"));
            },
            (PrincipalKind::Teacher, None) => PrincipalProfile::Teacher,
            (PrincipalKind::Admin, None) => PrincipalProfile::Admin,
            (_, Some(_)) => {
                return Err(AuthError::validation(
                    "only student registration accepts a profile",
                ));
            },
        };

        let stored = hash_secret(SecretPolicy::for_kind(kind), secret)?;
        let record = self.directory.create(name, stored, profile).await?;

        tracing::debug!(id = %record.id, %kind, "principal registered");
        Ok(record.view())
    }

    /// Validates a session token and resolves its principal.
    ///
    /// Verifies the signature and timestamps, then re-looks the principal
    /// up by stable id. The re-lookup is mandatory: a deleted account
    /// invalidates all its outstanding tokens here.
    ///
    /// # Errors
    ///
    /// - Token errors from [`verify`] (format, algorithm, signature, expiry)
    /// - [`AuthError::InvalidSubject`] for a malformed subject
    /// - [`AuthError::PrincipalNotFound`] if the principal no longer exists or its kind no longer
    ///   matches the token
    #[tracing::instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        let claims = verify(token, &self.key)?;
        let (kind, id) = claims.principal()?;

        let Some(record) = self.directory.find_by_id(&id).await? else {
            tracing::debug!(%id, "token subject no longer resolves");
            return Err(AuthError::PrincipalNotFound);
        };

        if record.kind() != kind {
            tracing::warn!(%id, token_kind = %kind, record_kind = %record.kind(),
                "token kind does not match stored principal");
            return Err(AuthError::PrincipalNotFound);
        }

        Ok(AuthenticatedPrincipal { claims, principal: record.view() })
    }

    /// The directory this service reads and writes.
    #[must_use]
    pub fn directory(&self) -> &PrincipalDirectory<B> {
        &self.directory
    }
}
