//! Shared test helpers for crates that need principals on hand.
//!
//! Feature-gated behind `testutil` to prevent leaking into production
//! builds. Enable it in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! aulario-directory = { path = "../directory", features = ["testutil"] }
//! ```

use aulario_storage::MemoryBackend;

use crate::{
    directory::PrincipalDirectory,
    principal::{PrincipalProfile, PrincipalRecord, StoredSecret, StudentProfile},
};

/// A directory over a fresh in-memory backend.
#[must_use]
pub fn memory_directory() -> PrincipalDirectory<MemoryBackend> {
    PrincipalDirectory::new(MemoryBackend::new())
}

/// Creates a student with a plaintext secret and default profile.
///
/// # Panics
///
/// Panics if creation fails (duplicate name in the same test, for
/// instance).
pub async fn seed_student(
    directory: &PrincipalDirectory<MemoryBackend>,
    name: &str,
    secret: &str,
) -> PrincipalRecord {
    directory
        .create(
            name,
            StoredSecret::Plain { secret: secret.to_owned() },
            PrincipalProfile::Student(StudentProfile::new("Aula 1")),
        )
        .await
        .expect("seed student")
}

/// Creates a teacher with a plaintext secret.
///
/// # Panics
///
/// Panics if creation fails.
pub async fn seed_teacher(
    directory: &PrincipalDirectory<MemoryBackend>,
    name: &str,
    secret: &str,
) -> PrincipalRecord {
    directory
        .create(name, StoredSecret::Plain { secret: secret.to_owned() }, PrincipalProfile::Teacher)
        .await
        .expect("seed teacher")
}

/// Creates an admin with a plaintext secret.
///
/// # Panics
///
/// Panics if creation fails.
pub async fn seed_admin(
    directory: &PrincipalDirectory<MemoryBackend>,
    name: &str,
    secret: &str,
) -> PrincipalRecord {
    directory
        .create(name, StoredSecret::Plain { secret: secret.to_owned() }, PrincipalProfile::Admin)
        .await
        .expect("seed admin")
}
