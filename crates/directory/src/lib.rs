//! Principal directory for the Aulario school backend.
//!
//! This crate owns the records of everyone who can sign in: students,
//! teachers, and admins. It exposes one repository,
//! [`PrincipalDirectory`], which enforces the two structural invariants
//! the rest of the system leans on:
//!
//! - names are unique within a kind, checked atomically at create/rename
//! - every principal has a stable id that survives renames, so session tokens and assignment rows
//!   keep resolving
//!
//! Secrets are stored as opaque [`StoredSecret`] material. This crate
//! never hashes or compares secrets; that is the authentication crate's
//! job.
//!
//! # Quick Start
//!
//! ```
//! use aulario_directory::{
//!     PrincipalDirectory, PrincipalKind, PrincipalProfile, StoredSecret, StudentProfile,
//! };
//! use aulario_storage::MemoryBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = PrincipalDirectory::new(MemoryBackend::new());
//!
//!     let ana = directory
//!         .create(
//!             "Ana",
//!             StoredSecret::Plain { secret: "pw1".into() },
//!             PrincipalProfile::Student(StudentProfile::new("Aula 3")),
//!         )
//!         .await?;
//!
//!     let found = directory.find_by_id(&ana.id).await?;
//!     assert!(found.is_some());
//!
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod directory;
pub mod error;
pub mod principal;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

pub use directory::{PRINCIPAL_ID_PREFIX, PRINCIPAL_PREFIX, PrincipalDirectory};
pub use error::{DirectoryError, DirectoryResult};
pub use principal::{
    PrincipalKind, PrincipalPatch, PrincipalProfile, PrincipalRecord, PrincipalView, StoredSecret,
    StudentProfile,
};
