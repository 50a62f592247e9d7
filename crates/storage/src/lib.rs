//! Shared storage backend abstraction for Aulario services.
//!
//! This crate provides the [`StorageBackend`] trait and related types that form
//! the foundation for all persistence in the Aulario school backend. The
//! principal directory, task catalog, and assignment ledger are repositories
//! built on this abstraction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                           │
//! │            (AuthService, task administration)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Repository Layer                          │
//! │   PrincipalDirectory │ TaskCatalog │ AssignmentLedger       │
//! │         (Domain logic, serialization, indexing)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  aulario-storage                            │
//! │               StorageBackend trait                          │
//! │     (get, set, delete, get_range, transaction)              │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBackend│          document store backend              │
//! │   (testing)  │            (production)                      │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use aulario_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     // Store a value
//!     backend.set(b"principal/student/Ana".to_vec(), b"{}".to_vec()).await?;
//!
//!     // Retrieve it
//!     let value = backend.get(b"principal/student/Ana").await?;
//!     assert!(value.is_some());
//!
//!     // Use transactions for atomic multi-key operations
//!     let mut txn = backend.transaction().await?;
//!     txn.set(b"a".to_vec(), b"1".to_vec());
//!     txn.set(b"b".to_vec(), b"2".to_vec());
//!     txn.commit().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency Model
//!
//! Backends are `Send + Sync` and support concurrent operations. Single-key
//! operations are atomic; cross-key atomicity is only available through
//! [`Transaction`]. Repositories deliberately hold no locks of their own and
//! rely on these guarantees.
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`], which wraps potential
//! [`StorageError`] variants. Backends map their internal errors to these
//! standardized error types.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers. Enable this in
//!   `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod transaction;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::StorageBackend;
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use transaction::Transaction;
pub use types::{AssignmentId, KeyValue, PrincipalId, TaskId};
