//! # Aulario Tasks
//!
//! Task catalog and student–task assignment ledger for the Aulario
//! backend.
//!
//! This crate provides:
//! - **Task catalog**: CRUD for reusable task definitions with ordered steps
//! - **Assignment ledger**: The student↔task many-to-many relation with completion state
//! - **Cascading removal**: Deleting a task sweeps its assignment rows via a task-side index
//!
//! Assignments reference principals and tasks by stable id only, so a
//! student rename never touches the ledger. Each `assign` call creates an
//! independent row; operations on a (student, task) pair apply to every
//! matching row.
//!
//! ## Example
//!
//! ```
//! use aulario_storage::{MemoryBackend, PrincipalId};
//! use aulario_tasks::{AssignmentLedger, PresentationMode, TaskCatalog};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//! let catalog = TaskCatalog::new(backend.clone());
//! let ledger = AssignmentLedger::new(backend);
//!
//! let task = catalog.create("Poner la mesa", None, vec![]).await.unwrap();
//! let student = PrincipalId::from("s-1");
//!
//! ledger.assign(&student, &task.id, PresentationMode::Image).await.unwrap();
//! let assigned = ledger.list_for_student(&catalog, &student).await.unwrap();
//! assert_eq!(assigned[0].task_name, "Poner la mesa");
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Ledger error types.
pub mod error;
/// The assignment ledger.
pub mod ledger;
/// The task catalog.
pub mod task;

// Re-export key types for convenience
pub use error::{LedgerError, LedgerResult};
pub use ledger::{
    ASSIGNMENT_PREFIX, ASSIGNMENT_TASK_PREFIX, AssignedTask, Assignment, AssignmentLedger,
    PresentationMode, remove_task,
};
pub use task::{TASK_PREFIX, Task, TaskCatalog, TaskPatch, TaskStep};

/// Converts a key prefix into a half-open range covering exactly the keys
/// that start with it. The prefixes used here always end in `/`, so the
/// increment never overflows.
pub(crate) fn prefix_range(prefix: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
    let mut end = prefix.clone();
    if let Some(last) = end.last_mut() {
        *last += 1;
    }
    (prefix, end)
}
