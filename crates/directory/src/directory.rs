//! The principal directory repository.
//!
//! [`PrincipalDirectory`] is the single write path for principal records.
//! It owns the storage layout and the two invariants everything above it
//! depends on:
//!
//! - **Name uniqueness per kind.** The record lives at
//!   `principal/{kind}/{name}`; creation inserts it with a compare-and-set
//!   that requires the key to be absent, so two concurrent creates of the
//!   same name cannot both succeed.
//! - **Id stability.** A secondary index at `principal-id/{id}` maps the
//!   stable id to the record's current `(kind, name)`. Renames move the
//!   record and repoint the index in one transaction, so a lookup by id
//!   never observes a half-renamed principal.
//!
//! # Storage Layout
//!
//! ```text
//! principal/{kind}/{name}  →  PrincipalRecord (JSON)
//! principal-id/{id}        →  { kind, name }  (JSON)
//! ```
//!
//! Keys sort lexicographically, so `list` is a single range scan over
//! `principal/{kind}/`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aulario_storage::{PrincipalId, StorageBackend, StorageError};

use crate::{
    error::{DirectoryError, DirectoryResult},
    principal::{PrincipalKind, PrincipalPatch, PrincipalProfile, PrincipalRecord, StoredSecret},
};

/// Storage key prefix for principal records.
pub const PRINCIPAL_PREFIX: &str = "principal/";

/// Storage key prefix for the id index.
pub const PRINCIPAL_ID_PREFIX: &str = "principal-id/";

/// Maximum accepted length of a principal name, in bytes.
const MAX_NAME_LEN: usize = 128;

/// Entry of the id index: where a principal currently lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrincipalPointer {
    kind: PrincipalKind,
    name: String,
}

/// Repository for principal records on top of a [`StorageBackend`].
///
/// Cheap to clone when the backend is; holds no state beyond the backend
/// handle and no locks of its own. Atomicity comes entirely from the
/// backend's compare-and-set and transactions.
///
/// # Examples
///
/// ```
/// use aulario_directory::{PrincipalDirectory, PrincipalProfile, StoredSecret, StudentProfile};
/// use aulario_storage::MemoryBackend;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let directory = PrincipalDirectory::new(MemoryBackend::new());
///
/// let record = directory
///     .create(
///         "Ana",
///         StoredSecret::Plain { secret: "pw1".into() },
///         PrincipalProfile::Student(StudentProfile::new("Aula 3")),
///     )
///     .await
///     .unwrap();
///
/// assert_eq!(record.name, "Ana");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct PrincipalDirectory<B> {
    backend: B,
}

impl<B> PrincipalDirectory<B>
where
    B: StorageBackend,
{
    /// Creates a directory over the given backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Creates a new principal.
    ///
    /// Mints a fresh stable id, stamps `created_at`/`updated_at`, and
    /// writes the record and its id index entry in one transaction. The
    /// record insert is a compare-and-set requiring the name to be free.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::Validation`] if the name is empty, too long, or contains `/`
    /// - [`DirectoryError::DuplicateName`] if a principal of the same kind already has this name
    /// - [`DirectoryError::Storage`] on backend failures
    #[tracing::instrument(skip(self, secret, profile), fields(kind = %profile.kind(), name = %name))]
    pub async fn create(
        &self,
        name: &str,
        secret: StoredSecret,
        profile: PrincipalProfile,
    ) -> DirectoryResult<PrincipalRecord> {
        validate_name(name)?;

        let kind = profile.kind();
        let now = Utc::now();
        let record = PrincipalRecord {
            id: PrincipalId::from(Uuid::new_v4().to_string()),
            name: name.to_owned(),
            secret,
            profile,
            created_at: now,
            updated_at: now,
        };

        let record_bytes = encode(&record)?;
        let pointer_bytes = encode(&PrincipalPointer { kind, name: record.name.clone() })?;

        let mut txn = self.backend.transaction().await?;
        txn.compare_and_set(name_key(kind, name), None, record_bytes)?;
        txn.set(id_key(&record.id), pointer_bytes);

        match txn.commit().await {
            Ok(()) => {
                tracing::debug!(id = %record.id, "principal created");
                Ok(record)
            },
            Err(StorageError::Conflict) => Err(DirectoryError::duplicate_name(kind, name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up a principal by kind and name.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the principal exists
    /// - `Ok(None)` if it doesn't
    #[tracing::instrument(skip(self))]
    pub async fn find_by_name(
        &self,
        kind: PrincipalKind,
        name: &str,
    ) -> DirectoryResult<Option<PrincipalRecord>> {
        match self.backend.get(&name_key(kind, name)).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Looks up a principal by its stable id.
    ///
    /// Resolves the id index to the record's current `(kind, name)` and
    /// loads the record. This is the lookup session token validation uses,
    /// which is why it survives renames.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn find_by_id(&self, id: &PrincipalId) -> DirectoryResult<Option<PrincipalRecord>> {
        let Some(pointer_bytes) = self.backend.get(&id_key(id)).await? else {
            return Ok(None);
        };
        let pointer: PrincipalPointer = decode(&pointer_bytes)?;

        match self.find_by_name(pointer.kind, &pointer.name).await? {
            Some(record) => Ok(Some(record)),
            None => {
                // The index survived a record delete it should have gone
                // with. Treat as absent rather than surfacing corruption.
                tracing::warn!(
                    kind = %pointer.kind,
                    name = %pointer.name,
                    "id index points at a missing principal record"
                );
                Ok(None)
            },
        }
    }

    /// Applies a partial update to a principal.
    ///
    /// Plain field changes overwrite the record in place with a
    /// compare-and-set against the previously read bytes, so a concurrent
    /// writer causes a [`StorageError::Conflict`] instead of a lost update.
    ///
    /// A rename (`patch.name`) additionally moves the record to its new
    /// key and repoints the id index, all in one transaction. The insert
    /// at the new name is a compare-and-set requiring the name to be free.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if no such principal exists
    /// - [`DirectoryError::Validation`] if the new name is invalid
    /// - [`DirectoryError::DuplicateName`] if a rename targets a taken name
    /// - [`DirectoryError::Storage`] on backend failures, including conflicts with concurrent
    ///   writers
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        kind: PrincipalKind,
        name: &str,
        patch: PrincipalPatch,
    ) -> DirectoryResult<PrincipalRecord> {
        let old_key = name_key(kind, name);
        let old_bytes = self
            .backend
            .get(&old_key)
            .await?
            .ok_or_else(|| DirectoryError::not_found(kind, name))?;
        let mut record: PrincipalRecord = decode(&old_bytes)?;

        if patch.is_empty() {
            return Ok(record);
        }

        if let Some(new_name) = &patch.name {
            validate_name(new_name)?;
        }
        if let Some(secret) = patch.secret {
            record.secret = secret;
        }
        if let Some(student) = patch.student {
            if let PrincipalProfile::Student(profile) = &mut record.profile {
                *profile = student;
            }
        }
        record.updated_at = Utc::now();

        let renamed = patch.name.as_deref().is_some_and(|n| n != name);
        if let Some(new_name) = patch.name {
            record.name = new_name;
        }

        let record_bytes = encode(&record)?;

        if renamed {
            let pointer_bytes =
                encode(&PrincipalPointer { kind, name: record.name.clone() })?;

            let mut txn = self.backend.transaction().await?;
            txn.compare_and_set(name_key(kind, &record.name), None, record_bytes)?;
            txn.delete(old_key);
            txn.set(id_key(&record.id), pointer_bytes);

            match txn.commit().await {
                Ok(()) => {
                    tracing::debug!(id = %record.id, new_name = %record.name, "principal renamed");
                    Ok(record)
                },
                Err(StorageError::Conflict) => {
                    Err(DirectoryError::duplicate_name(kind, record.name))
                },
                Err(e) => Err(e.into()),
            }
        } else {
            self.backend.compare_and_set(&old_key, Some(&old_bytes), record_bytes).await?;
            Ok(record)
        }
    }

    /// Deletes a principal, removing its record and its id index entry in
    /// one transaction.
    ///
    /// Returns the removed record so callers can cascade (e.g. drop a
    /// deleted student's assignment rows).
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::NotFound`] if no such principal exists
    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        kind: PrincipalKind,
        name: &str,
    ) -> DirectoryResult<PrincipalRecord> {
        let record = self
            .find_by_name(kind, name)
            .await?
            .ok_or_else(|| DirectoryError::not_found(kind, name))?;

        let mut txn = self.backend.transaction().await?;
        txn.delete(name_key(kind, name));
        txn.delete(id_key(&record.id));
        txn.commit().await?;

        tracing::debug!(id = %record.id, "principal deleted");
        Ok(record)
    }

    /// Lists all principals of a kind, ordered by name.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, kind: PrincipalKind) -> DirectoryResult<Vec<PrincipalRecord>> {
        let (start, end) = prefix_range(format!("{PRINCIPAL_PREFIX}{kind}/").into_bytes());

        let entries = self.backend.get_range(start..end).await?;
        entries.iter().map(|kv| decode(&kv.value)).collect()
    }
}

/// Storage key for a principal record: `principal/{kind}/{name}`.
fn name_key(kind: PrincipalKind, name: &str) -> Vec<u8> {
    format!("{PRINCIPAL_PREFIX}{kind}/{name}").into_bytes()
}

/// Storage key for an id index entry: `principal-id/{id}`.
fn id_key(id: &PrincipalId) -> Vec<u8> {
    format!("{PRINCIPAL_ID_PREFIX}{id}").into_bytes()
}

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

fn validate_name(name: &str) -> DirectoryResult<()> {
    if name.is_empty() {
        return Err(DirectoryError::validation("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DirectoryError::validation(format!(
            "name must be at most {MAX_NAME_LEN} bytes"
        )));
    }
    if name.contains('/') {
        return Err(DirectoryError::validation("name must not contain '/'"));
    }
    if name.chars().any(char::is_control) {
        return Err(DirectoryError::validation("name must not contain control characters"));
    }
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> DirectoryResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        StorageError::serialization_with_source("failed to encode principal record", e).into()
    })
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> DirectoryResult<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        StorageError::serialization_with_source("failed to decode principal record", e).into()
    })
}
