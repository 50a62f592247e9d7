//! In-memory storage backend implementation.
//!
//! This module provides [`MemoryBackend`], an in-memory implementation of
//! [`StorageBackend`] suitable for testing and development.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Keys are stored in a [`BTreeMap`] for efficient range queries
//! - **Transaction support**: Buffered writes with read-your-writes semantics
//!
//! # Example
//!
//! ```
//! use aulario_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"greeting".to_vec(), b"hello".to_vec()).await.unwrap();
//!     let value = backend.get(b"greeting").await.unwrap();
//!
//!     assert_eq!(value.unwrap().as_ref(), b"hello");
//! }
//! ```
//!
//! # Performance Characteristics
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | get | O(log n) |
//! | set | O(log n) |
//! | delete | O(log n) |
//! | get_range | O(log n + k) where k is result size |
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - No replication or distributed features

use std::{
    collections::BTreeMap,
    ops::{Bound, RangeBounds},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
    transaction::Transaction,
    types::KeyValue,
};

/// In-memory storage backend using [`BTreeMap`].
///
/// This backend is primarily intended for testing but can also be used
/// for development or small-scale deployments where persistence is not
/// required.
///
/// # Cloning
///
/// `MemoryBackend` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Bytes>>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory storage backend.
    ///
    /// # Example
    ///
    /// ```
    /// use aulario_storage::MemoryBackend;
    ///
    /// let backend = MemoryBackend::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let data = self.data.read();
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        let mut data = self.data.write();
        data.insert(key, Bytes::from(value));
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        let mut data = self.data.write();

        let current = data.get(key).cloned();

        let matches = match (expected, &current) {
            (None, None) => true,
            (Some(exp), Some(cur)) => exp == &cur[..],
            _ => false,
        };

        if !matches {
            return Err(StorageError::Conflict);
        }

        data.insert(key.to_vec(), Bytes::from(new_value));
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        data.remove(key);
        Ok(())
    }

    async fn get_range<R>(&self, range: R) -> StorageResult<Vec<KeyValue>>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        let data = self.data.read();

        let start = match range.start_bound() {
            Bound::Included(b) => Bound::Included(b.as_slice()),
            Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let end = match range.end_bound() {
            Bound::Included(b) => Bound::Included(b.as_slice()),
            Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };

        let results: Vec<KeyValue> = data
            .range::<[u8], _>((start, end))
            .map(|(k, v)| KeyValue::new(Bytes::copy_from_slice(k), v.clone()))
            .collect();

        Ok(results)
    }

    async fn clear_range<R>(&self, range: R) -> StorageResult<()>
    where
        R: RangeBounds<Vec<u8>> + Send,
    {
        // Phase 1: Collect keys to remove under a read lock, allowing
        // concurrent reads and writes to proceed during the scan.
        let keys_to_remove: Vec<Vec<u8>> = {
            let data = self.data.read();
            data.range(range).map(|(k, _)| k.clone()).collect()
        };

        if keys_to_remove.is_empty() {
            return Ok(());
        }

        // Phase 2: Batch-remove all keys in a single critical section.
        let mut data = self.data.write();
        for key in &keys_to_remove {
            data.remove(key);
        }

        Ok(())
    }

    async fn transaction(&self) -> StorageResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction::new(self.clone())))
    }

    async fn health_check(&self) -> StorageResult<()> {
        // Try to acquire read lock to verify we're not deadlocked
        let _unused = self.data.read();
        Ok(())
    }
}

/// A compare-and-set operation to be verified at commit time.
#[derive(Debug, Clone)]
struct CasOperation {
    key: Vec<u8>,
    expected: Option<Vec<u8>>,
    new_value: Vec<u8>,
}

/// In-memory transaction implementation.
///
/// Buffers writes and deletes until commit, providing read-your-writes
/// semantics within the transaction.
struct MemoryTransaction {
    backend: MemoryBackend,
    pending_writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    pending_cas: Vec<CasOperation>,
}

impl MemoryTransaction {
    fn new(backend: MemoryBackend) -> Self {
        Self { backend, pending_writes: BTreeMap::new(), pending_cas: Vec::new() }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        // Check pending writes first (read-your-writes)
        if let Some(value) = self.pending_writes.get(key) {
            return Ok(value.as_ref().map(|v| Bytes::copy_from_slice(v)));
        }

        // Otherwise, read from backend
        self.backend.get(key).await
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending_writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.pending_writes.insert(key, None);
    }

    fn compare_and_set(
        &mut self,
        key: Vec<u8>,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> StorageResult<()> {
        // Buffer the CAS operation - it will be verified at commit time
        self.pending_cas.push(CasOperation { key, expected, new_value });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let mut data = self.backend.data.write();

        // First, verify all CAS conditions hold
        for cas in &self.pending_cas {
            let current_value = data.get(&cas.key).cloned();

            let matches = match (&cas.expected, &current_value) {
                (None, None) => true,
                (Some(expected_bytes), Some(current_bytes)) => {
                    expected_bytes.as_slice() == &current_bytes[..]
                },
                _ => false,
            };

            if !matches {
                return Err(StorageError::Conflict);
            }
        }

        // Apply all CAS writes
        for cas in self.pending_cas {
            data.insert(cas.key, Bytes::from(cas.new_value));
        }

        // Apply all pending writes atomically
        for (key, value) in self.pending_writes {
            match value {
                Some(v) => {
                    data.insert(key, Bytes::from(v));
                },
                None => {
                    data.remove(&key);
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let backend = MemoryBackend::new();

        // Set and get
        backend.set(b"key1".to_vec(), b"value1".to_vec()).await.unwrap();
        let value = backend.get(b"key1").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value1")));

        // Delete
        backend.delete(b"key1").await.unwrap();
        let value = backend.get(b"key1").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let backend = MemoryBackend::new();
        backend.delete(b"never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_range_operations() {
        let backend = MemoryBackend::new();

        backend.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        backend.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
        backend.set(b"c".to_vec(), b"3".to_vec()).await.unwrap();

        let range = backend.get_range(b"a".to_vec()..b"c".to_vec()).await.unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].key, Bytes::from("a"));
        assert_eq!(range[1].key, Bytes::from("b"));
    }

    #[tokio::test]
    async fn test_clear_range() {
        let backend = MemoryBackend::new();

        backend.set(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        backend.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
        backend.set(b"c".to_vec(), b"3".to_vec()).await.unwrap();

        backend.clear_range(b"a".to_vec()..b"c".to_vec()).await.unwrap();

        assert_eq!(backend.get(b"a").await.unwrap(), None);
        assert_eq!(backend.get(b"b").await.unwrap(), None);
        assert_eq!(backend.get(b"c").await.unwrap(), Some(Bytes::from("3")));
    }

    #[tokio::test]
    async fn test_transaction() {
        let backend = MemoryBackend::new();

        backend.set(b"key1".to_vec(), b"value1".to_vec()).await.unwrap();

        let mut txn = backend.transaction().await.unwrap();

        // Read within transaction
        let value = txn.get(b"key1").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value1")));

        // Write within transaction
        txn.set(b"key2".to_vec(), b"value2".to_vec());

        // Read-your-writes: see uncommitted write
        let value = txn.get(b"key2").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value2")));

        // Delete within transaction
        txn.delete(b"key1".to_vec());

        // Read-your-writes: see uncommitted delete
        let value = txn.get(b"key1").await.unwrap();
        assert_eq!(value, None);

        // Commit transaction
        txn.commit().await.unwrap();

        // Verify changes are persisted
        let value1 = backend.get(b"key1").await.unwrap();
        assert_eq!(value1, None);

        let value2 = backend.get(b"key2").await.unwrap();
        assert_eq!(value2, Some(Bytes::from("value2")));
    }

    #[tokio::test]
    async fn test_health_check() {
        let backend = MemoryBackend::new();
        assert!(backend.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_clone_shares_data() {
        let backend1 = MemoryBackend::new();
        let backend2 = backend1.clone();

        backend1.set(b"key".to_vec(), b"value".to_vec()).await.unwrap();

        let value = backend2.get(b"key").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn test_compare_and_set_success() {
        let backend = MemoryBackend::new();

        backend.set(b"key".to_vec(), b"value1".to_vec()).await.unwrap();

        backend
            .compare_and_set(b"key", Some(b"value1".as_slice()), b"value2".to_vec())
            .await
            .unwrap();

        let value = backend.get(b"key").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value2")));
    }

    #[tokio::test]
    async fn test_compare_and_set_conflict() {
        let backend = MemoryBackend::new();

        backend.set(b"key".to_vec(), b"value1".to_vec()).await.unwrap();

        let result =
            backend.compare_and_set(b"key", Some(b"wrong".as_slice()), b"value2".to_vec()).await;

        assert!(matches!(result, Err(StorageError::Conflict)));

        // Original value unchanged
        let value = backend.get(b"key").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value1")));
    }

    #[tokio::test]
    async fn test_compare_and_set_insert_if_absent() {
        let backend = MemoryBackend::new();

        // CAS on nonexistent key with expected: None succeeds (insert-if-absent)
        backend.compare_and_set(b"new_key", None, b"value".to_vec()).await.unwrap();

        let value = backend.get(b"new_key").await.unwrap();
        assert_eq!(value, Some(Bytes::from("value")));

        // Insert-if-absent again: fails with Conflict
        let result = backend.compare_and_set(b"new_key", None, b"other".to_vec()).await;
        assert!(matches!(result, Err(StorageError::Conflict)));
    }

    #[tokio::test]
    async fn test_compare_and_set_nonexistent_key_with_expected_some() {
        let backend = MemoryBackend::new();

        let result =
            backend.compare_and_set(b"missing", Some(b"value".as_slice()), b"new".to_vec()).await;

        assert!(matches!(result, Err(StorageError::Conflict)));

        let value = backend.get(b"missing").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_transaction_cas_conflict_aborts_all() {
        let backend = MemoryBackend::new();

        backend.set(b"guard".to_vec(), b"v1".to_vec()).await.unwrap();

        let mut txn = backend.transaction().await.unwrap();
        txn.set(b"other".to_vec(), b"written".to_vec());
        txn.compare_and_set(b"guard".to_vec(), Some(b"stale".to_vec()), b"v2".to_vec()).unwrap();

        let result = txn.commit().await;
        assert!(matches!(result, Err(StorageError::Conflict)));

        // Nothing from the transaction was applied
        assert_eq!(backend.get(b"other").await.unwrap(), None);
        assert_eq!(backend.get(b"guard").await.unwrap(), Some(Bytes::from("v1")));
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        /// Strategy for generating a sorted, deduplicated set of keys.
        fn arb_sorted_keys() -> impl Strategy<Value = Vec<Vec<u8>>> {
            proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..16), 0..30)
                .prop_map(|mut keys| {
                    keys.sort();
                    keys.dedup();
                    keys
                })
        }

        proptest! {
            /// All keys returned by `get_range` must fall within the requested bounds.
            #[test]
            fn range_query_returns_keys_within_bounds(
                keys in arb_sorted_keys(),
                a in proptest::collection::vec(any::<u8>(), 1..8),
                b in proptest::collection::vec(any::<u8>(), 1..8),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");

                rt.block_on(async {
                    let backend = MemoryBackend::new();
                    for key in &keys {
                        backend.set(key.clone(), b"v".to_vec()).await.unwrap();
                    }

                    // Ensure start <= end to avoid BTreeMap panic
                    let (start, end) = if a <= b { (a, b) } else { (b, a) };

                    let results = backend.get_range(start.clone()..end.clone()).await.unwrap();

                    for kv in &results {
                        let k = kv.key.to_vec();
                        prop_assert!(k >= start, "key {:?} < start {:?}", k, start);
                        prop_assert!(k < end, "key {:?} >= end {:?}", k, end);
                    }

                    Ok(())
                })?;
            }

            /// The count of keys returned by `get_range` must equal the count of
            /// stored keys that fall within the bounds.
            #[test]
            fn range_query_count_matches_expected(
                keys in arb_sorted_keys(),
                a in proptest::collection::vec(any::<u8>(), 1..8),
                b in proptest::collection::vec(any::<u8>(), 1..8),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");

                rt.block_on(async {
                    let backend = MemoryBackend::new();
                    for key in &keys {
                        backend.set(key.clone(), b"v".to_vec()).await.unwrap();
                    }

                    let (start, end) = if a <= b { (a, b) } else { (b, a) };

                    let results = backend.get_range(start.clone()..end.clone()).await.unwrap();
                    let expected_count = keys
                        .iter()
                        .filter(|k| **k >= start && **k < end)
                        .count();
                    prop_assert_eq!(results.len(), expected_count);

                    Ok(())
                })?;
            }

            /// Results from `get_range` must be sorted by key.
            #[test]
            fn range_query_results_are_sorted(
                keys in arb_sorted_keys(),
                a in proptest::collection::vec(any::<u8>(), 1..8),
                b in proptest::collection::vec(any::<u8>(), 1..8),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");

                rt.block_on(async {
                    let backend = MemoryBackend::new();
                    for key in &keys {
                        backend.set(key.clone(), b"v".to_vec()).await.unwrap();
                    }

                    let (start, end) = if a <= b { (a, b) } else { (b, a) };

                    let results = backend.get_range(start..end).await.unwrap();
                    for pair in results.windows(2) {
                        prop_assert!(pair[0].key <= pair[1].key);
                    }

                    Ok(())
                })?;
            }
        }
    }
}
