//! The per-node key-value store.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, PoisonError},
};

use verna_api::{ClientKey, VernaError, VersionVector, VersionedValue};

use crate::replica::Replica;

/// A single node's map from key to its set of retained versions.
///
/// The set stored for a key is always an *antichain* under the causal partial
/// order: no element's vector is dominated by (or equal to) another element's
/// vector. Every accepted write goes through the same merge rule, which
/// rejects obsolete writes, prunes versions the new write supersedes, and
/// keeps versions that are genuinely concurrent with it.
///
/// Each store owns its per-key sets exclusively; nothing is shared across
/// nodes. Methods take `&self` so a store can be handed to multiple
/// coordinator threads behind an [`Arc`][std::sync::Arc]; the reject-prune-insert
/// sequence runs as one critical section, so concurrent writers to the same
/// key cannot lose each other's updates.
pub struct ReplicaStore {
    node_id: String,
    db: Mutex<HashMap<ClientKey, HashSet<VersionedValue>>>,
}

impl ReplicaStore {
    /// Creates an empty store for the node with the given id.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            db: Default::default(),
        }
    }

    /// The id of the node this store belongs to.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Performs a write for which this node is the primary holder.
    ///
    /// Increments the counter for this node in `known_version`, stamps the
    /// value with the resulting vector, stores it via the merge rule, and
    /// returns the stamped value so the caller can replicate it verbatim.
    /// This is the only place counters advance.
    pub fn put_as_primary(
        &self,
        key: ClientKey,
        value: impl Into<Vec<u8>>,
        known_version: &VersionVector,
    ) -> Result<VersionedValue, VernaError> {
        let new = VersionedValue::new(value, known_version.increment(&self.node_id));
        self.put(key, new.clone())?;
        Ok(new)
    }

    /// Stores a value exactly as given, without incrementing its vector.
    ///
    /// Used to apply a value already stamped by the write's primary, or to
    /// merge in versions observed from peers. Returns
    /// [`VernaError::ObsoleteVersion`] if an already-stored version is at
    /// least as new as `value`, leaving the key's set unchanged.
    pub fn put(&self, key: ClientKey, value: VersionedValue) -> Result<(), VernaError> {
        // the critical section leaves the map consistent at every point, so
        // the data behind a poisoned lock is still valid
        let mut db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        Self::merge(db.entry(key).or_default(), value)
    }

    /// Returns the current antichain for the key, empty if never written.
    pub fn get(&self, key: &ClientKey) -> HashSet<VersionedValue> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        db.get(key).cloned().unwrap_or_default()
    }

    /// The merge rule shared by both write entry points.
    ///
    /// 1. Reject if any existing version descends `new` (is at least as new,
    ///    including the equal-vector case).
    /// 2. Prune every existing version that `new` descends.
    /// 3. Insert `new`.
    ///
    /// Versions concurrent with `new` survive both steps, so the result is an
    /// antichain by construction.
    fn merge(
        existing: &mut HashSet<VersionedValue>,
        new: VersionedValue,
    ) -> Result<(), VernaError> {
        if existing.iter().any(|stored| stored.descends(&new)) {
            return Err(VernaError::ObsoleteVersion);
        }
        existing.retain(|stored| !new.descends(stored));
        existing.insert(new);
        Ok(())
    }
}

impl Replica for ReplicaStore {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn put_as_primary(
        &self,
        key: &ClientKey,
        value: &[u8],
        known_version: &VersionVector,
    ) -> Result<VersionedValue, VernaError> {
        ReplicaStore::put_as_primary(self, key.clone(), value, known_version)
    }

    fn put(&self, key: &ClientKey, value: VersionedValue) -> Result<(), VernaError> {
        ReplicaStore::put(self, key.clone(), value)
    }

    fn get(&self, key: &ClientKey) -> Result<HashSet<VersionedValue>, VernaError> {
        Ok(ReplicaStore::get(self, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().copied().collect()
    }

    #[test]
    fn primary_write_advances_the_vector() {
        let store = ReplicaStore::new("green");

        let written = store
            .put_as_primary("name".into(), *b"alice", &VersionVector::new())
            .unwrap();

        assert_eq!(written.vector(), &vector(&[("green", 1)]));
        assert_eq!(
            store.get(&"name".into()),
            [written].into_iter().collect()
        );
    }

    #[test]
    fn rejects_write_with_dominated_vector() {
        let store = ReplicaStore::new("blue");
        let current = VersionedValue::new(*b"v2", vector(&[("blue", 2)]));
        store.put("key".into(), current.clone()).unwrap();

        let stale = VersionedValue::new(*b"v1", vector(&[("blue", 1)]));
        assert_eq!(
            store.put("key".into(), stale),
            Err(VernaError::ObsoleteVersion)
        );
        assert_eq!(store.get(&"key".into()), [current].into_iter().collect());
    }

    #[test]
    fn rejects_write_repeating_an_applied_vector() {
        let store = ReplicaStore::new("blue");
        let value = VersionedValue::new(*b"v1", vector(&[("blue", 1)]));
        store.put("key".into(), value.clone()).unwrap();

        assert_eq!(
            store.put("key".into(), value),
            Err(VernaError::ObsoleteVersion)
        );
    }

    #[test]
    fn newer_write_supersedes_stored_version() {
        let store = ReplicaStore::new("blue");
        store
            .put("key".into(), VersionedValue::new(*b"v1", vector(&[("blue", 1)])))
            .unwrap();

        let newer = VersionedValue::new(*b"v2", vector(&[("blue", 2)]));
        store.put("key".into(), newer.clone()).unwrap();

        assert_eq!(store.get(&"key".into()), [newer].into_iter().collect());
    }

    #[test]
    fn concurrent_write_is_retained_alongside() {
        let store = ReplicaStore::new("blue");
        let first = VersionedValue::new(*b"v1", vector(&[("blue", 1)]));
        let second = VersionedValue::new(*b"v2", vector(&[("green", 1)]));

        store.put("key".into(), first.clone()).unwrap();
        store.put("key".into(), second.clone()).unwrap();

        assert_eq!(
            store.get(&"key".into()),
            [first, second].into_iter().collect()
        );
    }

    #[test]
    fn stored_set_stays_an_antichain() {
        let store = ReplicaStore::new("blue");
        let key = ClientKey::from("key");

        // interleave primary writes, replicated writes, and rejections
        let writes = [
            VersionedValue::new(*b"a", vector(&[("blue", 1)])),
            VersionedValue::new(*b"b", vector(&[("green", 1)])),
            VersionedValue::new(*b"c", vector(&[("blue", 2), ("green", 1)])),
            VersionedValue::new(*b"d", vector(&[("pink", 3)])),
            VersionedValue::new(*b"e", vector(&[("blue", 1)])),
        ];
        for write in writes {
            // obsolete writes are expected in the mix, only the set matters
            let _ = store.put(key.clone(), write);
        }

        let stored = store.get(&key);
        assert_eq!(stored.len(), 2);
        for left in &stored {
            for right in &stored {
                if left != right {
                    assert!(!left.descends(right));
                }
            }
        }
    }

    #[test]
    fn missing_key_reads_empty() {
        let store = ReplicaStore::new("blue");
        assert!(store.get(&"missing".into()).is_empty());
    }

    #[test]
    fn concurrent_writers_preserve_the_antichain() {
        use std::{sync::Arc, thread};

        let store = Arc::new(ReplicaStore::new("blue"));
        let key = ClientKey::from("key");
        let writers = 4;
        let writes_per_writer = 25;

        // every writer streams causally ordered writes from its own node id,
        // then finishes with a primary write carrying its latest vector; the
        // writers' histories are pairwise concurrent, so no interleaving may
        // drop another writer's update
        let handles: Vec<_> = (0..writers)
            .map(|writer| {
                let store = store.clone();
                let key = key.clone();
                thread::spawn(move || {
                    let node = format!("writer-{}", writer);
                    let mut version = VersionVector::new();
                    for _ in 0..writes_per_writer {
                        version = version.increment(&node);
                        store
                            .put(
                                key.clone(),
                                VersionedValue::new(node.as_bytes(), version.clone()),
                            )
                            .unwrap();
                    }
                    store
                        .put_as_primary(key, format!("primary-{}", writer), &version)
                        .unwrap()
                })
            })
            .collect();

        let expected: HashSet<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let stored = store.get(&key);
        assert_eq!(stored, expected);
        for left in &stored {
            for right in &stored {
                if left != right {
                    assert!(!left.descends(right));
                }
            }
        }
    }
}
