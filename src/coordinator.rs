//! Client-facing orchestration of writes and reads across replicas.

use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt::Display,
    sync::Arc,
};

use verna_api::{
    ClientKey, ConflictResolver, TimestampedValue, VernaError, VersionVector, VersionedValue,
};

use crate::{hash_ring::Partitioner, replica::Replica};

/// Raised when every replica candidate failed the primary-write attempt.
///
/// The write did not happen anywhere. Carries the per-candidate causes in
/// the order the candidates were tried.
#[derive(Debug)]
pub struct NoAvailableReplica {
    attempts: Vec<(String, VernaError)>,
}

impl NoAvailableReplica {
    /// The failed candidates in attempt order, each with its cause.
    pub fn attempts(&self) -> &[(String, VernaError)] {
        &self.attempts
    }
}

impl Display for NoAvailableReplica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no replica accepted the write")?;
        for (node_id, cause) in &self.attempts {
            write!(f, "; {}: {}", node_id, cause)?;
        }
        Ok(())
    }
}

impl Error for NoAvailableReplica {}

/// Stateless façade that routes client operations to replica nodes.
///
/// For each operation the coordinator asks its [`Partitioner`] for the key's
/// ordered candidate list and resolves the returned node ids against its
/// replica registry. It holds no per-key state of its own; all durable state
/// lives in the replicas.
pub struct Coordinator<P> {
    partitioner: P,
    replicas: HashMap<String, Arc<dyn Replica>>,
}

impl<P: Partitioner> Coordinator<P> {
    /// Creates a coordinator with an empty replica registry.
    pub fn new(partitioner: P) -> Self {
        Self {
            partitioner,
            replicas: HashMap::new(),
        }
    }

    /// Registers a replica handle under its node id.
    ///
    /// A candidate returned by the partitioner without a registered handle is
    /// treated as unreachable.
    pub fn add_replica(&mut self, replica: Arc<dyn Replica>) {
        self.replicas.insert(replica.node_id().to_owned(), replica);
    }

    /// Writes a value for the key.
    ///
    /// Candidates are tried in partitioner order until one accepts the
    /// primary write; that write is durable and version-bearing, and its
    /// stamped [`VersionedValue`] is then sent unmodified to the remaining
    /// candidates. Secondary replication is fire and forget: a failure is
    /// logged and neither retried nor surfaced, trading replication
    /// completeness for availability. Only if *every* candidate fails the
    /// primary attempt does the operation fail.
    pub fn put(
        &self,
        key: &ClientKey,
        value: &[u8],
        known_version: &VersionVector,
    ) -> Result<VersionedValue, NoAvailableReplica> {
        let candidates = self.partitioner.find_replicas(key);
        log::trace!(
            "writing key {} with candidates {:?}",
            key,
            candidates
        );
        let mut attempts = Vec::new();

        for (primary_index, node_id) in candidates.iter().enumerate() {
            let outcome = match self.replicas.get(node_id) {
                Some(replica) => replica.put_as_primary(key, value, known_version),
                None => Err(VernaError::Unreachable),
            };
            match outcome {
                Ok(written) => {
                    log::trace!(
                        "primary write of key {} accepted by {} as {:?}",
                        key,
                        node_id,
                        written.vector()
                    );
                    self.replicate(key, &written, &candidates[primary_index + 1..]);
                    return Ok(written);
                }
                Err(cause) => {
                    log::warn!(
                        "primary write of key {} failed on candidate {}: {}",
                        key,
                        node_id,
                        cause
                    );
                    attempts.push((node_id.clone(), cause));
                }
            }
        }

        Err(NoAvailableReplica { attempts })
    }

    /// Sends an accepted write to the remaining candidates, best effort.
    fn replicate(&self, key: &ClientKey, written: &VersionedValue, secondaries: &[String]) {
        for node_id in secondaries {
            log::trace!("replicating key {} to secondary {}", key, node_id);
            let outcome = match self.replicas.get(node_id) {
                Some(replica) => replica.put(key, written.clone()),
                None => Err(VernaError::Unreachable),
            };
            if let Err(cause) = outcome {
                log::warn!(
                    "dropping replication of key {} to secondary {}: {}",
                    key,
                    node_id,
                    cause
                );
            }
        }
    }

    /// Reads the key from all candidate replicas and merges the results.
    ///
    /// An unreachable replica is excluded from the union and logged, not
    /// treated as an error. The union is reduced to its maximal elements:
    /// a version survives only if no *other* element of the union descends
    /// it. The returned set has one element in the common case and more than
    /// one exactly when genuinely concurrent writes exist.
    pub fn get(&self, key: &ClientKey) -> HashSet<VersionedValue> {
        let mut union = HashSet::new();
        for node_id in self.partitioner.find_replicas(key) {
            let outcome = match self.replicas.get(&node_id) {
                Some(replica) => replica.get(key),
                None => Err(VernaError::Unreachable),
            };
            match outcome {
                Ok(versions) => union.extend(versions),
                Err(cause) => {
                    log::warn!(
                        "excluding replica {} from read of key {}: {}",
                        node_id,
                        key,
                        cause
                    );
                }
            }
        }
        log::trace!(
            "read of key {} merged {} version(s) before reduction",
            key,
            union.len()
        );
        maximal_elements(union)
    }

    /// Reads the key and reduces concurrent versions to one with the given
    /// resolver.
    ///
    /// Returns `None` without invoking the resolver if the key has never
    /// been written. Resolver errors propagate unchanged.
    pub fn get_resolved<R: ConflictResolver>(
        &self,
        key: &ClientKey,
        resolver: &R,
    ) -> eyre::Result<Option<VersionedValue>> {
        let versions = self.get(key);
        if versions.is_empty() {
            return Ok(None);
        }
        let resolved = resolver.resolve(versions.into_iter().collect())?;
        Ok(Some(resolved))
    }

    /// Selects the value with the newest wall-clock timestamp, ignoring
    /// version vectors entirely. Returns `None` on empty input.
    ///
    /// This depends on reasonably synchronized clocks across nodes and
    /// silently discards genuinely concurrent writes whose vectors would
    /// otherwise signal a conflict.
    pub fn get_with_last_write_wins(
        &self,
        values: Vec<TimestampedValue>,
    ) -> Option<VersionedValue> {
        values
            .into_iter()
            .max_by_key(|value| value.timestamp())
            .map(TimestampedValue::into_value)
    }
}

/// Discards every element that some other, structurally distinct element of
/// the collection descends.
fn maximal_elements(union: HashSet<VersionedValue>) -> HashSet<VersionedValue> {
    union
        .iter()
        .filter(|candidate| {
            !union
                .iter()
                .any(|other| other != *candidate && other.descends(candidate))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use verna_api::Timestamp;

    fn vector(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().copied().collect()
    }

    fn versioned(value: &[u8], entries: &[(&str, u64)]) -> VersionedValue {
        VersionedValue::new(value, vector(entries))
    }

    #[test]
    fn maximal_elements_drops_dominated_versions() {
        let superseded = versioned(b"old", &[("blue", 1)]);
        let newest = versioned(b"new", &[("blue", 2)]);
        let concurrent = versioned(b"other", &[("green", 1)]);

        let union: HashSet<_> = [superseded, newest.clone(), concurrent.clone()]
            .into_iter()
            .collect();

        assert_eq!(
            maximal_elements(union),
            [newest, concurrent].into_iter().collect()
        );
    }

    #[test]
    fn maximal_elements_keeps_a_singleton() {
        let only = versioned(b"v", &[("blue", 1)]);
        let union: HashSet<_> = [only.clone()].into_iter().collect();
        assert_eq!(maximal_elements(union), [only].into_iter().collect());
    }

    struct AllNodes(Vec<String>);

    impl Partitioner for AllNodes {
        fn find_replicas(&self, _key: &ClientKey) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn last_write_wins_selects_newest_timestamp() {
        let coordinator = Coordinator::new(AllNodes(vec![]));

        let values = vec![
            TimestampedValue::new(
                Timestamp::from_unix_millis(10).unwrap(),
                versioned(b"first", &[("blue", 3)]),
            ),
            TimestampedValue::new(
                Timestamp::from_unix_millis(30).unwrap(),
                versioned(b"third", &[("green", 1)]),
            ),
            TimestampedValue::new(
                Timestamp::from_unix_millis(20).unwrap(),
                versioned(b"second", &[("blue", 7)]),
            ),
        ];

        let chosen = coordinator.get_with_last_write_wins(values).unwrap();
        assert_eq!(chosen.value(), b"third");
    }

    #[test]
    fn last_write_wins_is_empty_for_no_input() {
        let coordinator = Coordinator::new(AllNodes(vec![]));
        assert_eq!(coordinator.get_with_last_write_wins(Vec::new()), None);
    }

    #[test]
    fn unregistered_candidate_counts_as_unreachable() {
        let coordinator = Coordinator::new(AllNodes(vec!["ghost".to_owned()]));

        let err = coordinator
            .put(&"key".into(), b"value", &VersionVector::new())
            .unwrap_err();
        assert_eq!(
            err.attempts(),
            &[("ghost".to_owned(), VernaError::Unreachable)]
        );
    }
}
