//! The transport seam between the coordinator and replica nodes.

use std::collections::HashSet;

use verna_api::{ClientKey, VernaError, VersionVector, VersionedValue};

/// Handle to a replica node's store, local or remote.
///
/// The coordinator only talks to replicas through this trait, so the three
/// store operations can be carried over any transport. A transport failure is
/// reported as [`VernaError::Unreachable`]; the coordinator treats it exactly
/// like an application-level rejection when falling back to the next write
/// candidate, and excludes the replica from the merge on reads.
///
/// [`ReplicaStore`][crate::ReplicaStore] implements this trait directly for
/// in-process clusters.
pub trait Replica: Send + Sync {
    /// The id of the node this handle talks to.
    fn node_id(&self) -> &str;

    /// Performs the version-incrementing primary write on the replica.
    fn put_as_primary(
        &self,
        key: &ClientKey,
        value: &[u8],
        known_version: &VersionVector,
    ) -> Result<VersionedValue, VernaError>;

    /// Applies a value already stamped by the write's primary.
    fn put(&self, key: &ClientKey, value: VersionedValue) -> Result<(), VernaError>;

    /// Reads the replica's current version set for the key.
    fn get(&self, key: &ClientKey) -> Result<HashSet<VersionedValue>, VernaError>;
}
