#![warn(missing_docs)]

//! A leaderless key-value store core that detects and retains conflicting
//! writes with per-key version vectors.
//!
//! Writes are routed through a [`Coordinator`], which asks a [`Partitioner`]
//! for the ordered replica candidates of a key and performs the write on the
//! first reachable candidate, the *primary* for that write. Only the primary
//! advances the key's [`VersionVector`]; the stamped [`VersionedValue`] is
//! then replicated verbatim, best effort, to the remaining candidates. A read
//! fans out to all candidates and merges the results into the set of
//! *maximal* versions: one value in the common case, several exactly when
//! genuinely concurrent writes exist.
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use verna::{Coordinator, HashRing, ReplicaStore, VersionVector};
//!
//! let mut ring = HashRing::new(2);
//! ring.insert_node("blue");
//! ring.insert_node("green");
//!
//! let mut coordinator = Coordinator::new(ring);
//! coordinator.add_replica(Arc::new(ReplicaStore::new("blue")));
//! coordinator.add_replica(Arc::new(ReplicaStore::new("green")));
//!
//! let written = coordinator
//!     .put(&"name".into(), b"alice", &VersionVector::new())
//!     .unwrap();
//! let read = coordinator.get(&"name".into());
//! assert_eq!(read.len(), 1);
//! assert!(read.contains(&written));
//! ```

pub use verna_api::{
    causal::{CausalOrdering, VersionVector, VersionedValue},
    resolver::ConflictResolver,
    timestamp::{Timestamp, TimestampedValue},
    ClientKey, VernaError,
};

pub mod config;
pub mod coordinator;
pub mod hash_ring;
pub mod replica;
pub mod store;

pub use coordinator::{Coordinator, NoAvailableReplica};
pub use hash_ring::{HashRing, Partitioner};
pub use replica::Replica;
pub use store::ReplicaStore;
