//! Key partitioning across nodes.

use std::{
    collections::{hash_map::DefaultHasher, BTreeMap},
    hash::{Hash, Hasher},
};

use verna_api::ClientKey;

/// Sets the default number of virtual entries that are created per node in
/// the hash ring.
///
/// The virtual nodes are spread uniformly across the hash ring using
/// consistent hashing. This way keys are uniformly distributed across nodes
/// even if the keys themselves are not uniformly distributed.
const VIRTUAL_ENTRY_NUM: u32 = 3000;

/// Maps a key to the ordered list of nodes that should hold it.
///
/// The returned list must be deterministic for a given key and cluster
/// topology. The first entry is tried as the primary for a write; the
/// remaining entries serve as fallbacks and secondaries.
pub trait Partitioner: Send + Sync {
    /// Returns the ordered replica candidates for the key.
    fn find_replicas(&self, key: &ClientKey) -> Vec<String>;
}

/// A consistent-hashing [`Partitioner`] with virtual nodes.
///
/// Each node is inserted under many virtual ids so that keys spread evenly
/// and the departure of a node only moves the keys it held. Looking up a key
/// walks the ring clockwise from the key's hash and collects distinct node
/// ids until the replication factor is reached.
pub struct HashRing {
    ring: BTreeMap<u64, VirtualNode>,
    replication_factor: usize,
    virtual_entry_num: u32,
}

impl HashRing {
    /// Creates an empty ring that returns up to `replication_factor`
    /// candidates per key.
    pub fn new(replication_factor: usize) -> Self {
        Self::with_virtual_entries(replication_factor, VIRTUAL_ENTRY_NUM)
    }

    /// Creates an empty ring with a custom number of virtual entries per
    /// node.
    pub fn with_virtual_entries(replication_factor: usize, virtual_entry_num: u32) -> Self {
        Self {
            ring: BTreeMap::new(),
            replication_factor,
            virtual_entry_num,
        }
    }

    /// Inserts a node, spreading its virtual entries across the ring.
    pub fn insert_node(&mut self, node_id: &str) {
        for virtual_id in 0..self.virtual_entry_num {
            let virtual_node = VirtualNode::new(node_id.to_owned(), virtual_id);
            self.ring.insert(hash(&virtual_node), virtual_node);
        }
    }

    /// Removes all of a node's virtual entries from the ring.
    pub fn remove_node(&mut self, node_id: &str) {
        for virtual_id in 0..self.virtual_entry_num {
            let virtual_node = VirtualNode::new(node_id.to_owned(), virtual_id);
            self.ring.remove(&hash(&virtual_node));
        }
    }

    /// The number of virtual entries currently on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns whether the ring contains no nodes.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns an iterator over the ring's entries, starting at the hash of
    /// the given key and wrapping around.
    fn entries_starting_at(&self, key: &ClientKey) -> impl Iterator<Item = &VirtualNode> {
        let hash = hash(key);
        self.ring
            .range(hash..)
            .chain(self.ring.range(..hash))
            .map(|(_k, v)| v)
    }
}

impl Partitioner for HashRing {
    fn find_replicas(&self, key: &ClientKey) -> Vec<String> {
        let mut replicas = Vec::new();
        for virtual_node in self.entries_starting_at(key) {
            if replicas.len() >= self.replication_factor {
                break;
            }
            if !replicas.iter().any(|id| id == virtual_node.node_id()) {
                replicas.push(virtual_node.node_id().to_owned());
            }
        }
        replicas
    }
}

fn hash<T: Hash + ?Sized>(data: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

#[derive(PartialEq, Eq, Hash)]
struct VirtualNode {
    node_id: String,
    virtual_id: u32,
}

impl VirtualNode {
    fn new(node_id: String, virtual_id: u32) -> Self {
        Self {
            node_id,
            virtual_id,
        }
    }

    /// Gets the id of the node that this virtual node belongs to.
    fn node_id(&self) -> &str {
        self.node_id.as_str()
    }
}
