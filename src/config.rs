//! Types for parsing verna configuration files.
//!
//! The top level config type is [`Config`].

use serde::{Deserialize, Serialize};

/// The top level config type.
///
/// This type can be read and written to config files using the
/// [`serde::Serialize`] and [`serde::Deserialize`] implementations.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The ids of the nodes that make up the cluster.
    pub nodes: Vec<String>,
    /// Defines how keys are spread across the nodes.
    pub partitioning: Partitioning,
}

/// Specifies how the hash ring places keys on nodes.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize, Copy)]
#[serde(rename_all = "kebab-case")]
pub struct Partitioning {
    /// The number of replicas that should hold each key.
    pub replication_factor: usize,
    /// The number of virtual entries created per node on the hash ring.
    pub virtual_entry_num: u32,
}
