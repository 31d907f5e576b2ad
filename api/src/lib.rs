#![warn(missing_docs)]

//! Value types shared between `verna` nodes and clients.
//!
//! The [`causal`] module contains the [`VersionVector`] and [`VersionedValue`]
//! types that the store uses to detect whether two writes to the same key are
//! causally ordered or happened concurrently. The [`resolver`] module defines
//! the contract for caller-supplied conflict resolution, and the [`timestamp`]
//! module provides the wall-clock representation used by the last-write-wins
//! convenience path.

use std::{error::Error, fmt::Display, sync::Arc};

pub mod causal;
pub mod resolver;
pub mod timestamp;

pub use causal::{CausalOrdering, VersionVector, VersionedValue};
pub use resolver::ConflictResolver;
pub use timestamp::{Timestamp, TimestampedValue};

/// A string-based key type used to store user-supplied data.
///
/// We use an [`Arc`]-wrapped [`String`] because keys often get cloned. For bare
/// strings, this would require a reallocation, but with the `Arc` wrapper only a
/// reference counter is incremented.
#[derive(Debug, PartialEq, Eq, Hash, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientKey(Arc<String>);

impl std::ops::Deref for ClientKey {
    type Target = Arc<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Arc<String>> for ClientKey {
    fn from(k: Arc<String>) -> Self {
        Self(k)
    }
}

impl From<String> for ClientKey {
    fn from(k: String) -> Self {
        Self::from(Arc::new(k))
    }
}

impl From<&str> for ClientKey {
    fn from(k: &str) -> Self {
        Self::from(k.to_owned())
    }
}

/// Used to signal errors on replica operations.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum VernaError {
    /// The write carried a version vector that is dominated by, or equal to,
    /// a version already stored for the key. The write was not applied.
    ObsoleteVersion,
    /// The requested key does not exist.
    KeyDoesNotExist,
    /// The replica could not be reached.
    Unreachable,
}

impl Display for VernaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObsoleteVersion => write!(
                f,
                "The write is obsolete: an equal or newer version is already stored for the key."
            ),
            Self::KeyDoesNotExist => write!(f, "The requested key does not exist."),
            Self::Unreachable => write!(f, "The replica could not be reached."),
        }
    }
}

impl Error for VernaError {}
