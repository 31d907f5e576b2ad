//! Causal-history tracking for key-value writes.
//!
//! Every write to a key carries a [`VersionVector`] describing the causal
//! history the writer had observed. Comparing two vectors yields a
//! [`CausalOrdering`]: one write strictly follows the other, or the two
//! happened concurrently. Concurrent writes are a first-class outcome of a
//! leaderless store, not an error; both values are retained side by side
//! until a caller resolves them.

pub use self::{
    version_vector::{CausalOrdering, VersionVector},
    versioned_value::VersionedValue,
};

mod version_vector;
mod versioned_value;
