//! The caller-supplied conflict-resolution contract.

use crate::causal::VersionedValue;

/// A strategy that reduces a set of concurrently written versions to one.
///
/// The store places no constraint on the logic beyond requiring that one
/// element is chosen (or a merged one synthesized) from the supplied
/// versions. The trait is implemented for plain closures, so a resolver is
/// usually injected as a function value at the call site:
///
/// ```
/// use verna_api::{causal::VersionedValue, resolver::ConflictResolver};
/// use eyre::eyre;
///
/// // keep the longest value
/// let longest = |mut values: Vec<VersionedValue>| {
///     values.sort_by_key(|v| v.value().len());
///     values.pop().ok_or_else(|| eyre!("no versions supplied"))
/// };
///
/// let chosen = longest
///     .resolve(vec![
///         VersionedValue::new(*b"bob", [("blue", 1)].into_iter().collect()),
///         VersionedValue::new(*b"alice", [("green", 1)].into_iter().collect()),
///     ])
///     .unwrap();
/// assert_eq!(chosen.value(), b"alice");
/// ```
pub trait ConflictResolver {
    /// Chooses a single value from the given concurrent versions.
    ///
    /// The supplied collection is never empty. Errors are propagated
    /// unchanged to the caller that requested the resolved read.
    fn resolve(&self, values: Vec<VersionedValue>) -> eyre::Result<VersionedValue>;
}

impl<F> ConflictResolver for F
where
    F: Fn(Vec<VersionedValue>) -> eyre::Result<VersionedValue>,
{
    fn resolve(&self, values: Vec<VersionedValue>) -> eyre::Result<VersionedValue> {
        self(values)
    }
}
