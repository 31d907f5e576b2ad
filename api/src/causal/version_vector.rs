use std::collections::BTreeMap;

/// Result of comparing two [`VersionVector`]s under the causal partial order.
///
/// This is not a total order: [`Concurrent`][Self::Concurrent] is an expected
/// outcome whenever two writes were made without knowledge of each other.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum CausalOrdering {
    /// The left vector is not strictly newer than the right one.
    ///
    /// Equal vectors deliberately compare as `Before` instead of a separate
    /// `Equal` case. The store relies on this to reject a write whose vector
    /// repeats one that is already applied, so do not add an `Equal` variant
    /// without updating every caller of [`VersionVector::descends`].
    Before,
    /// The left vector is strictly newer than the right one.
    After,
    /// Neither vector is newer; the writes happened concurrently.
    Concurrent,
}

/// A per-key causal counter set, one counter per node that has written the key.
///
/// A missing node id is equivalent to a counter of zero, i.e. the node has
/// never written the key. Instances are immutable: [`increment`][Self::increment]
/// returns a new vector and never mutates the receiver, so counters never
/// decrease across the instances derived from one another.
///
/// ## Examples
///
/// ```
/// use verna_api::causal::{CausalOrdering, VersionVector};
///
/// let empty = VersionVector::new();
/// let blue_1 = empty.increment("blue");
/// assert_eq!(blue_1.counter("blue"), 1);
/// assert_eq!(empty.counter("blue"), 0);
///
/// // one increment ahead is strictly newer
/// assert_eq!(blue_1.compare(&empty), CausalOrdering::After);
///
/// // writes on disjoint nodes are concurrent
/// let green_1 = empty.increment("green");
/// assert_eq!(blue_1.compare(&green_1), CausalOrdering::Concurrent);
/// ```
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VersionVector {
    counters: BTreeMap<String, u64>,
}

impl VersionVector {
    /// Creates an empty vector, i.e. the causal history of a key that was
    /// never written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter for the given node, or zero if the node never
    /// wrote the key.
    pub fn counter(&self, node_id: &str) -> u64 {
        self.counters.get(node_id).copied().unwrap_or(0)
    }

    /// Returns an iterator over the `(node id, counter)` entries of the vector.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(node, &count)| (node.as_str(), count))
    }

    /// Returns a new vector equal to the receiver except that the counter for
    /// `node_id` is one greater (or 1 if it was absent).
    ///
    /// The receiver is left unchanged.
    pub fn increment(&self, node_id: &str) -> Self {
        let mut counters = self.counters.clone();
        *counters.entry(node_id.to_owned()).or_insert(0) += 1;
        Self { counters }
    }

    /// Compares two vectors under the causal partial order.
    ///
    /// A vector dominates another if it has a counter for a node the other
    /// lacks, or a bigger counter for a node both have, while the reverse
    /// holds for neither. If both vectors dominate in this sense (disjoint
    /// extra nodes, or counters pulling in opposite directions), the result
    /// is [`CausalOrdering::Concurrent`]. If neither does, the vectors are
    /// equal and the result is [`CausalOrdering::Before`] (see the note on
    /// that variant).
    pub fn compare(&self, other: &Self) -> CausalOrdering {
        let mut self_bigger = false;
        let mut other_bigger = false;

        for (node, &count) in &self.counters {
            match other.counters.get(node) {
                None => self_bigger = true,
                Some(&other_count) if count > other_count => self_bigger = true,
                Some(&other_count) if other_count > count => other_bigger = true,
                Some(_) => {}
            }
        }
        for node in other.counters.keys() {
            if !self.counters.contains_key(node) {
                other_bigger = true;
            }
        }

        match (self_bigger, other_bigger) {
            (true, false) => CausalOrdering::After,
            (true, true) => CausalOrdering::Concurrent,
            (false, _) => CausalOrdering::Before,
        }
    }

    /// Returns whether this vector causally descends `other`, i.e. is at
    /// least as new as `other`.
    ///
    /// Equal vectors descend each other. The store's reject-if-old check is
    /// built on this: a write repeating an already-applied vector is refused
    /// because the stored vector descends it.
    pub fn descends(&self, other: &Self) -> bool {
        other.compare(self) == CausalOrdering::Before
    }
}

impl FromIterator<(String, u64)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, u64)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(node, count)| (node.to_owned(), count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CausalOrdering, VersionVector};

    fn vector(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().copied().collect()
    }

    #[test]
    fn equal_vectors_compare_as_before() {
        let empty = VersionVector::new();
        assert_eq!(empty.compare(&empty), CausalOrdering::Before);

        let v = vector(&[("blue", 2), ("green", 1)]);
        assert_eq!(v.compare(&v), CausalOrdering::Before);
        assert_eq!(v.compare(&v.clone()), CausalOrdering::Before);
    }

    #[test]
    fn increment_is_strictly_newer() {
        let v = vector(&[("blue", 1)]);
        let incremented = v.increment("green");

        assert_eq!(incremented.compare(&v), CausalOrdering::After);
        assert_eq!(v.compare(&incremented), CausalOrdering::Before);
        assert_eq!(v.counter("green"), 0);
        assert_eq!(incremented.counter("green"), 1);
    }

    #[test]
    fn increment_bumps_existing_counter() {
        let v = vector(&[("blue", 41)]);
        assert_eq!(v.increment("blue").counter("blue"), 42);
    }

    #[test]
    fn antisymmetry() {
        let older = vector(&[("blue", 1), ("green", 1)]);
        let newer = vector(&[("blue", 1), ("green", 2)]);

        assert_eq!(newer.compare(&older), CausalOrdering::After);
        assert_eq!(older.compare(&newer), CausalOrdering::Before);
    }

    #[test]
    fn counters_pulling_in_opposite_directions_are_concurrent() {
        let a = vector(&[("blue", 2), ("green", 1)]);
        let b = vector(&[("blue", 1), ("green", 2)]);

        assert_eq!(a.compare(&b), CausalOrdering::Concurrent);
        assert_eq!(b.compare(&a), CausalOrdering::Concurrent);
    }

    #[test]
    fn extra_node_dominates() {
        let a = vector(&[("blue", 1), ("green", 1), ("red", 1)]);
        let b = vector(&[("blue", 1), ("green", 1)]);

        assert_eq!(a.compare(&b), CausalOrdering::After);
        assert_eq!(b.compare(&a), CausalOrdering::Before);
    }

    #[test]
    fn disjoint_extra_nodes_are_concurrent() {
        let a = vector(&[("blue", 1), ("green", 1), ("red", 1)]);
        let b = vector(&[("blue", 1), ("green", 1), ("pink", 1)]);

        assert_eq!(a.compare(&b), CausalOrdering::Concurrent);
    }

    #[test]
    fn descends_includes_the_equal_case() {
        let v = vector(&[("blue", 2)]);

        assert!(v.descends(&v));
        assert!(v.descends(&vector(&[("blue", 1)])));
        assert!(v.increment("green").descends(&v));
        assert!(!v.descends(&v.increment("green")));
        assert!(!v.descends(&vector(&[("green", 1)])));
    }
}
