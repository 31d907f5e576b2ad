use super::VersionVector;

/// Pair of an opaque value and the [`VersionVector`] that was current when the
/// value was written.
///
/// Equality is structural over both fields: two `VersionedValue`s are the same
/// only if value *and* vector match. This is distinct from vector *dominance*,
/// which is exposed through [`descends`][Self::descends].
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VersionedValue {
    value: Vec<u8>,
    vector: VersionVector,
}

impl VersionedValue {
    /// Constructs a new pair from the given value and vector.
    pub fn new(value: impl Into<Vec<u8>>, vector: VersionVector) -> Self {
        Self {
            value: value.into(),
            vector,
        }
    }

    /// Returns the stored value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the stored value bytes, taking ownership.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Returns the version vector the value was written under.
    pub fn vector(&self) -> &VersionVector {
        &self.vector
    }

    /// Returns whether this value is causally at least as new as `other`.
    ///
    /// Forwards to [`VersionVector::descends`]; values with equal vectors
    /// descend each other even when their bytes differ.
    pub fn descends(&self, other: &Self) -> bool {
        self.vector.descends(&other.vector)
    }
}

#[cfg(test)]
mod tests {
    use super::VersionedValue;
    use crate::causal::VersionVector;

    #[test]
    fn equality_is_structural_over_both_fields() {
        let vector: VersionVector = [("blue", 1)].into_iter().collect();
        let value = VersionedValue::new(*b"alice", vector.clone());

        assert_eq!(value, VersionedValue::new(*b"alice", vector.clone()));
        assert_ne!(value, VersionedValue::new(*b"bob", vector.clone()));
        assert_ne!(
            value,
            VersionedValue::new(*b"alice", vector.increment("blue"))
        );
    }

    #[test]
    fn serde_round_trip() {
        let value = VersionedValue::new(
            *b"alice",
            [("blue", 1), ("green", 2)].into_iter().collect(),
        );

        let serialized = serde_json::to_string(&value).unwrap();
        let deserialized: VersionedValue = serde_json::from_str(&serialized).unwrap();
        assert_eq!(value, deserialized);
    }
}
