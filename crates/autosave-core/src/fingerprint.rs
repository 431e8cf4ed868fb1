//! Content fingerprints for change detection.
//!
//! A fingerprint is a hash of an entity's mutable fields, used purely for
//! equality comparison between the edit buffer, the last-saved snapshot,
//! and incoming authoritative copies. It is never persisted or sent over
//! the wire.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Equality-comparison value derived from an entity's mutable fields.
///
/// Two entities with identical field values produce identical
/// fingerprints. The entity identifier is excluded so that the
/// server assigning an id on first create does not register as a
/// content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Compute a fingerprint by hashing a value.
    ///
    /// Callers hash a canonical representation of their mutable fields
    /// (fixed field sequence, timestamps reduced to epoch instants) so
    /// that representation differences don't produce distinct prints.
    pub fn of<T: Hash>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_produce_equal_fingerprints() {
        let a = Fingerprint::of(&("caption", 3u64));
        let b = Fingerprint::of(&("caption", 3u64));
        assert_eq!(a, b);
    }

    #[test]
    fn different_values_produce_different_fingerprints() {
        let a = Fingerprint::of(&"hello");
        let b = Fingerprint::of(&"hello!");
        assert_ne!(a, b);
    }
}
