// Macrokb Combination Type
// Order-independent matcher over a fixed set of key identifiers

use std::fmt;

use smallvec::SmallVec;

use crate::key::{KeyId, KeyParseError};

/// A fixed chord of keys.
///
/// Keys are stored sorted, so two combinations built from the same keys in a
/// different order are equal and hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination {
    keys: Vec<KeyId>,
}

impl Combination {
    /// Create a new Combination from any ordering of keys
    pub fn new(keys: impl IntoIterator<Item = KeyId>) -> Self {
        let mut keys: Vec<KeyId> = keys.into_iter().collect();
        keys.sort();
        Self { keys }
    }

    /// Parse a `+`-separated combination string (`"KEY_GRAVE+KEY_TAB"`)
    pub fn parse(s: &str) -> Result<Self, KeyParseError> {
        let keys = s
            .split('+')
            .map(str::parse::<KeyId>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(keys))
    }

    /// Get the keys of this combination, sorted
    pub fn keys(&self) -> &[KeyId] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check whether `candidate` holds exactly these keys, in any order.
    pub fn matches<K: AsRef<str>>(&self, candidate: &[K]) -> bool {
        if candidate.len() != self.keys.len() {
            return false;
        }

        let mut sorted: SmallVec<[&str; 8]> = candidate.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();

        sorted
            .iter()
            .zip(self.keys.iter())
            .all(|(ele, key)| *ele == key.name())
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.keys.iter().map(KeyId::name).collect();
        write!(f, "{}", parts.join("+"))
    }
}
