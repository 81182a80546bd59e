// Macrokb Controller Marks
// Time-stamped key marks that age out of a debounce window

use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::key::KeyId;

/// Ordered collection of `(key, arrival)` marks.
///
/// The same key may appear several times (kernel auto-repeat, a chord key
/// re-pressed inside the window). Aging rebuilds the collection instead of
/// removing entries in place.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    entries: Vec<(KeyId, Instant)>,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mark
    pub fn push(&mut self, key: KeyId, at: Instant) {
        self.entries.push((key, at));
    }

    /// Remove and return every mark older than `window` at `now`.
    ///
    /// A mark exactly `window` old is still recent.
    pub fn take_expired(&mut self, now: Instant, window: Duration) -> Vec<KeyId> {
        let (expired, fresh): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(_, at)| now.saturating_duration_since(*at) > window);
        self.entries = fresh;
        expired.into_iter().map(|(key, _)| key).collect()
    }

    pub fn contains(&self, key: &KeyId) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Key identifiers in arrival order
    pub fn keys(&self) -> SmallVec<[KeyId; 8]> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
