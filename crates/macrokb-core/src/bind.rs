use std::fmt;
use std::sync::Arc;

use crate::combination::Combination;

/// Zero-argument effectful action attached to a bind.
///
/// Shared so that every device session of the same keyboard can hold its own
/// copy of the mode list.
pub type BindAction = Arc<dyn Fn() + Send + Sync>;

/// A combination paired with the action it triggers
#[derive(Clone)]
pub struct Bind {
    combination: Combination,
    action: BindAction,
}

impl Bind {
    pub fn new(combination: Combination, action: BindAction) -> Self {
        Self {
            combination,
            action,
        }
    }

    /// Convenience constructor wrapping a closure
    pub fn from_fn(combination: Combination, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(combination, Arc::new(action))
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    pub fn matches<K: AsRef<str>>(&self, candidate: &[K]) -> bool {
        self.combination.matches(candidate)
    }

    /// Run the action. Its outcome is not observed.
    pub fn fire(&self) {
        (self.action)();
    }

    /// True when both binds are the same registered bind
    pub fn same_as(&self, other: &Bind) -> bool {
        Arc::ptr_eq(&self.action, &other.action) && self.combination == other.combination
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind")
            .field("combination", &self.combination.to_string())
            .finish_non_exhaustive()
    }
}
