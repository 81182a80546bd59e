// Macrokb Events
// Raw source events and their normalized key-event form

use std::fmt;
use std::time::Instant;

use smallvec::{smallvec, SmallVec};

use crate::key::KeyId;
use crate::phase::Phase;

/// EV_KEY event type code from input-event-codes.h
pub const EV_KEY: u16 = 0x01;

/// Codes reported by a single key event. One code is the overwhelmingly
/// common case.
pub type KeyCodes = SmallVec<[KeyId; 2]>;

/// Check if an event is a key event.
pub fn is_key_event(event_type: u16) -> bool {
    event_type == EV_KEY
}

/// One event exactly as the input source reported it.
///
/// Kept verbatim so passthrough can forward it unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
    pub timestamp: Instant,
}

impl RawEvent {
    pub fn new(kind: u16, code: u16, value: i32, timestamp: Instant) -> Self {
        Self {
            kind,
            code,
            value,
            timestamp,
        }
    }

    /// Shorthand for an `EV_KEY` event
    pub fn key(code: u16, value: i32, timestamp: Instant) -> Self {
        Self::new(EV_KEY, code, value, timestamp)
    }

    /// Normalize into a [`KeyEvent`].
    ///
    /// Returns `None` for non-key events and for key values outside the
    /// release/press/repeat range.
    pub fn normalize(&self) -> Option<KeyEvent> {
        if !is_key_event(self.kind) {
            return None;
        }
        let phase = Phase::from_i32(self.value)?;
        Some(KeyEvent::new(KeyId::from_code(self.code), phase, self.timestamp))
    }
}

/// Normalized representation of one input occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub codes: KeyCodes,
    pub phase: Phase,
    pub timestamp: Instant,
}

impl KeyEvent {
    /// Create a key event reporting a single identifier
    pub fn new(code: KeyId, phase: Phase, timestamp: Instant) -> Self {
        Self {
            codes: smallvec![code],
            phase,
            timestamp,
        }
    }

    /// Create a key event reporting several simultaneous identifiers.
    ///
    /// Returns `None` when `codes` is empty.
    pub fn with_codes(
        codes: impl IntoIterator<Item = KeyId>,
        phase: Phase,
        timestamp: Instant,
    ) -> Option<Self> {
        let codes: KeyCodes = codes.into_iter().collect();
        if codes.is_empty() {
            return None;
        }
        Some(Self {
            codes,
            phase,
            timestamp,
        })
    }

    /// True when this event reports exactly `key` and nothing else
    pub fn is_single(&self, key: &KeyId) -> bool {
        self.codes.len() == 1 && self.codes[0] == *key
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.codes.iter().map(KeyId::name).collect();
        write!(f, "{} {}", names.join("/"), self.phase)
    }
}
