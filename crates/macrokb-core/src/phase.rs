use strum_macros::{Display, EnumString};

/// Gesture phase of a key event.
///
/// The discriminants are the kernel `EV_KEY` values:
///   0 == 'released' (Up)
///   1 == 'pressed' (Down)
///   2 == 'repeated' (Hold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(i32)]
pub enum Phase {
    Up = 0,
    Down = 1,
    Hold = 2,
}

impl Phase {
    /// Create Phase from the i32 event value (from evdev)
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Phase::Up),
            1 => Some(Phase::Down),
            2 => Some(Phase::Hold),
            _ => None,
        }
    }

    /// Convert Phase to its i32 representation
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// All phases in bind-table order
    pub const ALL: [Phase; 3] = [Phase::Down, Phase::Hold, Phase::Up];
}
