// Macrokb Config API
// TOML bind tables and general settings

pub mod parser;

pub use parser::{
    ActionSpec, Config, ConfigError, GeneralSettings, TableEntry, DEFAULT_DEVICE_MATCH,
    DEFAULT_LIGHT_INTERVAL_MS, DEFAULT_MODE_ADVANCE_KEY, DEFAULT_PASSTHROUGH_TOGGLE_KEY,
};
