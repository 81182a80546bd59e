// Macrokb Config Parser - TOML with Serde
// Parses bind tables and general settings from TOML files

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::bind::BindAction;
use crate::combination::Combination;
use crate::controller::ControllerChoice;
use crate::key::{KeyId, KeyParseError};
use crate::launcher;
use crate::registry::{BindSpec, BindTable, RegistrationError, Registry};

/// Default key that rotates to the next mode
pub const DEFAULT_MODE_ADVANCE_KEY: &str = "KEY_SCROLLLOCK";
/// Default key that toggles passthrough
pub const DEFAULT_PASSTHROUGH_TOGGLE_KEY: &str = "KEY_SYSRQ";
/// Default device name match
pub const DEFAULT_DEVICE_MATCH: &str = "keyboard";
/// Default LED animation step
pub const DEFAULT_LIGHT_INTERVAL_MS: u64 = 334;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid combo string: {0}")]
    InvalidCombo(String),

    #[error("Invalid action for '{combo}' in '{table}': {reason}")]
    InvalidAction {
        table: String,
        combo: String,
        reason: String,
    },

    #[error("Invalid controller: {0}")]
    InvalidController(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// General settings
    #[serde(default)]
    pub general: Option<GeneralConfig>,

    /// Bind tables; each one is a mode of its keyboard
    #[serde(default)]
    pub bind_table: Vec<BindTableToml>,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Key that rotates to the next mode
    pub mode_advance_key: Option<String>,
    /// Key that toggles passthrough (non-exclusive runs only)
    pub passthrough_toggle_key: Option<String>,
    /// Case-insensitive substring selecting keyboard devices by name
    pub device_match: Option<String>,
    /// LED animation step (milliseconds)
    pub light_interval_ms: Option<u64>,
}

/// One `[[bind_table]]` entry.
///
/// The phase tables are maps so that document order is bind priority.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindTableToml {
    pub keyboard_name: Option<String>,
    pub name: Option<String>,
    pub controller: Option<String>,
    pub down: Option<IndexMap<String, ActionToml>>,
    pub hold: Option<IndexMap<String, ActionToml>>,
    pub up: Option<IndexMap<String, ActionToml>>,
}

/// Right-hand side of a bind: exactly one of `log` or `run`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionToml {
    pub log: Option<String>,
    pub run: Option<Vec<String>>,
    pub cwd: Option<PathBuf>,
}

/// A resolved bind action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    /// Write a message to the log
    Log(String),
    /// Launch a command as the logged-in user
    Run { argv: Vec<String>, cwd: Option<PathBuf> },
}

impl ActionSpec {
    /// Turn the description into a callable bind action
    pub fn into_action(self) -> BindAction {
        match self {
            ActionSpec::Log(message) => Arc::new(move || log::info!("{}", message)),
            ActionSpec::Run { argv, cwd } => Arc::new(move || {
                if let Err(e) = launcher::run_as_user(&argv, cwd.as_deref()) {
                    log::warn!("Failed to launch {:?}: {}", argv, e);
                }
            }),
        }
    }
}

/// General settings with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    pub mode_advance_key: KeyId,
    pub passthrough_toggle_key: KeyId,
    pub device_match: String,
    pub light_interval: Duration,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            mode_advance_key: KeyId::from(DEFAULT_MODE_ADVANCE_KEY),
            passthrough_toggle_key: KeyId::from(DEFAULT_PASSTHROUGH_TOGGLE_KEY),
            device_match: DEFAULT_DEVICE_MATCH.to_string(),
            light_interval: Duration::from_millis(DEFAULT_LIGHT_INTERVAL_MS),
        }
    }
}

/// A declared table whose actions are not yet callable
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub keyboard_name: Option<String>,
    pub name: Option<String>,
    pub controller: ControllerChoice,
    pub down: Option<Vec<(Combination, ActionSpec)>>,
    pub hold: Option<Vec<(Combination, ActionSpec)>>,
    pub up: Option<Vec<(Combination, ActionSpec)>>,
}

impl TableEntry {
    fn into_bind_table(self) -> BindTable {
        let convert = |binds: Option<Vec<(Combination, ActionSpec)>>| {
            binds.map(|binds| {
                binds
                    .into_iter()
                    .map(|(combo, spec)| BindSpec::new(combo.keys().to_vec(), spec.into_action()))
                    .collect::<Vec<_>>()
            })
        };

        BindTable {
            keyboard_name: self.keyboard_name,
            name: self.name,
            down: convert(self.down),
            hold: convert(self.hold),
            up: convert(self.up),
            controller: self.controller,
        }
    }
}

/// Parsed configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub general: GeneralSettings,
    pub tables: Vec<TableEntry>,
}

impl Config {
    /// Default config location: `~/.config/macrokb/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("macrokb").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        let general = match raw.general {
            Some(general) => parse_general(general)?,
            None => GeneralSettings::default(),
        };

        let tables = raw
            .bind_table
            .into_iter()
            .map(parse_table)
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("parsed {} bind table(s)", tables.len());
        Ok(Self { general, tables })
    }

    /// Validate every table and build the registry
    pub fn to_registry(&self) -> Result<Registry, ConfigError> {
        let tables = self.tables.iter().cloned().map(TableEntry::into_bind_table);
        Ok(Registry::from_tables(tables)?)
    }
}

fn parse_key(name: &str) -> Result<KeyId, ConfigError> {
    name.parse::<KeyId>().map_err(|_| ConfigError::InvalidKey(name.to_string()))
}

fn parse_general(general: GeneralConfig) -> Result<GeneralSettings, ConfigError> {
    let defaults = GeneralSettings::default();
    Ok(GeneralSettings {
        mode_advance_key: match general.mode_advance_key {
            Some(name) => parse_key(&name)?,
            None => defaults.mode_advance_key,
        },
        passthrough_toggle_key: match general.passthrough_toggle_key {
            Some(name) => parse_key(&name)?,
            None => defaults.passthrough_toggle_key,
        },
        device_match: general.device_match.unwrap_or(defaults.device_match),
        light_interval: general
            .light_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.light_interval),
    })
}

fn parse_table(table: BindTableToml) -> Result<TableEntry, ConfigError> {
    let label = table
        .name
        .clone()
        .or_else(|| table.keyboard_name.clone())
        .unwrap_or_else(|| "<unnamed>".to_string());

    let controller = match table.controller {
        Some(name) => name.parse().map_err(ConfigError::InvalidController)?,
        None => ControllerChoice::Default,
    };

    let parse_binds = |binds: Option<IndexMap<String, ActionToml>>| {
        binds
            .map(|binds| {
                binds
                    .into_iter()
                    .map(|(combo, action)| -> Result<_, ConfigError> {
                        let combination = Combination::parse(&combo).map_err(|e| match e {
                            KeyParseError::Empty => ConfigError::InvalidCombo(combo.clone()),
                            KeyParseError::Unknown(name) => ConfigError::InvalidKey(name),
                        })?;
                        let spec = parse_action(&label, &combo, action)?;
                        Ok((combination, spec))
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()
            })
            .transpose()
    };

    Ok(TableEntry {
        down: parse_binds(table.down)?,
        hold: parse_binds(table.hold)?,
        up: parse_binds(table.up)?,
        keyboard_name: table.keyboard_name,
        name: table.name,
        controller,
    })
}

fn parse_action(table: &str, combo: &str, action: ActionToml) -> Result<ActionSpec, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAction {
        table: table.to_string(),
        combo: combo.to_string(),
        reason: reason.to_string(),
    };

    match (action.log, action.run) {
        (Some(message), None) => {
            if action.cwd.is_some() {
                return Err(invalid("'cwd' only applies to 'run'"));
            }
            Ok(ActionSpec::Log(message))
        }
        (None, Some(argv)) => {
            if argv.is_empty() || argv[0].trim().is_empty() {
                return Err(invalid("'run' needs a command"));
            }
            Ok(ActionSpec::Run {
                argv,
                cwd: action.cwd,
            })
        }
        (Some(_), Some(_)) => Err(invalid("set either 'log' or 'run', not both")),
        (None, None) => Err(invalid("expected 'log' or 'run'")),
    }
}
