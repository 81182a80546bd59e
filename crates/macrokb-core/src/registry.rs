// Macrokb Bind-Table Registry
// Explicit registration and validation of per-keyboard bind tables

use indexmap::IndexMap;

use crate::bind::{Bind, BindAction};
use crate::combination::Combination;
use crate::controller::{ControllerChoice, ControllerKind};
use crate::key::KeyId;
use crate::mode::Mode;
use crate::phase::Phase;

/// Registration errors, raised before any session starts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Bind table '{table}' is missing required field '{field}'")]
    MissingField { table: String, field: &'static str },

    #[error("Bind table '{table}' has a {phase} bind with no keys")]
    EmptyCombination { table: String, phase: Phase },

    #[error("Bind table '{table}' is declared twice for keyboard '{keyboard}'")]
    DuplicateTable { table: String, keyboard: String },
}

/// One declared bind: the keys of the chord and what to do
#[derive(Clone)]
pub struct BindSpec {
    pub keys: Vec<KeyId>,
    pub action: BindAction,
}

impl BindSpec {
    pub fn new(keys: impl IntoIterator<Item = KeyId>, action: BindAction) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            action,
        }
    }
}

/// A bind table as declared by the user, before validation.
///
/// Every field the registry requires is optional here so that an incomplete
/// declaration is reported instead of failing to construct.
#[derive(Clone, Default)]
pub struct BindTable {
    pub keyboard_name: Option<String>,
    pub name: Option<String>,
    pub down: Option<Vec<BindSpec>>,
    pub hold: Option<Vec<BindSpec>>,
    pub up: Option<Vec<BindSpec>>,
    pub controller: ControllerChoice,
}

impl BindTable {
    /// Start a complete, empty table for `keyboard_name`
    pub fn for_keyboard(keyboard_name: impl Into<String>) -> Self {
        Self {
            keyboard_name: Some(keyboard_name.into()),
            down: Some(Vec::new()),
            hold: Some(Vec::new()),
            up: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_controller(mut self, controller: ControllerChoice) -> Self {
        self.controller = controller;
        self
    }

    /// Append a bind to the given phase table, creating it if absent
    pub fn bind(
        mut self,
        phase: Phase,
        keys: &[&str],
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let spec = BindSpec::new(
            keys.iter().map(|k| KeyId::from(*k)),
            std::sync::Arc::new(action),
        );
        let list = match phase {
            Phase::Down => &mut self.down,
            Phase::Hold => &mut self.hold,
            Phase::Up => &mut self.up,
        };
        list.get_or_insert_with(Vec::new).push(spec);
        self
    }
}

/// A validated table: the mode prototype and how to drive it
#[derive(Debug, Clone)]
struct RegisteredMode {
    mode: Mode,
    controller: ControllerChoice,
}

/// A mode of one session together with its own controller state
#[derive(Debug)]
pub struct ModeSlot {
    pub mode: Mode,
    pub controller: ControllerKind,
}

/// Validated bind tables grouped by keyboard name.
///
/// Declaration order is kept both across keyboards and within one keyboard,
/// where it becomes the mode rotation order.
#[derive(Debug, Default)]
pub struct Registry {
    keyboards: IndexMap<String, Vec<RegisteredMode>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register every table, stopping at the first bad one
    pub fn from_tables(
        tables: impl IntoIterator<Item = BindTable>,
    ) -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        for table in tables {
            registry.register(table)?;
        }
        Ok(registry)
    }

    /// Validate one table and add it as the next mode of its keyboard
    pub fn register(&mut self, table: BindTable) -> Result<(), RegistrationError> {
        let label = table
            .name
            .clone()
            .or_else(|| table.keyboard_name.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());

        let missing = |field| RegistrationError::MissingField {
            table: label.clone(),
            field,
        };

        let keyboard_name = table.keyboard_name.ok_or_else(|| missing("keyboard_name"))?;
        let down = table.down.ok_or_else(|| missing("down"))?;
        let hold = table.hold.ok_or_else(|| missing("hold"))?;
        let up = table.up.ok_or_else(|| missing("up"))?;

        let modes = self.keyboards.entry(keyboard_name.clone()).or_default();
        let name = table
            .name
            .unwrap_or_else(|| format!("{}#{}", keyboard_name, modes.len()));
        if modes.iter().any(|m| m.mode.name() == name) {
            return Err(RegistrationError::DuplicateTable {
                table: name,
                keyboard: keyboard_name,
            });
        }

        let mut mode = Mode::new(name.clone());
        for (phase, specs) in [(Phase::Down, down), (Phase::Hold, hold), (Phase::Up, up)] {
            for spec in specs {
                if spec.keys.is_empty() {
                    return Err(RegistrationError::EmptyCombination {
                        table: name,
                        phase,
                    });
                }
                mode.add_bind(phase, Bind::new(Combination::new(spec.keys), spec.action));
            }
        }

        log::debug!(
            "registered mode '{}' for '{}' ({} down, {} hold, {} up)",
            name,
            keyboard_name,
            mode.binds(Phase::Down).len(),
            mode.binds(Phase::Hold).len(),
            mode.binds(Phase::Up).len()
        );

        modes.push(RegisteredMode {
            mode,
            controller: table.controller,
        });
        Ok(())
    }

    /// Keyboard names with at least one mode, in declaration order
    pub fn keyboard_names(&self) -> impl Iterator<Item = &str> {
        self.keyboards
            .iter()
            .filter(|(_, modes)| !modes.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Number of modes declared for a keyboard
    pub fn mode_count(&self, keyboard_name: &str) -> usize {
        self.keyboards.get(keyboard_name).map_or(0, Vec::len)
    }

    /// Fresh modes and controllers for one session of `keyboard_name`.
    ///
    /// Every call returns independent state, so several devices sharing a
    /// name never share chord state.
    pub fn modes_for(&self, keyboard_name: &str) -> Vec<ModeSlot> {
        self.keyboards
            .get(keyboard_name)
            .map(|modes| {
                modes
                    .iter()
                    .map(|registered| ModeSlot {
                        mode: registered.mode.clone(),
                        controller: registered.controller.build(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.keyboards.values().all(Vec::is_empty)
    }
}
