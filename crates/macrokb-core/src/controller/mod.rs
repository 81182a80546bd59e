// Macrokb Controllers
// Consumers of key events for a single mode

mod default;
mod direct;
pub mod marks;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use default::{DefaultController, DEBOUNCE_WINDOW};
pub use direct::DirectController;

use crate::event::KeyEvent;
use crate::mode::Mode;

/// Consumes the key events routed to one mode.
///
/// Implementations keep whatever phase-transition state they need and fire
/// binds of `mode`; nothing else observes their internals.
pub trait Controller: Send {
    fn execute(&mut self, mode: &mut Mode, event: &KeyEvent);
}

/// Builds a fresh custom controller for each session that needs one
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// The controller driving one mode of one session
pub enum ControllerKind {
    Default(DefaultController),
    Custom(Box<dyn Controller>),
}

impl ControllerKind {
    pub fn execute(&mut self, mode: &mut Mode, event: &KeyEvent) {
        match self {
            ControllerKind::Default(controller) => controller.execute(mode, event),
            ControllerKind::Custom(controller) => controller.execute(mode, event),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ControllerKind::Default(_))
    }
}

impl fmt::Debug for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::Default(controller) => f.debug_tuple("Default").field(controller).finish(),
            ControllerKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Controller selection for a bind table
#[derive(Clone, Default)]
pub enum ControllerChoice {
    #[default]
    Default,
    /// Per-key dispatch with no chording
    Direct,
    Custom(ControllerFactory),
}

impl ControllerChoice {
    /// Instantiate fresh controller state
    pub fn build(&self) -> ControllerKind {
        match self {
            ControllerChoice::Default => ControllerKind::Default(DefaultController::new()),
            ControllerChoice::Direct => ControllerKind::Custom(Box::new(DirectController)),
            ControllerChoice::Custom(factory) => ControllerKind::Custom(factory()),
        }
    }
}

impl fmt::Debug for ControllerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerChoice::Default => f.write_str("Default"),
            ControllerChoice::Direct => f.write_str("Direct"),
            ControllerChoice::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for ControllerChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(ControllerChoice::Default),
            "direct" => Ok(ControllerChoice::Direct),
            other => Err(format!("Unknown controller: {}", other)),
        }
    }
}
