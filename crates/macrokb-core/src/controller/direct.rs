use crate::controller::Controller;
use crate::event::KeyEvent;
use crate::mode::Mode;

/// Dispatches each event's own codes for its own phase.
///
/// There is no debounce window here, so chords never form: every key acts
/// alone and repeats fire hold binds from the first autorepeat on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectController;

impl Controller for DirectController {
    fn execute(&mut self, mode: &mut Mode, event: &KeyEvent) {
        if let Some(bind) = mode.check(event.phase, &event.codes).cloned() {
            log::debug!("[{}] {} -> fire (direct)", mode.name(), event);
            bind.fire();
        }
    }
}
