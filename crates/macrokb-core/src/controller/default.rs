// Macrokb Default Controller
// Debounce-window chord recognition: down, hold, up

use std::time::Duration;

use crate::controller::marks::Marks;
use crate::controller::Controller;
use crate::event::KeyEvent;
use crate::key::KeyId;
use crate::mode::Mode;
use crate::phase::Phase;

/// How long a down or up mark counts as recent.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(60);

/// Chord state machine.
///
/// Keys pressed within one debounce window of each other form a down chord.
/// A down mark that outlives the window without a release is promoted to the
/// held set, which is what hold binds match against. Releases are kept as up
/// marks for one window so that a chord released key by key still matches as
/// a whole.
#[derive(Debug, Clone)]
pub struct DefaultController {
    down_marks: Marks,
    up_marks: Marks,
    held_keys: Vec<KeyId>,
    window: Duration,
}

impl DefaultController {
    pub fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW)
    }

    /// Controller with a non-standard debounce window
    pub fn with_window(window: Duration) -> Self {
        Self {
            down_marks: Marks::new(),
            up_marks: Marks::new(),
            held_keys: Vec::new(),
            window,
        }
    }

    pub fn down_marks(&self) -> &Marks {
        &self.down_marks
    }

    pub fn up_marks(&self) -> &Marks {
        &self.up_marks
    }

    pub fn held_keys(&self) -> &[KeyId] {
        &self.held_keys
    }

    /// Age the marks relative to `event`'s arrival.
    fn transfer(&mut self, event: &KeyEvent) {
        let now = event.timestamp;

        for key in self.down_marks.take_expired(now, self.window) {
            if !self.held_keys.contains(&key) {
                log::trace!("promoting {} to held", key);
                self.held_keys.push(key);
            }
        }

        let up_marks = &self.up_marks;
        self.held_keys.retain(|key| !up_marks.contains(key));

        self.up_marks.take_expired(now, self.window);
    }

    fn record(&mut self, event: &KeyEvent) {
        let marks = match event.phase {
            Phase::Down => &mut self.down_marks,
            Phase::Up => &mut self.up_marks,
            Phase::Hold => return,
        };
        for code in &event.codes {
            marks.push(code.clone(), event.timestamp);
        }
    }

    fn dispatch(&self, mode: &mut Mode, phase: Phase) {
        let candidate = match phase {
            Phase::Down => self.down_marks.keys(),
            Phase::Hold => self.held_keys.iter().cloned().collect(),
            Phase::Up => self.up_marks.keys(),
        };

        match mode.check(phase, &candidate).cloned() {
            Some(bind) => {
                log::debug!("[{}] {} {} -> fire", mode.name(), phase, bind.combination());
                bind.fire();
            }
            None => log::trace!("[{}] {} {:?} -> no bind", mode.name(), phase, candidate),
        }
    }
}

impl Default for DefaultController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for DefaultController {
    fn execute(&mut self, mode: &mut Mode, event: &KeyEvent) {
        self.transfer(event);
        self.record(event);
        self.dispatch(mode, event.phase);
    }
}
