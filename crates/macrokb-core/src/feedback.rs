// Macrokb Feedback
// Keyboard LED animation while a session owns the device

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use evdev::{Device, EventType, InputEvent, LedType};

/// LEDs lit in order, one per step
pub const LED_CYCLE: [LedType; 3] = [LedType::LED_NUML, LedType::LED_CAPSL, LedType::LED_SCROLLL];

/// Endless sequence of LED writes.
///
/// Each full cycle over [`LED_CYCLE`] sets every LED to the same state, and
/// the state flips between cycles. The first cycle turns the LEDs on.
#[derive(Debug, Clone, Default)]
pub struct LedSequence {
    step: usize,
    lit: bool,
}

impl LedSequence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for LedSequence {
    type Item = (LedType, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let led = LED_CYCLE[self.step];
        let value = !self.lit;
        self.step += 1;
        if self.step == LED_CYCLE.len() {
            self.step = 0;
            self.lit = !self.lit;
        }
        Some((led, value))
    }
}

fn led_event(led: LedType, on: bool) -> InputEvent {
    InputEvent::new(EventType::LED, led.0, i32::from(on))
}

/// Background thread animating a keyboard's LEDs.
///
/// Works on its own device handle and never sees key events. Stops when
/// dropped.
pub struct LightAnimator {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LightAnimator {
    /// Open `path` and start stepping through [`LedSequence`] every `interval`
    pub fn start(path: impl AsRef<Path>, interval: Duration) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut device = Device::open(&path)?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let handle = std::thread::Builder::new()
            .name(format!("lights:{}", path.display()))
            .spawn(move || {
                for (led, on) in LedSequence::new() {
                    std::thread::sleep(interval);
                    if flag.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = device.send_events(&[led_event(led, on)]) {
                        log::warn!("LED animation on {} stopped: {}", path.display(), e);
                        break;
                    }
                }
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the thread to stop and wait for it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LightAnimator {
    fn drop(&mut self) {
        self.stop();
    }
}
