// Macrokb End-to-End Test Scenarios
//
// Drive complete device sessions from scripted input without hardware.
// Timestamps are built with Instant arithmetic, so nothing sleeps.
//
// Run with: cargo test --test e2e_scenarios

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use macrokb_core::{
    BindTable, ControllerChoice, ControllerKind, DeviceSession, InputSource, KeyId, OutputSink,
    Phase, RawEvent, Registry, Routing, SessionConfig, SessionResult,
};

// =========================================================================
// Test Helpers
// =========================================================================

const KEY_TAB: u16 = 15;
const KEY_A: u16 = 30;
const KEY_GRAVE: u16 = 41;
const KEY_SCROLLLOCK: u16 = 70;
const KEY_SYSRQ: u16 = 99;

const UP: i32 = 0;
const DOWN: i32 = 1;
const HOLD: i32 = 2;

/// Names of fired binds, in firing order
#[derive(Clone, Default)]
struct Fired(Arc<Mutex<Vec<String>>>);

impl Fired {
    fn action(&self, label: &str) -> impl Fn() + Send + Sync + 'static {
        let log = self.0.clone();
        let label = label.to_string();
        move || log.lock().push(label.clone())
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// Events written to sinks, plus a switch making writes fail
#[derive(Clone, Default)]
struct SinkLog {
    written: Arc<Mutex<Vec<RawEvent>>>,
    syncs: Arc<Mutex<usize>>,
    fail_writes: Arc<Mutex<bool>>,
}

struct RecordingSink(SinkLog);

impl OutputSink for RecordingSink {
    fn write_event(&mut self, event: &RawEvent) -> io::Result<()> {
        if *self.0.fail_writes.lock() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink gone"));
        }
        self.0.written.lock().push(*event);
        Ok(())
    }

    fn synchronize(&mut self) -> io::Result<()> {
        *self.0.syncs.lock() += 1;
        Ok(())
    }
}

struct ScriptedSource {
    events: VecDeque<RawEvent>,
    sinks: SinkLog,
}

impl ScriptedSource {
    fn new(sinks: SinkLog) -> Self {
        Self {
            events: VecDeque::new(),
            sinks,
        }
    }
}

impl InputSource for ScriptedSource {
    type Sink = RecordingSink;

    fn name(&self) -> &str {
        "scripted"
    }

    fn read_event(&mut self) -> SessionResult<Option<RawEvent>> {
        Ok(self.events.pop_front())
    }

    fn open_sink(&mut self) -> SessionResult<RecordingSink> {
        Ok(RecordingSink(self.sinks.clone()))
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn session(registry: &Registry, keyboard: &str, config: SessionConfig) -> DeviceSession<ScriptedSource> {
    DeviceSession::new(
        ScriptedSource::new(SinkLog::default()),
        registry.modes_for(keyboard),
        config,
    )
    .unwrap()
}

fn held_keys(session: &DeviceSession<ScriptedSource>) -> Vec<KeyId> {
    match &session.current_mode().controller {
        ControllerKind::Default(controller) => controller.held_keys().to_vec(),
        ControllerKind::Custom(_) => panic!("expected the default controller"),
    }
}

/// Single mode with a down, a hold, and an up bind on the grave key
fn grave_registry(fired: &Fired) -> Registry {
    Registry::from_tables([BindTable::for_keyboard("Macro Pad")
        .named("main")
        .bind(Phase::Down, &["KEY_GRAVE"], fired.action("down"))
        .bind(Phase::Hold, &["KEY_GRAVE"], fired.action("hold"))
        .bind(Phase::Up, &["KEY_GRAVE"], fired.action("up"))])
    .unwrap()
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_tap_fires_down_then_up() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    assert_eq!(fired.take(), vec!["down"]);

    session.handle_event(RawEvent::key(KEY_GRAVE, UP, t0 + ms(40))).unwrap();
    assert_eq!(fired.take(), vec!["up"]);
}

#[test]
fn test_hold_fires_only_after_window() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    fired.take();

    // Still inside the window: the key is not held yet
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(30))).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(60))).unwrap();
    assert!(fired.take().is_empty());

    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(70))).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(100))).unwrap();
    assert_eq!(fired.take(), vec!["hold", "hold"]);
    assert!(session.current_mode().mode.cached_hold().is_some());
}

#[test]
fn test_release_inside_window_never_holds() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, UP, t0 + ms(20))).unwrap();
    assert_eq!(fired.take(), vec!["down", "up"]);

    // Hold reports from other keys arrive long after the window
    session.handle_event(RawEvent::key(KEY_TAB, HOLD, t0 + ms(100))).unwrap();
    session.handle_event(RawEvent::key(KEY_TAB, HOLD, t0 + ms(400))).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(500))).unwrap();

    assert!(fired.take().is_empty());
    assert!(held_keys(&session).is_empty());
    assert!(session.current_mode().mode.cached_hold().is_none());
}

#[test]
fn test_release_ends_hold() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(100))).unwrap();
    assert_eq!(held_keys(&session), vec![KeyId::from("KEY_GRAVE")]);

    session.handle_event(RawEvent::key(KEY_GRAVE, UP, t0 + ms(150))).unwrap();
    // The next event purges the released key from the held set
    session.handle_event(RawEvent::key(KEY_A, DOWN, t0 + ms(160))).unwrap();
    assert!(held_keys(&session).is_empty());
    assert_eq!(fired.take(), vec!["down", "hold", "up"]);
}

#[test]
fn test_duplicate_down_is_promoted_once() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0 + ms(10))).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(200))).unwrap();

    assert_eq!(held_keys(&session), vec![KeyId::from("KEY_GRAVE")]);
    assert_eq!(fired.take().iter().filter(|f| *f == "hold").count(), 1);
}

#[test]
fn test_two_key_chord_down_and_hold() {
    let fired = Fired::default();
    let registry = Registry::from_tables([BindTable::for_keyboard("Macro Pad")
        .bind(Phase::Down, &["KEY_GRAVE"], fired.action("grave"))
        .bind(Phase::Down, &["KEY_GRAVE", "KEY_TAB"], fired.action("chord"))
        .bind(Phase::Hold, &["KEY_TAB", "KEY_GRAVE"], fired.action("chord hold"))])
    .unwrap();
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    session.handle_event(RawEvent::key(KEY_TAB, DOWN, t0 + ms(15))).unwrap();
    assert_eq!(fired.take(), vec!["grave", "chord"]);

    session.handle_event(RawEvent::key(KEY_TAB, HOLD, t0 + ms(90))).unwrap();
    assert_eq!(fired.take(), vec!["chord hold"]);
}

#[test]
fn test_unmatched_chord_is_noop() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    let routing = session.handle_event(RawEvent::key(KEY_A, DOWN, t0)).unwrap();
    assert_eq!(routing, Routing::Dispatched);
    assert!(fired.take().is_empty());
}

#[test]
fn test_mode_rotation_returns_to_start() {
    let fired = Fired::default();
    let tables = ["one", "two", "three"].map(|name| {
        BindTable::for_keyboard("Macro Pad")
            .named(name)
            .bind(Phase::Down, &["KEY_GRAVE"], fired.action(name))
    });
    let registry = Registry::from_tables(tables).unwrap();
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    let mut seen = Vec::new();
    for i in 0..3u64 {
        let at = t0 + ms(i * 200);
        session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, at)).unwrap();
        session.handle_event(RawEvent::key(KEY_GRAVE, UP, at + ms(10))).unwrap();
        seen.extend(fired.take());
        let routing = session
            .handle_event(RawEvent::key(KEY_SCROLLLOCK, DOWN, at + ms(100)))
            .unwrap();
        assert_eq!(routing, Routing::ModeAdvanced);
    }

    assert_eq!(seen, vec!["one", "two", "three"]);
    assert_eq!(session.mode_index(), 0);
}

#[test]
fn test_advance_key_never_reaches_controller() {
    let fired = Fired::default();
    let registry = Registry::from_tables([BindTable::for_keyboard("Macro Pad")
        .bind(Phase::Down, &["KEY_SCROLLLOCK"], fired.action("scroll"))])
    .unwrap();
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());

    session
        .handle_event(RawEvent::key(KEY_SCROLLLOCK, DOWN, Instant::now()))
        .unwrap();
    assert!(fired.take().is_empty());
}

#[test]
fn test_passthrough_forwards_verbatim_and_suspends_binds() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let sinks = SinkLog::default();
    let config = SessionConfig {
        passthrough_toggle_key: Some(KeyId::from("KEY_SYSRQ")),
        ..SessionConfig::default()
    };
    let mut session = DeviceSession::new(
        ScriptedSource::new(sinks.clone()),
        registry.modes_for("Macro Pad"),
        config,
    )
    .unwrap();
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_SYSRQ, DOWN, t0)).unwrap();
    assert!(session.passthrough_active());

    let typed = [
        RawEvent::key(KEY_GRAVE, DOWN, t0 + ms(10)),
        RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(300)),
        RawEvent::key(KEY_GRAVE, UP, t0 + ms(320)),
    ];
    for event in typed {
        assert_eq!(session.handle_event(event).unwrap(), Routing::Forwarded);
    }
    assert_eq!(*sinks.written.lock(), typed.to_vec());
    assert_eq!(*sinks.syncs.lock(), typed.len());
    assert!(fired.take().is_empty());

    // The toggle key itself is consumed, not forwarded
    session.handle_event(RawEvent::key(KEY_SYSRQ, DOWN, t0 + ms(400))).unwrap();
    assert!(!session.passthrough_active());
    assert_eq!(sinks.written.lock().len(), typed.len());

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0 + ms(500))).unwrap();
    assert_eq!(fired.take(), vec!["down"]);
}

#[test]
fn test_sink_failure_disables_passthrough() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let sinks = SinkLog::default();
    let config = SessionConfig {
        passthrough_toggle_key: Some(KeyId::from("KEY_SYSRQ")),
        ..SessionConfig::default()
    };
    let mut session = DeviceSession::new(
        ScriptedSource::new(sinks.clone()),
        registry.modes_for("Macro Pad"),
        config,
    )
    .unwrap();
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_SYSRQ, DOWN, t0)).unwrap();
    *sinks.fail_writes.lock() = true;

    let routing = session.handle_event(RawEvent::key(KEY_A, DOWN, t0 + ms(10))).unwrap();
    assert_eq!(routing, Routing::ForwardFailed);
    assert!(!session.passthrough_active());

    // Later events go to the binds again
    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0 + ms(200))).unwrap();
    assert_eq!(fired.take(), vec!["down"]);
}

#[test]
fn test_sessions_sharing_a_name_do_not_share_state() {
    let fired = Fired::default();
    let registry = grave_registry(&fired);
    let mut first = session(&registry, "Macro Pad", SessionConfig::default());
    let second = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    first.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    first.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(100))).unwrap();

    assert_eq!(held_keys(&first).len(), 1);
    assert!(held_keys(&second).is_empty());
    assert!(second.current_mode().mode.cached_hold().is_none());
}

#[test]
fn test_direct_controller_has_no_debounce() {
    let fired = Fired::default();
    let registry = Registry::from_tables([BindTable::for_keyboard("Macro Pad")
        .with_controller(ControllerChoice::Direct)
        .bind(Phase::Hold, &["KEY_GRAVE"], fired.action("hold"))])
    .unwrap();
    let mut session = session(&registry, "Macro Pad", SessionConfig::default());
    let t0 = Instant::now();

    session.handle_event(RawEvent::key(KEY_GRAVE, DOWN, t0)).unwrap();
    session.handle_event(RawEvent::key(KEY_GRAVE, HOLD, t0 + ms(1))).unwrap();
    assert_eq!(fired.take(), vec!["hold"]);
}
