// Macrokb Device Session
// Per-keyboard read loop: mode rotation, passthrough, chord dispatch

use std::io;

use crate::event::{KeyEvent, RawEvent};
use crate::key::KeyId;
use crate::registry::ModeSlot;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No modes configured for '{0}'")]
    NoModes(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open passthrough sink: {0}")]
    SinkOpen(String),
}

/// An exclusively grabbed source of raw input events
pub trait InputSource {
    type Sink: OutputSink;

    /// Human readable source name, for logs
    fn name(&self) -> &str;

    /// Block until the next event. `None` means the source is closed.
    fn read_event(&mut self) -> SessionResult<Option<RawEvent>>;

    /// Open an output sink that mirrors this source's capabilities
    fn open_sink(&mut self) -> SessionResult<Self::Sink>;
}

/// Synthetic output device used while passthrough is active.
///
/// Dropping the sink closes it.
pub trait OutputSink {
    fn write_event(&mut self, event: &RawEvent) -> io::Result<()>;
    fn synchronize(&mut self) -> io::Result<()>;
}

/// Immutable per-run session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Rotates to the next mode on press
    pub mode_advance_key: KeyId,
    /// Toggles passthrough on press; `None` disables passthrough
    pub passthrough_toggle_key: Option<KeyId>,
    /// Log every normalized key event
    pub print_keys: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode_advance_key: KeyId::from(crate::config::DEFAULT_MODE_ADVANCE_KEY),
            passthrough_toggle_key: None,
            print_keys: false,
        }
    }
}

/// What the session did with one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Not a key event; dropped
    Ignored,
    ModeAdvanced,
    PassthroughToggled,
    Forwarded,
    /// Forwarding failed and passthrough was switched off
    ForwardFailed,
    Dispatched,
}

/// One physical keyboard's read loop and chord state
pub struct DeviceSession<S: InputSource> {
    source: S,
    modes: Vec<ModeSlot>,
    mode_index: usize,
    passthrough: Option<S::Sink>,
    config: SessionConfig,
}

impl<S: InputSource> DeviceSession<S> {
    /// Create a session over `source`. `modes` must not be empty.
    pub fn new(source: S, modes: Vec<ModeSlot>, config: SessionConfig) -> SessionResult<Self> {
        if modes.is_empty() {
            return Err(SessionError::NoModes(source.name().to_string()));
        }
        Ok(Self {
            source,
            modes,
            mode_index: 0,
            passthrough: None,
            config,
        })
    }

    pub fn mode_index(&self) -> usize {
        self.mode_index
    }

    pub fn current_mode(&self) -> &ModeSlot {
        &self.modes[self.mode_index]
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn passthrough_active(&self) -> bool {
        self.passthrough.is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read and route events until the source closes.
    pub fn run(&mut self) -> SessionResult<()> {
        log::info!(
            "[{}] session started in mode '{}'",
            self.source.name(),
            self.current_mode().mode.name()
        );
        while let Some(raw) = self.source.read_event()? {
            self.handle_event(raw)?;
        }
        log::info!("[{}] source closed", self.source.name());
        Ok(())
    }

    /// Route one raw event.
    pub fn handle_event(&mut self, raw: RawEvent) -> SessionResult<Routing> {
        let Some(event) = raw.normalize() else {
            return Ok(Routing::Ignored);
        };

        if self.config.print_keys {
            log::info!("[{}] {}", self.source.name(), event);
        }

        if self.is_control_press(&event, &self.config.mode_advance_key) {
            self.advance_mode();
            return Ok(Routing::ModeAdvanced);
        }

        if let Some(toggle) = &self.config.passthrough_toggle_key {
            if self.is_control_press(&event, toggle) {
                self.toggle_passthrough()?;
                return Ok(Routing::PassthroughToggled);
            }
        }

        if let Some(sink) = self.passthrough.as_mut() {
            return Ok(match forward(sink, &raw) {
                Ok(()) => Routing::Forwarded,
                Err(e) => {
                    log::warn!(
                        "[{}] passthrough write failed, disabling passthrough: {}",
                        self.source.name(),
                        e
                    );
                    self.passthrough = None;
                    Routing::ForwardFailed
                }
            });
        }

        let slot = &mut self.modes[self.mode_index];
        slot.controller.execute(&mut slot.mode, &event);
        Ok(Routing::Dispatched)
    }

    fn is_control_press(&self, event: &KeyEvent, key: &KeyId) -> bool {
        event.phase == crate::phase::Phase::Down && event.is_single(key)
    }

    fn advance_mode(&mut self) {
        self.mode_index = (self.mode_index + 1) % self.modes.len();
        log::info!(
            "[{}] mode -> '{}' ({}/{})",
            self.source.name(),
            self.current_mode().mode.name(),
            self.mode_index + 1,
            self.modes.len()
        );
    }

    fn toggle_passthrough(&mut self) -> SessionResult<()> {
        if self.passthrough.take().is_some() {
            log::info!("[{}] passthrough off", self.source.name());
        } else {
            self.passthrough = Some(self.source.open_sink()?);
            log::info!("[{}] passthrough on", self.source.name());
        }
        Ok(())
    }
}

fn forward<K: OutputSink>(sink: &mut K, raw: &RawEvent) -> io::Result<()> {
    sink.write_event(raw)?;
    sink.synchronize()
}
