// Macrokb Core Library
// Chord recognition and per-keyboard macro sessions

pub mod bind;
pub mod combination;
pub mod config;
pub mod controller;
pub mod event;
pub mod feedback;
pub mod input;
pub mod key;
pub mod launcher;
pub mod mode;
pub mod output;
pub mod phase;
pub mod registry;
pub mod session;

pub use bind::{Bind, BindAction};
pub use combination::Combination;
pub use config::{ActionSpec, Config, ConfigError, GeneralSettings};
pub use controller::{
    Controller, ControllerChoice, ControllerFactory, ControllerKind, DefaultController,
    DirectController, DEBOUNCE_WINDOW,
};
pub use event::{is_key_event, KeyEvent, RawEvent};
pub use feedback::{LedSequence, LightAnimator};
pub use input::{dump_devices, list_keyboards, GrabbedDevice};
pub use key::{KeyId, KeyParseError};
pub use launcher::{run_as_user, LaunchError, LoginUser};
pub use mode::Mode;
pub use output::MirrorDevice;
pub use phase::Phase;
pub use registry::{BindSpec, BindTable, ModeSlot, RegistrationError, Registry};
pub use session::{
    DeviceSession, InputSource, OutputSink, Routing, SessionConfig, SessionError, SessionResult,
};
