// Macrokb Output Layer - Mirror Device
// uinput device cloned from a grabbed source for passthrough

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{Device, EventType, InputEvent};

use crate::event::RawEvent;
use crate::input::MIRROR_PREFIX;
use crate::session::OutputSink;

/// Virtual keyboard that replays a grabbed source's events verbatim
pub struct MirrorDevice {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl MirrorDevice {
    /// Create a uinput device with the same identity and capabilities as
    /// `source`.
    pub fn mirror(source: &Device, source_name: &str) -> io::Result<Self> {
        let name = format!("{}{}", MIRROR_PREFIX, source_name);
        let mut builder = VirtualDeviceBuilder::new()?
            .name(&name)
            .input_id(source.input_id())
            .with_properties(source.properties())?;

        // The uinput builder has no setters for EV_LED or EV_REP, and absolute
        // axes need per-axis ranges; only EV_KEY events are forwarded anyway.
        if let Some(keys) = source.supported_keys() {
            builder = builder.with_keys(keys)?;
        }
        if let Some(axes) = source.supported_relative_axes() {
            builder = builder.with_relative_axes(axes)?;
        }
        if let Some(switches) = source.supported_switches() {
            builder = builder.with_switches(switches)?;
        }
        if let Some(misc) = source.misc_properties() {
            builder = builder.with_msc(misc)?;
        }

        let device = builder.build()?;
        log::debug!("created mirror device '{}'", name);

        Ok(Self {
            device,
            pending: Vec::new(),
        })
    }
}

/// Convert a raw event back into its evdev form
pub fn to_input_event(event: &RawEvent) -> InputEvent {
    InputEvent::new(EventType(event.kind), event.code, event.value)
}

impl OutputSink for MirrorDevice {
    fn write_event(&mut self, event: &RawEvent) -> io::Result<()> {
        self.pending.push(to_input_event(event));
        Ok(())
    }

    /// Emit buffered events terminated by a SYN_REPORT
    fn synchronize(&mut self) -> io::Result<()> {
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result
    }
}
