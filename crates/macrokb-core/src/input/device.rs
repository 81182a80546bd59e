// Macrokb Input Layer - Devices
// evdev enumeration and exclusively grabbed event sources

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use evdev::Device;
use indexmap::IndexMap;

use super::filter::{is_virtual_device, matches_device_name, MIRROR_PREFIX};
use crate::event::RawEvent;
use crate::key::KeyId;
use crate::output::MirrorDevice;
use crate::session::{InputSource, SessionError, SessionResult};

/// Keyboard devices whose name matches `pattern`, grouped by name.
///
/// Several devices may share a name (one physical keyboard often exposes
/// more than one event node); each path gets its own session.
pub fn list_keyboards(pattern: &str) -> IndexMap<String, Vec<PathBuf>> {
    let mut keyboards: IndexMap<String, Vec<PathBuf>> = IndexMap::new();

    for (path, device) in evdev::enumerate() {
        let name = device.name().unwrap_or("Unknown");
        if is_virtual_device(name, MIRROR_PREFIX) || !matches_device_name(name, pattern) {
            continue;
        }
        keyboards.entry(name.to_string()).or_default().push(path);
    }

    for paths in keyboards.values_mut() {
        paths.sort();
    }
    keyboards
}

/// Describe every matching device and its key capabilities
pub fn dump_devices(pattern: &str) -> SessionResult<String> {
    let mut out = String::new();
    let mut found = 0;

    for (path, device) in evdev::enumerate() {
        let name = device.name().unwrap_or("Unknown");
        if !matches_device_name(name, pattern) {
            continue;
        }
        found += 1;

        let _ = writeln!(out, "Device {}\nPath:{}", name, path.display());
        let id = device.input_id();
        let _ = writeln!(
            out,
            "\tbus {:?} vendor {:04x} product {:04x} version {:04x}",
            id.bus_type(),
            id.vendor(),
            id.product(),
            id.version()
        );
        if let Some(phys) = device.physical_path() {
            let _ = writeln!(out, "\tphys {}", phys);
        }
        let _ = writeln!(out, "\tevents {:?}", device.supported_events());
        if let Some(keys) = device.supported_keys() {
            let _ = writeln!(out, "\tEV_KEY");
            for key in keys.iter() {
                let _ = writeln!(out, "\t\t{}", KeyId::from_code(key.code()));
            }
        }
        if let Some(leds) = device.supported_leds() {
            let _ = writeln!(out, "\tEV_LED");
            for led in leds.iter() {
                let _ = writeln!(out, "\t\t{:?}", led);
            }
        }
    }

    if found == 0 {
        return Err(SessionError::DeviceNotFound(format!(
            "no device name contains '{}'",
            pattern
        )));
    }
    Ok(out)
}

/// An evdev device held under an exclusive grab.
///
/// The grab is released when this value is dropped, including during panic
/// unwinding, so a crashed session never leaves its keyboard unusable.
pub struct GrabbedDevice {
    device: Device,
    name: String,
    pending: VecDeque<RawEvent>,
    grabbed: bool,
}

impl GrabbedDevice {
    /// Open `path` and grab it exclusively
    pub fn open(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut device = Device::open(&path)
            .map_err(|e| SessionError::DeviceNotFound(format!("{}: {}", path.display(), e)))?;
        let name = device.name().unwrap_or("Unknown").to_string();

        // A previous instance may have died holding the grab.
        let _ = device.ungrab();
        device.grab()?;
        log::debug!("grabbed {} ({})", name, path.display());

        Ok(Self {
            device,
            name,
            pending: VecDeque::new(),
            grabbed: true,
        })
    }

    /// Release the exclusive grab
    pub fn ungrab(&mut self) {
        if self.grabbed {
            let _ = self.device.ungrab();
            self.grabbed = false;
        }
    }
}

impl InputSource for GrabbedDevice {
    type Sink = MirrorDevice;

    fn name(&self) -> &str {
        &self.name
    }

    fn read_event(&mut self) -> SessionResult<Option<RawEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.device.fetch_events() {
                Ok(events) => {
                    let now = Instant::now();
                    for event in events {
                        self.pending.push_back(RawEvent::new(
                            event.event_type().0,
                            event.code(),
                            event.value(),
                            now,
                        ));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                // The device node disappeared (unplugged).
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => return Ok(None),
                Err(e) => return Err(SessionError::Io(e)),
            }
        }
    }

    fn open_sink(&mut self) -> SessionResult<MirrorDevice> {
        MirrorDevice::mirror(&self.device, &self.name)
            .map_err(|e| SessionError::SinkOpen(format!("{}: {}", self.name, e)))
    }
}

impl Drop for GrabbedDevice {
    fn drop(&mut self) {
        self.ungrab();
    }
}
