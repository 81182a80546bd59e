// Macrokb Input Layer
// Device discovery, filtering and grabbed event sources

mod device;
mod filter;

pub use device::{dump_devices, list_keyboards, GrabbedDevice};
pub use filter::{is_virtual_device, matches_device_name, MIRROR_PREFIX};
