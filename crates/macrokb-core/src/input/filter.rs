// Macrokb Input Layer - Device Filtering
// Name-based matching for keyboard autodetection

/// Name prefix of the passthrough mirror devices macrokb creates
pub const MIRROR_PREFIX: &str = "V_";

/// Check if a device name contains `pattern`, ignoring case.
///
/// An empty pattern matches every device.
pub fn matches_device_name(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Check if a device is one of our own mirror devices.
///
/// Mirrors must never be grabbed, otherwise passthrough would feed back
/// into the session that created it.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix)
}
