// Macrokb Output Layer
// Passthrough sinks

mod mirror;

pub use mirror::{to_input_event, MirrorDevice};
