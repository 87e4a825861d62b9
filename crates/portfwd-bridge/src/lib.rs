//! UI bridge — config persistence relay and runtime event relay.
//!
//! Connects the UI application's ports to host storage and to the runtime
//! message bus fed by the background forwarder.

pub mod bridge;
pub mod ports;
pub mod types;

pub use bridge::Bridge;
pub use ports::UiPorts;
pub use types::*;
