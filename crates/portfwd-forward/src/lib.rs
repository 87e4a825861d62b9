//! Background TCP forwarder.
//!
//! Reads the forward list from the stored configuration, listens on each
//! enabled local address and pipes accepted connections to the remote
//! address. Listen failures, connect failures and connection counts are
//! reported on the runtime bus.

pub mod config;
pub mod counter;
pub mod forwarder;

pub use config::{ForwardConfig, ForwardRule};
pub use counter::Counter;
pub use forwarder::{Forwarder, ForwarderStatus};
