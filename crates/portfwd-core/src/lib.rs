//! portfwd core — configuration, error type, runtime message protocol.

pub mod config;
pub mod error;
pub mod runtime;

pub use config::{DataPaths, PortfwdConfig};
pub use error::{Error, Result};
pub use runtime::{runtime_channel, RuntimeEvent, RuntimeReceiver, RuntimeSender};
