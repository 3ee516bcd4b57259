//! Crate-level error taxonomy.
//!
//! Every public operation returns either success or one of these typed
//! failures; there are no partial-success values. Transport-level causes are
//! carried inside [`TransportError`](crate::transport::TransportError) so
//! callers can tell which USB operation failed.

use thiserror::Error;

use crate::device::DeviceGeneration;
use crate::registry::DeviceSelector;
use crate::transport::TransportError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The bus scan itself could not start (e.g. no USB subsystem access).
    #[error("failed to enumerate USB devices: {0}")]
    Enumeration(#[source] TransportError),

    /// No device matched the selector.
    #[error("no SDWire device found matching {0}")]
    DeviceNotFound(DeviceSelector),

    /// A matched device's generation has no registered mode controller.
    #[error("unsupported device generation: {0}")]
    UnsupportedGeneration(DeviceGeneration),

    /// A mode name outside the defined set reached the parse boundary.
    #[error("invalid switch mode: {0:?}")]
    InvalidMode(String),

    /// A USB-layer call failed while talking to an open device.
    #[error("USB transport error: {0}")]
    Transport(#[from] TransportError),

    /// Operation attempted on a handle with no bound connection.
    #[error("device not initialized (handle already closed)")]
    NotInitialized,
}
