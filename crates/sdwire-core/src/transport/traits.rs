//! USB transport layer abstraction.
//!
//! Defines the bus/device traits the registry and mode controllers are
//! written against, allowing different implementations (nusb, mock).
//!
//! All operations are synchronous and blocking; a hung transfer blocks the
//! caller. Nothing here retries, times out beyond what the backend's own
//! transfer timeout provides, or serializes concurrent callers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bus enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("failed to open device: {0}")]
    OpenFailed(String),

    #[error("missing string descriptor: {0}")]
    MissingStringDescriptor(&'static str),

    #[error("control transfer failed: {0}")]
    ControlFailed(String),

    #[error("failed to open configuration {configuration}: {message}")]
    ConfigurationFailed { configuration: u8, message: String },

    #[error("failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("failed to enable kernel-driver auto-detach: {0}")]
    AutoDetachFailed(String),

    #[error("device reset failed: {0}")]
    ResetFailed(String),
}

/// A USB bus that can be scanned for devices.
///
/// Implemented by the production nusb backend and by the scripted mock used
/// in tests. Fails only when the scan itself cannot start; per-device
/// trouble is reported by the entries' own operations.
pub trait UsbBus {
    /// Enumerate the devices currently on the bus, in bus order.
    fn enumerate(&self) -> Result<Vec<Box<dyn UsbDeviceEntry>>, TransportError>;
}

/// One enumerated device, not yet opened.
///
/// An entry is cheap: it exposes the identity needed for VID/PID filtering
/// and turns into a live connection on [`open`](UsbDeviceEntry::open).
pub trait UsbDeviceEntry {
    fn vendor_id(&self) -> u16;

    fn product_id(&self) -> u16;

    /// Open the device. The returned connection owns the OS handle and
    /// releases it when dropped.
    fn open(&self) -> Result<Box<dyn UsbConnection>, TransportError>;
}

/// One open USB device connection.
///
/// Dropping the connection releases the underlying OS handle; there is no
/// separate close call to forget. Methods take `&self` because backends
/// manage their own interior state; exclusive use is the caller's job.
pub trait UsbConnection: Send + Sync {
    /// Read the serial number string descriptor.
    fn serial_number(&self) -> Result<String, TransportError>;

    /// Read the product string descriptor.
    fn product_string(&self) -> Result<String, TransportError>;

    /// Read the manufacturer string descriptor.
    fn manufacturer_string(&self) -> Result<String, TransportError>;

    /// Issue the one control transfer this layer ever needs: OUT direction,
    /// vendor type, device recipient, no data stage.
    fn vendor_control_out(&self, request: u8, value: u16, index: u16)
    -> Result<(), TransportError>;

    /// Detach the kernel driver automatically on subsequent interface
    /// claims over this connection.
    fn set_auto_detach(&self, enabled: bool) -> Result<(), TransportError>;

    /// Make the numbered configuration active.
    fn open_configuration(&self, configuration: u8) -> Result<(), TransportError>;

    /// Claim an interface. With auto-detach enabled this detaches the
    /// kernel driver as a side effect.
    fn claim_interface(&self, interface: u8) -> Result<(), TransportError>;

    /// Release a claimed interface. Must not reattach the kernel driver;
    /// releasing an interface that is not claimed is a no-op.
    fn release_interface(&self, interface: u8);

    /// Issue a USB bus reset.
    fn reset(&self) -> Result<(), TransportError>;
}
