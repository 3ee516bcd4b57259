//! Device discovery and connection.
//!
//! The registry scans a USB bus for boards whose VID/PID pair matches a
//! known generation, describes them, and binds the selected one into an
//! [`SdWire`] handle.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::device::{DeviceGeneration, DeviceInfo};
use crate::error::{Error, Result};
use crate::handle::SdWire;
use crate::protocol::UNKNOWN_STRING;
use crate::transport::{NusbBus, UsbBus, UsbConnection, UsbDeviceEntry};

/// Which device a [`connect`](DeviceRegistry::connect) call should bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Bind the first recognized device on the bus.
    FirstAvailable,
    /// Bind the device reporting this serial number.
    Serial(String),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstAvailable => write!(f, "any recognized device"),
            Self::Serial(serial) => write!(f, "serial {serial:?}"),
        }
    }
}

/// Finds SDWire boards on a USB bus and hands out connected handles.
///
/// Generic over the bus backend so the same discovery logic runs against
/// scripted devices in tests.
pub struct DeviceRegistry<B: UsbBus> {
    bus: B,
}

impl DeviceRegistry<NusbBus> {
    /// Registry over the live USB bus.
    pub fn new() -> Self {
        Self { bus: NusbBus::new() }
    }
}

impl Default for DeviceRegistry<NusbBus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: UsbBus> DeviceRegistry<B> {
    /// Registry over a specific bus backend.
    pub fn with_bus(bus: B) -> Self {
        Self { bus }
    }

    /// List every recognized board currently on the bus.
    ///
    /// Each board is opened briefly to read its identity strings and closed
    /// again. Boards that cannot be opened (permissions, another process
    /// holding them) are skipped with a warning rather than failing the
    /// whole scan.
    #[instrument(skip(self))]
    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut found = Vec::new();
        for (entry, generation) in self.candidates()? {
            let Some(conn) = open_or_skip(entry.as_ref()) else {
                continue;
            };
            found.push(describe(conn.as_ref(), generation));
        }

        debug!(count = found.len(), "Scan complete");
        Ok(found)
    }

    /// Connect to the device picked by `selector`.
    ///
    /// The winning candidate's connection moves into the returned handle;
    /// every other candidate opened along the way is closed before this
    /// returns.
    #[instrument(skip(self), fields(selector = %selector))]
    pub fn connect(&self, selector: &DeviceSelector) -> Result<SdWire> {
        for (entry, generation) in self.candidates()? {
            let Some(conn) = open_or_skip(entry.as_ref()) else {
                continue;
            };

            let selected = match selector {
                DeviceSelector::FirstAvailable => true,
                // A board that cannot report its serial is never the one
                // asked for.
                DeviceSelector::Serial(wanted) => {
                    conn.serial_number().map(|s| s == *wanted).unwrap_or(false)
                }
            };
            if selected {
                let device = describe(conn.as_ref(), generation);
                info!(%device, "Connected");
                return Ok(SdWire::bind(conn, device));
            }
            // Dropping `conn` closes the non-matching candidate.
        }

        Err(Error::DeviceNotFound(selector.clone()))
    }

    /// Every bus entry whose VID/PID pair maps to a known generation.
    fn candidates(&self) -> Result<Vec<(Box<dyn UsbDeviceEntry>, DeviceGeneration)>> {
        let entries = self.bus.enumerate().map_err(Error::Enumeration)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                DeviceGeneration::classify(entry.vendor_id(), entry.product_id())
                    .map(|generation| (entry, generation))
            })
            .collect())
    }
}

fn open_or_skip(entry: &dyn UsbDeviceEntry) -> Option<Box<dyn UsbConnection>> {
    match entry.open() {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!(
                vid = %format!("{:04X}", entry.vendor_id()),
                pid = %format!("{:04X}", entry.product_id()),
                error = %e,
                "Skipping device that could not be opened"
            );
            None
        }
    }
}

/// Read the identity strings, substituting `"unknown"` for any that fail.
fn describe(conn: &dyn UsbConnection, generation: DeviceGeneration) -> DeviceInfo {
    DeviceInfo {
        serial: conn
            .serial_number()
            .unwrap_or_else(|_| UNKNOWN_STRING.into()),
        product: conn
            .product_string()
            .unwrap_or_else(|_| UNKNOWN_STRING.into()),
        manufacturer: conn
            .manufacturer_string()
            .unwrap_or_else(|_| UNKNOWN_STRING.into()),
        generation,
    }
}
