//! The connected-device handle.

use std::fmt;

use tracing::{info, instrument};

use crate::control::{self, ModeController};
use crate::device::{DeviceGeneration, DeviceInfo, SwitchMode};
use crate::error::{Error, Result};
use crate::registry::{DeviceRegistry, DeviceSelector};
use crate::transport::UsbConnection;

/// An exclusive handle to one connected SDWire board.
///
/// The handle owns its USB connection: dropping it (or calling
/// [`close`](Self::close)) releases the device. Switching takes
/// `&mut self`, so two routing changes can never race through one handle.
pub struct SdWire {
    conn: Option<Box<dyn UsbConnection>>,
    device: DeviceInfo,
    controller: Box<dyn ModeController>,
}

impl SdWire {
    /// Connect to the first recognized board on the bus.
    pub fn open_first() -> Result<Self> {
        DeviceRegistry::new().connect(&DeviceSelector::FirstAvailable)
    }

    /// Connect to the board reporting `serial`.
    pub fn open_by_serial(serial: &str) -> Result<Self> {
        DeviceRegistry::new().connect(&DeviceSelector::Serial(serial.to_owned()))
    }

    /// Bind a connection that already won selection in the registry.
    pub(crate) fn bind(conn: Box<dyn UsbConnection>, device: DeviceInfo) -> Self {
        let controller = control::for_generation(device.generation);
        Self {
            conn: Some(conn),
            device,
            controller,
        }
    }

    /// Route the SD card to `mode`, using whichever switch procedure this
    /// board's generation requires.
    #[instrument(skip(self), fields(serial = %self.device.serial, mode = %mode))]
    pub fn set_mode(&mut self, mode: SwitchMode) -> Result<()> {
        let conn = self.conn.as_deref().ok_or(Error::NotInitialized)?;
        self.controller.set_mode(conn, mode)?;

        info!("Mode set");
        Ok(())
    }

    /// Release the device. Further calls are no-ops, and every other
    /// operation on the handle fails from here on.
    pub fn close(&mut self) -> Result<()> {
        if self.conn.take().is_some() {
            info!(serial = %self.device.serial, "Device closed");
        }
        Ok(())
    }

    /// Serial number captured at connect time.
    pub fn serial(&self) -> &str {
        &self.device.serial
    }

    /// Product string captured at connect time.
    pub fn product(&self) -> &str {
        &self.device.product
    }

    /// Manufacturer string captured at connect time.
    pub fn manufacturer(&self) -> &str {
        &self.device.manufacturer
    }

    /// Hardware generation this handle is driving.
    pub fn generation(&self) -> DeviceGeneration {
        self.device.generation
    }

    /// Full identity snapshot captured at connect time.
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }
}

impl fmt::Debug for SdWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdWire")
            .field("device", &self.device)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl fmt::Display for SdWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t[{}::{}]",
            self.device.serial, self.device.product, self.device.manufacturer
        )
    }
}
