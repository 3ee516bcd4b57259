//! nusb-based USB transport implementation.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nusb::transfer::{ControlOut, ControlType, Recipient};
use nusb::{Interface, MaybeFuture, list_devices};
use tracing::{debug, instrument};

use super::traits::{TransportError, UsbBus, UsbConnection, UsbDeviceEntry};

/// Control transfers on these devices complete in milliseconds; anything
/// slower means the device is gone.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// Vendor control requests ride on the first interface's handle.
const CONTROL_INTERFACE: u8 = 0;

/// Live USB bus, backed by the operating system's device list.
#[derive(Debug, Default)]
pub struct NusbBus;

impl NusbBus {
    pub fn new() -> Self {
        Self
    }
}

impl UsbBus for NusbBus {
    fn enumerate(&self) -> Result<Vec<Box<dyn UsbDeviceEntry>>, TransportError> {
        let devices = list_devices()
            .wait()
            .map_err(|e| TransportError::EnumerationFailed(e.to_string()))?;

        Ok(devices
            .map(|info| Box::new(NusbDeviceEntry { info }) as Box<dyn UsbDeviceEntry>)
            .collect())
    }
}

struct NusbDeviceEntry {
    info: nusb::DeviceInfo,
}

impl UsbDeviceEntry for NusbDeviceEntry {
    fn vendor_id(&self) -> u16 {
        self.info.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.info.product_id()
    }

    #[instrument(skip(self), fields(
        vid = %format!("{:04X}", self.info.vendor_id()),
        pid = %format!("{:04X}", self.info.product_id()),
    ))]
    fn open(&self) -> Result<Box<dyn UsbConnection>, TransportError> {
        let device = self
            .info
            .open()
            .wait()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;

        debug!("Device opened");
        Ok(Box::new(NusbConnection {
            info: self.info.clone(),
            device,
            auto_detach: AtomicBool::new(false),
            claimed: Mutex::new(None),
        }))
    }
}

/// One open USB device.
///
/// Dropping the connection closes the device handle and releases any
/// claimed interface without reattaching the kernel driver.
pub struct NusbConnection {
    info: nusb::DeviceInfo,
    device: nusb::Device,
    auto_detach: AtomicBool,
    claimed: Mutex<Option<Interface>>,
}

impl NusbConnection {
    /// String descriptors come from the enumeration cache, so reading them
    /// never touches the device.
    fn cached_string(
        &self,
        value: Option<&str>,
        name: &'static str,
    ) -> Result<String, TransportError> {
        value
            .map(str::to_owned)
            .ok_or(TransportError::MissingStringDescriptor(name))
    }
}

impl UsbConnection for NusbConnection {
    fn serial_number(&self) -> Result<String, TransportError> {
        self.cached_string(self.info.serial_number(), "serial number")
    }

    fn product_string(&self) -> Result<String, TransportError> {
        self.cached_string(self.info.product_string(), "product")
    }

    fn manufacturer_string(&self) -> Result<String, TransportError> {
        self.cached_string(self.info.manufacturer_string(), "manufacturer")
    }

    #[instrument(skip(self), fields(
        request = %format!("0x{:02X}", request),
        value = %format!("0x{:04X}", value),
    ))]
    fn vendor_control_out(
        &self,
        request: u8,
        value: u16,
        index: u16,
    ) -> Result<(), TransportError> {
        // Control transfers need an interface handle. Claim the first
        // interface for the duration of the transfer; the device latches
        // the written state, so nothing has to stay claimed afterwards.
        let interface = self
            .device
            .detach_and_claim_interface(CONTROL_INTERFACE)
            .wait()
            .map_err(|e| TransportError::ControlFailed(e.to_string()))?;

        interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data: &[],
                },
                CONTROL_TIMEOUT,
            )
            .wait()
            .map_err(|e| TransportError::ControlFailed(e.to_string()))?;

        debug!("Control transfer complete");
        Ok(())
    }

    fn set_auto_detach(&self, enabled: bool) -> Result<(), TransportError> {
        // nusb has no standing auto-detach toggle; remember the request and
        // let the next claim detach the kernel driver itself.
        self.auto_detach.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn open_configuration(&self, configuration: u8) -> Result<(), TransportError> {
        let active = self
            .device
            .active_configuration()
            .map(|c| c.configuration_value())
            .ok();
        if active == Some(configuration) {
            debug!(configuration, "Configuration already active");
            return Ok(());
        }

        self.device
            .set_configuration(configuration)
            .wait()
            .map_err(|e| TransportError::ConfigurationFailed {
                configuration,
                message: e.to_string(),
            })
    }

    fn claim_interface(&self, interface: u8) -> Result<(), TransportError> {
        let handle = if self.auto_detach.load(Ordering::SeqCst) {
            self.device.detach_and_claim_interface(interface).wait()
        } else {
            self.device.claim_interface(interface).wait()
        }
        .map_err(|e| TransportError::ClaimInterfaceFailed {
            interface,
            message: e.to_string(),
        })?;

        debug!(interface, "Interface claimed");
        *self.claimed.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn release_interface(&self, interface: u8) {
        // Dropping the handle releases the claim; the kernel driver stays
        // detached.
        if self.claimed.lock().unwrap().take().is_some() {
            debug!(interface, "Interface released");
        }
    }

    #[instrument(skip(self))]
    fn reset(&self) -> Result<(), TransportError> {
        // A claimed interface would block the reset on some platforms.
        self.claimed.lock().unwrap().take();

        self.device
            .reset()
            .wait()
            .map_err(|e| TransportError::ResetFailed(e.to_string()))?;

        debug!("Device reset");
        Ok(())
    }
}
