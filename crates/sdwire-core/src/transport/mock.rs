//! Mock USB transport for testing.
//!
//! `MockBus` serves a scripted set of devices and records every lifecycle
//! and protocol call in one ordered log, so tests can assert exact call
//! sequences and open/close parity without hardware.

use std::sync::{Arc, Mutex};

use super::traits::{TransportError, UsbBus, UsbConnection, UsbDeviceEntry};

/// One recorded transport call.
///
/// String-descriptor reads are deliberately not recorded; they are cosmetic
/// lookups, and logging them would bury the call sequences the tests care
/// about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open,
    Close,
    ControlOut { request: u8, value: u16, index: u16 },
    SetAutoDetach { enabled: bool },
    OpenConfiguration { configuration: u8 },
    ClaimInterface { interface: u8 },
    ReleaseInterface { interface: u8 },
    Reset,
}

type CallLog = Arc<Mutex<Vec<(usize, TransportCall)>>>;

/// Script for one simulated device on the mock bus.
#[derive(Debug, Clone)]
pub struct MockDeviceSpec {
    pub vendor_id: u16,
    pub product_id: u16,
    /// `None` makes the corresponding string read fail.
    pub serial: Option<String>,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub fail_open: bool,
    pub fail_control: bool,
    pub fail_set_auto_detach: bool,
    pub fail_open_configuration: bool,
    pub fail_claim_interface: bool,
    pub fail_reset: bool,
}

impl MockDeviceSpec {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            serial: Some("MOCK0001".into()),
            product: Some("mock-device".into()),
            manufacturer: Some("mock-vendor".into()),
            fail_open: false,
            fail_control: false,
            fail_set_auto_detach: false,
            fail_open_configuration: false,
            fail_claim_interface: false,
            fail_reset: false,
        }
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Make every string-descriptor read fail.
    pub fn without_strings(mut self) -> Self {
        self.serial = None;
        self.product = None;
        self.manufacturer = None;
        self
    }

    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

/// Scripted bus backed by a fixed device list.
///
/// Clones share the call log, so a test can keep one copy for assertions
/// while the registry consumes the other.
#[derive(Clone)]
pub struct MockBus {
    devices: Vec<MockDeviceSpec>,
    log: CallLog,
    fail_enumerate: bool,
}

impl MockBus {
    pub fn new(devices: Vec<MockDeviceSpec>) -> Self {
        Self {
            devices,
            log: Arc::new(Mutex::new(Vec::new())),
            fail_enumerate: false,
        }
    }

    /// A bus whose scan cannot start at all.
    pub fn unavailable() -> Self {
        Self {
            devices: Vec::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_enumerate: true,
        }
    }

    /// All recorded calls in order, tagged with the device index.
    pub fn calls(&self) -> Vec<(usize, TransportCall)> {
        self.log.lock().unwrap().clone()
    }

    /// Recorded calls for one device, in order.
    pub fn device_calls(&self, device: usize) -> Vec<TransportCall> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(idx, _)| *idx == device)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn open_count(&self) -> usize {
        self.count(&TransportCall::Open)
    }

    pub fn close_count(&self) -> usize {
        self.count(&TransportCall::Close)
    }

    fn count(&self, wanted: &TransportCall) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| call == wanted)
            .count()
    }
}

impl UsbBus for MockBus {
    fn enumerate(&self) -> Result<Vec<Box<dyn UsbDeviceEntry>>, TransportError> {
        if self.fail_enumerate {
            return Err(TransportError::EnumerationFailed(
                "scripted: no USB subsystem access".into(),
            ));
        }
        Ok(self
            .devices
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, spec)| {
                Box::new(MockEntry {
                    index,
                    spec,
                    log: Arc::clone(&self.log),
                }) as Box<dyn UsbDeviceEntry>
            })
            .collect())
    }
}

struct MockEntry {
    index: usize,
    spec: MockDeviceSpec,
    log: CallLog,
}

impl UsbDeviceEntry for MockEntry {
    fn vendor_id(&self) -> u16 {
        self.spec.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.spec.product_id
    }

    fn open(&self) -> Result<Box<dyn UsbConnection>, TransportError> {
        if self.spec.fail_open {
            return Err(TransportError::OpenFailed("scripted open failure".into()));
        }
        self.log
            .lock()
            .unwrap()
            .push((self.index, TransportCall::Open));
        Ok(Box::new(MockConnection {
            index: self.index,
            spec: self.spec.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// One open scripted device. Records its own drop as a close, which is how
/// open/close parity is verified.
pub struct MockConnection {
    index: usize,
    spec: MockDeviceSpec,
    log: CallLog,
}

impl MockConnection {
    /// Standalone connection for driving a controller directly in tests,
    /// with its own private log.
    pub fn new(spec: MockDeviceSpec) -> Self {
        Self {
            index: 0,
            spec,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Calls recorded against this connection's device, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(idx, _)| *idx == self.index)
            .map(|(_, call)| call.clone())
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.log.lock().unwrap().push((self.index, call));
    }
}

impl UsbConnection for MockConnection {
    fn serial_number(&self) -> Result<String, TransportError> {
        self.spec
            .serial
            .clone()
            .ok_or(TransportError::MissingStringDescriptor("serial number"))
    }

    fn product_string(&self) -> Result<String, TransportError> {
        self.spec
            .product
            .clone()
            .ok_or(TransportError::MissingStringDescriptor("product"))
    }

    fn manufacturer_string(&self) -> Result<String, TransportError> {
        self.spec
            .manufacturer
            .clone()
            .ok_or(TransportError::MissingStringDescriptor("manufacturer"))
    }

    fn vendor_control_out(
        &self,
        request: u8,
        value: u16,
        index: u16,
    ) -> Result<(), TransportError> {
        if self.spec.fail_control {
            return Err(TransportError::ControlFailed(
                "scripted control failure".into(),
            ));
        }
        self.record(TransportCall::ControlOut {
            request,
            value,
            index,
        });
        Ok(())
    }

    fn set_auto_detach(&self, enabled: bool) -> Result<(), TransportError> {
        if self.spec.fail_set_auto_detach {
            return Err(TransportError::AutoDetachFailed(
                "scripted auto-detach failure".into(),
            ));
        }
        self.record(TransportCall::SetAutoDetach { enabled });
        Ok(())
    }

    fn open_configuration(&self, configuration: u8) -> Result<(), TransportError> {
        if self.spec.fail_open_configuration {
            return Err(TransportError::ConfigurationFailed {
                configuration,
                message: "scripted configuration failure".into(),
            });
        }
        self.record(TransportCall::OpenConfiguration { configuration });
        Ok(())
    }

    fn claim_interface(&self, interface: u8) -> Result<(), TransportError> {
        if self.spec.fail_claim_interface {
            return Err(TransportError::ClaimInterfaceFailed {
                interface,
                message: "scripted claim failure".into(),
            });
        }
        self.record(TransportCall::ClaimInterface { interface });
        Ok(())
    }

    fn release_interface(&self, interface: u8) {
        self.record(TransportCall::ReleaseInterface { interface });
    }

    fn reset(&self) -> Result<(), TransportError> {
        if self.spec.fail_reset {
            return Err(TransportError::ResetFailed("scripted reset failure".into()));
        }
        self.record(TransportCall::Reset);
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.log
            .lock()
            .unwrap()
            .push((self.index, TransportCall::Close));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let conn = MockConnection::new(MockDeviceSpec::new(0x1234, 0x5678));
        conn.set_auto_detach(true).unwrap();
        conn.claim_interface(0).unwrap();
        conn.release_interface(0);
        conn.reset().unwrap();

        assert_eq!(
            conn.calls(),
            vec![
                TransportCall::SetAutoDetach { enabled: true },
                TransportCall::ClaimInterface { interface: 0 },
                TransportCall::ReleaseInterface { interface: 0 },
                TransportCall::Reset,
            ]
        );
    }

    #[test]
    fn test_close_recorded_on_drop() {
        let bus = MockBus::new(vec![MockDeviceSpec::new(0x1234, 0x5678)]);
        let entries = bus.enumerate().unwrap();
        let conn = entries[0].open().unwrap();
        assert_eq!(bus.open_count(), 1);
        assert_eq!(bus.close_count(), 0);

        drop(conn);
        assert_eq!(bus.close_count(), 1);
    }

    #[test]
    fn test_scripted_failures() {
        let mut spec = MockDeviceSpec::new(0x1234, 0x5678).without_strings();
        spec.fail_reset = true;
        let conn = MockConnection::new(spec);

        assert!(matches!(
            conn.serial_number(),
            Err(TransportError::MissingStringDescriptor("serial number"))
        ));
        assert!(matches!(conn.reset(), Err(TransportError::ResetFailed(_))));
        // Failed calls leave no trace in the log.
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_unavailable_bus() {
        let bus = MockBus::unavailable();
        assert!(matches!(
            bus.enumerate(),
            Err(TransportError::EnumerationFailed(_))
        ));
    }
}
