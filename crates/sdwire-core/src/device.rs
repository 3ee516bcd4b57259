//! Device model: hardware generations, switch modes, and identity records.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::protocol::constants::{SDWIRE3_PID, SDWIRE3_VID, SDWIREC_PID, SDWIREC_VID};

/// Hardware generation of an SDWire device.
///
/// The two generations expose the same logical operation (route the SD card
/// to one side or the other) through entirely different USB mechanisms, so
/// the generation decides which [`ModeController`](crate::control::ModeController)
/// a connection is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceGeneration {
    /// Original SDWireC: FTDI bridge with the mux wired to a CBUS pin,
    /// switched by a vendor control transfer.
    SdWireC,
    /// SDWire3: Realtek card-reader bridge, switched by toggling the kernel
    /// driver via interface claim/release plus a bus reset.
    SdWire3,
}

impl DeviceGeneration {
    /// Classify a vendor/product pair against the fixed identity table.
    ///
    /// Pairs outside the table are not SDWire devices and yield `None`.
    pub fn classify(vendor_id: u16, product_id: u16) -> Option<Self> {
        match (vendor_id, product_id) {
            (SDWIREC_VID, SDWIREC_PID) => Some(Self::SdWireC),
            (SDWIRE3_VID, SDWIRE3_PID) => Some(Self::SdWire3),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceGeneration::SdWireC => write!(f, "SDWireC"),
            DeviceGeneration::SdWire3 => write!(f, "SDWire3"),
        }
    }
}

/// Logical position of the SD-card mux.
///
/// The hardware does not report its current position; a mode only exists as
/// the last value successfully written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchMode {
    /// SD card electrically connected to the device under test.
    Target,
    /// SD card electrically connected to the host computer for flashing.
    Host,
}

impl fmt::Display for SwitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchMode::Target => write!(f, "Target"),
            SwitchMode::Host => write!(f, "Host"),
        }
    }
}

impl FromStr for SwitchMode {
    type Err = Error;

    /// Parse a mode name. Accepts the SDK vocabulary (`target`/`host`) and
    /// the test-rig vocabulary (`dut`/`ts`), case-insensitive. Anything else
    /// is an [`Error::InvalidMode`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "target" | "dut" => Ok(SwitchMode::Target),
            "host" | "ts" => Ok(SwitchMode::Host),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Identity of one discovered SDWire device.
///
/// Produced by enumeration; `serial` is the stable key for reconnecting,
/// `product`/`manufacturer` are best-effort display strings that fall back
/// to `"unknown"` when the descriptor read fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub product: String,
    pub manufacturer: String,
    pub generation: DeviceGeneration,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t[{}::{}] ({})",
            self.serial, self.product, self.manufacturer, self.generation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table() {
        assert_eq!(
            DeviceGeneration::classify(0x04E8, 0x6001),
            Some(DeviceGeneration::SdWireC)
        );
        assert_eq!(
            DeviceGeneration::classify(0x0BDA, 0x0316),
            Some(DeviceGeneration::SdWire3)
        );
    }

    #[test]
    fn test_classify_rejects_unknown_pairs() {
        // FTDI's own VID with the same PID is not an SDWireC.
        assert_eq!(DeviceGeneration::classify(0x0403, 0x6001), None);
        assert_eq!(DeviceGeneration::classify(0x04E8, 0x0316), None);
        assert_eq!(DeviceGeneration::classify(0x0000, 0x0000), None);
    }

    #[test]
    fn test_generation_display() {
        assert_eq!(DeviceGeneration::SdWireC.to_string(), "SDWireC");
        assert_eq!(DeviceGeneration::SdWire3.to_string(), "SDWire3");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(SwitchMode::Target.to_string(), "Target");
        assert_eq!(SwitchMode::Host.to_string(), "Host");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("target".parse::<SwitchMode>().unwrap(), SwitchMode::Target);
        assert_eq!("DUT".parse::<SwitchMode>().unwrap(), SwitchMode::Target);
        assert_eq!("Host".parse::<SwitchMode>().unwrap(), SwitchMode::Host);
        assert_eq!("ts".parse::<SwitchMode>().unwrap(), SwitchMode::Host);
    }

    #[test]
    fn test_mode_from_str_rejects_unknown() {
        let err = "sideways".parse::<SwitchMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMode(ref s) if s == "sideways"));
    }

    #[test]
    fn test_info_display() {
        let info = DeviceInfo {
            serial: "ABC123".into(),
            product: "sd-wire".into(),
            manufacturer: "SRPOL".into(),
            generation: DeviceGeneration::SdWireC,
        };
        assert_eq!(info.to_string(), "ABC123\t[sd-wire::SRPOL] (SDWireC)");
    }
}
