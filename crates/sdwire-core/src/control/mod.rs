//! Mode-switch strategies, one per hardware generation.
//!
//! The two board families share nothing at the wire level, so each gets
//! its own [`ModeController`] and the rest of the crate stays
//! generation-agnostic.

pub mod ftdi;
pub mod kernel_driver;

pub use ftdi::FtdiCbusController;
pub use kernel_driver::KernelDriverController;

use crate::device::{DeviceGeneration, SwitchMode};
use crate::error::Result;
use crate::transport::UsbConnection;

/// Drives one hardware generation's mux select line.
pub trait ModeController: Send + Sync {
    /// Route the SD card to `mode`.
    ///
    /// Safe to repeat with the same mode; each call replays the full
    /// switch procedure.
    fn set_mode(&self, conn: &dyn UsbConnection, mode: SwitchMode) -> Result<()>;
}

/// Pick the controller matching a classified generation.
pub fn for_generation(generation: DeviceGeneration) -> Box<dyn ModeController> {
    match generation {
        DeviceGeneration::SdWireC => Box::new(FtdiCbusController),
        DeviceGeneration::SdWire3 => Box::new(KernelDriverController),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SDWIRE3_PID, SDWIRE3_VID, SDWIREC_PID, SDWIREC_VID};
    use crate::transport::{MockConnection, MockDeviceSpec, TransportCall};

    #[test]
    fn test_for_generation_picks_matching_strategy() {
        let conn = MockConnection::new(MockDeviceSpec::new(SDWIREC_VID, SDWIREC_PID));
        for_generation(DeviceGeneration::SdWireC)
            .set_mode(&conn, SwitchMode::Host)
            .unwrap();
        assert!(matches!(
            conn.calls()[..],
            [TransportCall::ControlOut { .. }]
        ));

        let conn = MockConnection::new(MockDeviceSpec::new(SDWIRE3_VID, SDWIRE3_PID));
        for_generation(DeviceGeneration::SdWire3)
            .set_mode(&conn, SwitchMode::Host)
            .unwrap();
        assert!(conn.calls().contains(&TransportCall::Reset));
    }
}
