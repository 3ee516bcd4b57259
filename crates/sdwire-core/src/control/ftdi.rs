//! CBUS bit-bang switching for FTDI-based SDWireC boards.

use tracing::{debug, instrument};

use super::ModeController;
use crate::device::SwitchMode;
use crate::error::Result;
use crate::protocol::{FTDI_SIO_SET_BITMODE_REQUEST, cbus_bitmode_value};
use crate::transport::UsbConnection;

/// Drives the mux through the FTDI bridge's CBUS bit-bang register.
///
/// One vendor control transfer programs every CBUS pin as an output and
/// sets CBUS0, which is wired to the mux select line. The chip latches
/// the pin state, so nothing needs to stay open afterwards.
pub struct FtdiCbusController;

impl FtdiCbusController {
    /// CBUS0 low routes the card to the target, high to the host.
    fn select_bit(mode: SwitchMode) -> u8 {
        match mode {
            SwitchMode::Target => 0x00,
            SwitchMode::Host => 0x01,
        }
    }
}

impl ModeController for FtdiCbusController {
    #[instrument(skip(self, conn), fields(mode = %mode))]
    fn set_mode(&self, conn: &dyn UsbConnection, mode: SwitchMode) -> Result<()> {
        let value = cbus_bitmode_value(Self::select_bit(mode));
        conn.vendor_control_out(FTDI_SIO_SET_BITMODE_REQUEST, value, 0)?;

        debug!(value = %format!("0x{:04X}", value), "CBUS state written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{SDWIREC_PID, SDWIREC_VID};
    use crate::transport::{MockConnection, MockDeviceSpec, TransportCall, TransportError};

    fn mock_conn() -> MockConnection {
        MockConnection::new(MockDeviceSpec::new(SDWIREC_VID, SDWIREC_PID))
    }

    #[test]
    fn test_target_drives_cbus_low() {
        let conn = mock_conn();
        FtdiCbusController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap();

        assert_eq!(
            conn.calls(),
            vec![TransportCall::ControlOut {
                request: 0x0B,
                value: 0x20F0,
                index: 0,
            }]
        );
    }

    #[test]
    fn test_host_drives_cbus_high() {
        let conn = mock_conn();
        FtdiCbusController.set_mode(&conn, SwitchMode::Host).unwrap();

        assert_eq!(
            conn.calls(),
            vec![TransportCall::ControlOut {
                request: 0x0B,
                value: 0x20F1,
                index: 0,
            }]
        );
    }

    #[test]
    fn test_repeated_mode_repeats_identical_transfer() {
        let conn = mock_conn();
        let controller = FtdiCbusController;
        controller.set_mode(&conn, SwitchMode::Host).unwrap();
        controller.set_mode(&conn, SwitchMode::Host).unwrap();

        let host_write = TransportCall::ControlOut {
            request: 0x0B,
            value: 0x20F1,
            index: 0,
        };
        assert_eq!(conn.calls(), vec![host_write.clone(), host_write]);
    }

    #[test]
    fn test_control_failure_propagates() {
        let mut spec = MockDeviceSpec::new(SDWIREC_VID, SDWIREC_PID);
        spec.fail_control = true;
        let conn = MockConnection::new(spec);

        let err = FtdiCbusController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ControlFailed(_))
        ));
    }
}
