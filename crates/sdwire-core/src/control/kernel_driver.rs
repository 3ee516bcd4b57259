//! Kernel-driver toggle switching for card-reader based SDWire3 boards.

use tracing::{debug, instrument, warn};

use super::ModeController;
use crate::device::SwitchMode;
use crate::error::Result;
use crate::protocol::{SDWIRE3_CONFIGURATION, SDWIRE3_INTERFACE};
use crate::transport::UsbConnection;

/// Drives the mux by toggling ownership of the card-reader interface.
///
/// The bridge has no switch register. Which side holds the card is decided
/// by who owns the mass-storage interface when the device comes out of a
/// bus reset: resetting with the kernel driver detached parks the card on
/// the target, resetting with it attached hands the card to the host.
pub struct KernelDriverController;

impl ModeController for KernelDriverController {
    #[instrument(skip(self, conn), fields(mode = %mode))]
    fn set_mode(&self, conn: &dyn UsbConnection, mode: SwitchMode) -> Result<()> {
        conn.set_auto_detach(true)?;

        if mode == SwitchMode::Target {
            match conn.open_configuration(SDWIRE3_CONFIGURATION) {
                Ok(()) => match conn.claim_interface(SDWIRE3_INTERFACE) {
                    Ok(()) => conn.release_interface(SDWIRE3_INTERFACE),
                    // The reset still lands without the claim; the switch
                    // just becomes less reliable on a contended bus.
                    Err(e) => debug!(error = %e, "Interface claim failed, resetting anyway"),
                },
                Err(e) => {
                    warn!(error = %e, "Configuration unavailable, falling back to bare reset");
                }
            }
        }

        conn.reset()?;
        debug!("Switch cycle complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{SDWIRE3_PID, SDWIRE3_VID};
    use crate::transport::{MockConnection, MockDeviceSpec, TransportCall, TransportError};

    fn spec() -> MockDeviceSpec {
        MockDeviceSpec::new(SDWIRE3_VID, SDWIRE3_PID)
    }

    #[test]
    fn test_host_is_detach_then_reset() {
        let conn = MockConnection::new(spec());
        KernelDriverController
            .set_mode(&conn, SwitchMode::Host)
            .unwrap();

        assert_eq!(
            conn.calls(),
            vec![
                TransportCall::SetAutoDetach { enabled: true },
                TransportCall::Reset,
            ]
        );
    }

    #[test]
    fn test_target_cycles_the_interface_before_reset() {
        let conn = MockConnection::new(spec());
        KernelDriverController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap();

        assert_eq!(
            conn.calls(),
            vec![
                TransportCall::SetAutoDetach { enabled: true },
                TransportCall::OpenConfiguration { configuration: 1 },
                TransportCall::ClaimInterface { interface: 0 },
                TransportCall::ReleaseInterface { interface: 0 },
                TransportCall::Reset,
            ]
        );
    }

    #[test]
    fn test_target_falls_back_to_bare_reset() {
        let mut spec = spec();
        spec.fail_open_configuration = true;
        let conn = MockConnection::new(spec);

        KernelDriverController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap();

        // No claim attempt once the configuration is unavailable.
        assert_eq!(
            conn.calls(),
            vec![
                TransportCall::SetAutoDetach { enabled: true },
                TransportCall::Reset,
            ]
        );
    }

    #[test]
    fn test_fallback_reports_reset_outcome_not_config_error() {
        let mut spec = spec();
        spec.fail_open_configuration = true;
        spec.fail_reset = true;
        let conn = MockConnection::new(spec);

        let err = KernelDriverController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ResetFailed(_))
        ));
    }

    #[test]
    fn test_target_claim_failure_still_resets() {
        let mut spec = spec();
        spec.fail_claim_interface = true;
        let conn = MockConnection::new(spec);

        KernelDriverController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap();

        assert_eq!(
            conn.calls(),
            vec![
                TransportCall::SetAutoDetach { enabled: true },
                TransportCall::OpenConfiguration { configuration: 1 },
                TransportCall::Reset,
            ]
        );
    }

    #[test]
    fn test_auto_detach_failure_is_fatal() {
        let mut spec = spec();
        spec.fail_set_auto_detach = true;
        let conn = MockConnection::new(spec);

        let err = KernelDriverController
            .set_mode(&conn, SwitchMode::Target)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::AutoDetachFailed(_))
        ));
        assert!(conn.calls().is_empty());
    }

    #[test]
    fn test_reset_failure_propagates() {
        let mut spec = spec();
        spec.fail_reset = true;
        let conn = MockConnection::new(spec);

        let err = KernelDriverController
            .set_mode(&conn, SwitchMode::Host)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::ResetFailed(_))
        ));
    }
}
