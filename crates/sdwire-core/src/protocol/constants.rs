//! Protocol constants for SDWire hardware.
//!
//! The VID/PID table is fixed: each supported hardware generation enumerates
//! with exactly one vendor/product pair, and the pair alone decides which
//! switching mechanism the device speaks.

// ============================================================================
// Device Identification
// ============================================================================

/// SDWireC vendor ID (Samsung; the FTDI bridge on the board carries a
/// reprogrammed EEPROM rather than the FTDI default VID).
pub const SDWIREC_VID: u16 = 0x04E8;
/// SDWireC product ID.
pub const SDWIREC_PID: u16 = 0x6001;
/// Product string reported by SDWireC hardware.
pub const SDWIREC_PRODUCT_NAME: &str = "sd-wire";

/// SDWire3 vendor ID (Realtek card-reader bridge).
pub const SDWIRE3_VID: u16 = 0x0BDA;
/// SDWire3 product ID.
pub const SDWIRE3_PID: u16 = 0x0316;

/// Sentinel used for string descriptors that cannot be read.
pub const UNKNOWN_STRING: &str = "unknown";

// ============================================================================
// FTDI CBUS bit-bang (SDWireC switching mechanism)
// ============================================================================

/// FTDI SIO "set bit mode" vendor request code.
pub const FTDI_SIO_SET_BITMODE_REQUEST: u8 = 0x0B;

/// High byte of wValue selecting CBUS bit-bang mode.
pub const FTDI_SIO_BITMODE_CBUS: u8 = 0x20;

/// Upper-nibble mask driving the four CBUS pins as outputs; the low bit of
/// the nibble below carries the mux position.
pub const CBUS_OUTPUT_MASK: u8 = 0xF0;

/// Compose the SIO_SET_BITMODE wValue word: mode byte in the high half,
/// pin mask OR'd with the mux bit in the low half.
pub const fn cbus_bitmode_value(target_bit: u8) -> u16 {
    ((FTDI_SIO_BITMODE_CBUS as u16) << 8) | (CBUS_OUTPUT_MASK | target_bit) as u16
}

// ============================================================================
// Kernel-driver toggle (SDWire3 switching mechanism)
// ============================================================================

/// Configuration opened before claiming the mass-storage interface.
pub const SDWIRE3_CONFIGURATION: u8 = 1;

/// Interface whose claim/release toggles the kernel driver.
pub const SDWIRE3_INTERFACE: u8 = 0;
