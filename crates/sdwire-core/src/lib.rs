//! SDWire-Core: control library for SDWire SD-card multiplexers.
//!
//! An SDWire board sits between a host machine and a device under test,
//! routing one microSD card to either side over USB. This crate discovers
//! boards, connects to them, and flips the mux, covering both hardware
//! families:
//!
//! - **SDWireC** (FTDI based): switched with a single CBUS bit-bang
//!   control transfer.
//! - **SDWire3** (Realtek card-reader based): switched by cycling
//!   kernel-driver ownership of the card-reader interface around a bus
//!   reset.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: VID/PID table, FTDI register constants
//! - **Transport**: USB communication abstraction (nusb, mock)
//! - **Control**: Per-generation switch strategies
//! - **Registry**: Bus scanning and device selection
//! - **Handle**: The connected device and its operations
//!
//! # Example
//!
//! ```no_run
//! use sdwire_core::{SdWire, SwitchMode};
//!
//! let mut sdwire = SdWire::open_first().expect("no SDWire device");
//! sdwire.set_mode(SwitchMode::Target).expect("switch failed");
//! println!("{sdwire} now feeds the target");
//! ```

pub mod control;
pub mod device;
pub mod error;
pub mod handle;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use control::{ModeController, for_generation};
pub use device::{DeviceGeneration, DeviceInfo, SwitchMode};
pub use error::{Error, Result};
pub use handle::SdWire;
pub use registry::{DeviceRegistry, DeviceSelector};
pub use transport::{MockBus, NusbBus, TransportError, UsbBus, UsbConnection};
