//! USB transport abstraction layer.
//!
//! The traits in [`traits`] are the seam between device logic and the USB
//! stack: [`nusb`] talks to real hardware, [`mock`] replays scripted
//! devices for tests.

pub mod mock;
pub mod nusb;
pub mod traits;

pub use mock::{MockBus, MockConnection, MockDeviceSpec, TransportCall};
pub use nusb::NusbBus;
pub use traits::{TransportError, UsbBus, UsbConnection, UsbDeviceEntry};
