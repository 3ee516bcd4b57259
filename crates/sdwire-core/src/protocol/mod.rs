//! Protocol module - SDWire identification and wire constants.

pub mod constants;

pub use constants::*;
