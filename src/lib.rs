//!
//! A platform-agnostic driver for the NAU7802 24-bit load cell ADC. Built using embedded-hal.
//!
//! Covers the power-up and reset sequencing, analog front end configuration and self
//! calibration, raw sample reads and the two-point (zero offset + calibration factor)
//! conversion from raw counts to weight. Storing the calibration values between boots is left
//! to the caller, see [`NAU7802Driver::calibration`] and [`NAU7802Driver::set_calibration`].
//!

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod driver;
pub mod register;
pub mod types;

pub use driver::*;
pub use register::{Field, Register, DEFAULT_ADDRESS};
pub use types::*;
