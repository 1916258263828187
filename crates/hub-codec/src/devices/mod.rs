//! Reference peripheral implementations for the downstream I2C buses.
//!
//! Each device implements [`crate::Peripheral`]; its telemetry slice always
//! leads with a 1-bit device-disconnect flag that gates the rest.

mod apds9151;
pub use apds9151::Apds9151;

mod vl53l5cx;
pub use vl53l5cx::{Resolution, Vl53l5cx};

mod vl53l0x;
pub use vl53l0x::Vl53l0x;

mod pinpoint;
pub use pinpoint::{Direction, Pinpoint};
