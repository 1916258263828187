//! hub-transport: blocking register transport to the sensor expansion hub
//!
//! This crate provides the byte-oriented read/write contract the hub codec
//! consumes, with feature-gated backends. The default build enables a `mock`
//! backend so that binaries and tests can run on any host without hardware
//! attached.

mod types;
pub use types::BusInfo;

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::HubBus;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockBus;

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::BridgeBus;
