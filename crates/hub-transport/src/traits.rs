use crate::{BusInfo, Result};

/// A minimal blocking register-window bus interface.
///
/// The hub exposes a handful of fixed register addresses; each read or write
/// targets one of them and transfers whole bytes. Backends own any blocking
/// or timeout behavior of the underlying link.
pub trait HubBus {
    /// Open a bus endpoint by name (e.g., "mock0", "/dev/tty.usbmodem1").
    fn open(name: &str) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list available endpoints for this backend.
    fn list() -> Result<Vec<BusInfo>>;

    /// Read `len` bytes from a register window (blocking).
    fn read(&mut self, register: u8, len: usize) -> Result<Vec<u8>>;

    /// Write `bytes` to a register window (blocking).
    fn write(&mut self, register: u8, bytes: &[u8]) -> Result<()>;
}
