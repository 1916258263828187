use thiserror::Error;

use crate::hub::FirmwareVersion;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("channel must be from 1 to 12, got {0}")]
    ChannelOutOfRange(u8),
    #[error("encoder port must be from 1 to 6, got {0}")]
    EncoderOutOfRange(u8),
    #[error("bus must be from 1 to 3, got {0}")]
    BusOutOfRange(u8),
    #[error("bus {bus} already has a device with type tag {tag}")]
    DuplicateDeviceType { bus: u8, tag: u8 },
    #[error("bus {bus} already has a device at address {address:#04x}")]
    DuplicateAddress { bus: u8, address: u8 },
    #[error("configuration is locked; it cannot change for the rest of the session")]
    ConfigLocked,
    #[error("telemetry frame would be {0} bytes; the bulk-read cap is 100")]
    FrameTooLarge(usize),
    #[error("firmware version mismatch: hub reports v{found}, this codec speaks v{expected}")]
    VersionMismatch {
        expected: FirmwareVersion,
        found: FirmwareVersion,
    },
    #[error("no configuration has been provided")]
    NotConfigured,
    #[error("the hub has not been initialized")]
    NotInitialized,
    #[error("channel {0} was not configured")]
    ChannelNotConfigured(u8),
    #[error("encoder port {0} was not configured")]
    EncoderNotConfigured(u8),
    #[error("no matching peripheral configured on bus {0}")]
    DeviceNotConfigured(u8),
    #[error("bit range {start}+{len} out of bounds of a {bit_len}-bit buffer")]
    BitRangeOutOfBounds {
        start: usize,
        len: usize,
        bit_len: usize,
    },
    #[error(transparent)]
    Transport(#[from] hub_transport::TransportError),
}
