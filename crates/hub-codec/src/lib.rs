//! hub-codec: configuration/telemetry codec for the sensor expansion hub
//!
//! The hub multiplexes 12 analog/digital channels, 6 encoder ports and up to
//! three downstream I2C buses behind one register interface. The shape of
//! both protocol frames is derived from the host's configuration at runtime:
//! this crate plans that shape, packs the bit-level init frame, and
//! validates/decodes every fixed-length telemetry frame the hub emits
//! afterwards.

mod error;
pub use error::{Error, Result};

mod bits;
pub use bits::{BitBuffer, BitReader, BitWriter};

pub mod crc;

mod config;
pub use config::{ChannelMode, EncoderMode, HubConfig, BUSES, CHANNELS, ENCODER_PORTS};

mod peripheral;
pub use peripheral::{DeviceReading, FieldValue, Peripheral};

pub mod devices;

mod layout;
pub use layout::{plan, FrameLayout, MAX_UPDATE_BYTES};

mod encode;
pub use encode::encode_init;

mod decode;
pub use decode::{decode_update, DecodeOutcome, EncoderReading, DEVICE_ID};

mod hub;
pub use hub::{registers, FirmwareVersion, Hub, HUB_I2C_ADDRESS, SUPPORTED_FIRMWARE};
