use core::fmt;
use std::thread;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use hub_transport::HubBus;

use crate::config::{ChannelMode, EncoderMode, HubConfig, BUSES, CHANNELS, ENCODER_PORTS};
use crate::decode::{decode_update, DecodeOutcome, EncoderReading, DEVICE_ID};
use crate::encode::encode_init;
use crate::layout::{plan, FrameLayout};
use crate::peripheral::{DeviceReading, Peripheral};
use crate::{Error, Result};

/// 7-bit I2C address the hub itself answers at.
pub const HUB_I2C_ADDRESS: u8 = 0x57;

/// Firmware version this codec speaks. Any other triple reported by the
/// device-info register aborts initialization.
pub const SUPPORTED_FIRMWARE: FirmwareVersion = FirmwareVersion {
    major: 1,
    minor: 1,
    patch: 1,
};

/// Settle time between the restart command and the first trusted read.
const RESTART_SETTLE: Duration = Duration::from_millis(2500);

const DEVICE_INFO_LEN: usize = 4;

/// Firmware version triple from the device-info register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Fixed register addresses of the hub.
pub mod registers {
    /// Identity byte plus firmware version triple (4 bytes).
    pub const DEVICE_INFO: u8 = 0x00;
    /// Restart strobe; content ignored.
    pub const RESTART: u8 = 0x01;
    /// Variable-length init frame.
    pub const INIT: u8 = 0x02;
    /// Variable-length telemetry frame; length computed per configuration.
    pub const TELEMETRY: u8 = 0x03;
}

/// One hub session: the locked configuration, the frame layout derived
/// from it, and the channel/encoder/device state decoded from telemetry.
///
/// Single-threaded by design: the codec never calls the transport
/// concurrently with itself, and callers needing shared access must
/// serialize externally. Sessions are independent; tests can run several
/// against separate mock buses in one process.
pub struct Hub<B: HubBus> {
    bus: B,
    config: Option<HubConfig>,
    layout: Option<FrameLayout>,
    ready: bool,
    disconnected: bool,
    channel_values: [f64; CHANNELS],
    encoder_values: [EncoderReading; ENCODER_PORTS],
    last_update: Option<OffsetDateTime>,
    settle: Duration,
}

impl<B: HubBus> Hub<B> {
    pub fn new(bus: B) -> Self {
        Self::with_settle_delay(bus, RESTART_SETTLE)
    }

    /// Override the restart settle delay (tests, simulators).
    pub fn with_settle_delay(bus: B, settle: Duration) -> Self {
        Self {
            bus,
            config: None,
            layout: None,
            ready: false,
            disconnected: false,
            channel_values: [0.0; CHANNELS],
            encoder_values: [EncoderReading::default(); ENCODER_PORTS],
            last_update: None,
            settle,
        }
    }

    /// Hand a configuration to the session. Replaces any previous session;
    /// [`Hub::initialize`] must run before polling.
    pub fn configure(&mut self, config: HubConfig) {
        self.config = Some(config);
        self.layout = None;
        self.ready = false;
        self.disconnected = false;
    }

    /// Push the configuration to the hub and arm the session.
    ///
    /// Locks the configuration, plans both frame shapes (an oversized
    /// telemetry frame fails here, before any bus traffic), restarts the
    /// hub, verifies its identity and firmware version, writes the init
    /// frame and runs one poll. A wrong identity byte is a soft failure
    /// that surfaces through [`Hub::is_disconnected`]; a firmware
    /// mismatch is fatal.
    pub fn initialize(&mut self) -> Result<()> {
        let config = self.config.as_mut().ok_or(Error::NotConfigured)?;
        config.lock();

        let layout = plan(config)?;
        let init_frame = encode_init(config, &layout);

        self.ready = false;
        self.disconnected = false;
        self.channel_values = [0.0; CHANNELS];
        self.encoder_values = [EncoderReading::default(); ENCODER_PORTS];
        self.last_update = None;
        self.layout = None;

        self.bus.write(registers::RESTART, &[0])?;
        thread::sleep(self.settle);

        let info = self.bus.read(registers::DEVICE_INFO, DEVICE_INFO_LEN)?;
        if info.len() < DEVICE_INFO_LEN || info[0] != DEVICE_ID {
            warn!("hub did not identify itself; session stays disconnected");
            self.disconnected = true;
            return Ok(());
        }
        let found = FirmwareVersion {
            major: info[1],
            minor: info[2],
            patch: info[3],
        };
        if found != SUPPORTED_FIRMWARE {
            return Err(Error::VersionMismatch {
                expected: SUPPORTED_FIRMWARE,
                found,
            });
        }

        self.layout = Some(layout);
        self.bus.write(registers::INIT, &init_frame)?;
        debug!(
            init_bits = layout.init_bits,
            update_bytes = layout.update_bytes,
            "init frame written"
        );

        self.poll()
    }

    /// Run one read-and-decode cycle against the telemetry register.
    ///
    /// A wrong identity byte flips [`Hub::is_disconnected`]; a corrupt
    /// frame is dropped silently; a good frame clears the flag, updates
    /// every configured value and latches [`Hub::is_ready`].
    pub fn poll(&mut self) -> Result<()> {
        let layout = self.layout.ok_or(Error::NotInitialized)?;
        let frame = self.bus.read(registers::TELEMETRY, layout.update_bytes)?;
        let config = self.config.as_mut().ok_or(Error::NotInitialized)?;
        match decode_update(
            config,
            &layout,
            &frame,
            &mut self.channel_values,
            &mut self.encoder_values,
        )? {
            DecodeOutcome::Decoded => {
                self.disconnected = false;
                self.ready = true;
                self.last_update = Some(OffsetDateTime::now_utc());
            }
            DecodeOutcome::IdentityMismatch => {
                self.disconnected = true;
            }
            DecodeOutcome::ChecksumMismatch => {
                debug!("telemetry frame dropped on checksum mismatch");
            }
        }
        Ok(())
    }

    /// Read the device-info register: the identity byte and the firmware
    /// version triple the hub reports. Usable before `configure`.
    pub fn device_info(&mut self) -> Result<(u8, FirmwareVersion)> {
        let info = self.bus.read(registers::DEVICE_INFO, DEVICE_INFO_LEN)?;
        if info.len() < DEVICE_INFO_LEN {
            return Err(hub_transport::TransportError::MalformedReply("short device info").into());
        }
        Ok((
            info[0],
            FirmwareVersion {
                major: info[1],
                minor: info[2],
                patch: info[3],
            },
        ))
    }

    /// Whether the first initialization-then-decode cycle has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the most recent read failed the identity check.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Wall-clock time of the last successfully decoded frame.
    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.last_update
    }

    /// Current value of analog/digital channel `pin` (1 to 12): 0.0 to 1.0
    /// for analog channels, exactly 0.0 or 1.0 for digital ones.
    pub fn read_channel(&self, pin: u8) -> Result<f64> {
        if !(1..=CHANNELS as u8).contains(&pin) {
            return Err(Error::ChannelOutOfRange(pin));
        }
        let config = self.initialized_config()?;
        if config.channels()[pin as usize - 1] == ChannelMode::None {
            return Err(Error::ChannelNotConfigured(pin));
        }
        Ok(self.channel_values[pin as usize - 1])
    }

    /// Current position and velocity of encoder port `port` (1 to 6).
    pub fn read_encoder(&self, port: u8) -> Result<EncoderReading> {
        if !(1..=ENCODER_PORTS as u8).contains(&port) {
            return Err(Error::EncoderOutOfRange(port));
        }
        let config = self.initialized_config()?;
        if config.encoders()[port as usize - 1] == EncoderMode::None {
            return Err(Error::EncoderNotConfigured(port));
        }
        Ok(self.encoder_values[port as usize - 1])
    }

    /// Snapshot of the device with `type_tag` on bus `bus` (1 to 3).
    pub fn read_peripheral(&self, bus: u8, type_tag: u8) -> Result<DeviceReading> {
        self.bus_devices(bus)?
            .iter()
            .find(|d| d.type_tag() == type_tag)
            .map(|d| d.reading())
            .ok_or(Error::DeviceNotConfigured(bus))
    }

    /// Typed access to a configured peripheral on bus `bus` (1 to 3).
    pub fn device<T: Peripheral>(&self, bus: u8) -> Result<&T> {
        self.bus_devices(bus)?
            .iter()
            .find_map(|d| d.as_any().downcast_ref::<T>())
            .ok_or(Error::DeviceNotConfigured(bus))
    }

    /// Borrow the session's configuration, if one has been handed over.
    pub fn config(&self) -> Option<&HubConfig> {
        self.config.as_ref()
    }

    /// Direct transport access for harnesses and diagnostics.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn initialized_config(&self) -> Result<&HubConfig> {
        if self.layout.is_none() {
            return Err(Error::NotInitialized);
        }
        self.config.as_ref().ok_or(Error::NotInitialized)
    }

    fn bus_devices(&self, bus: u8) -> Result<&[Box<dyn Peripheral>]> {
        if !(1..=BUSES as u8).contains(&bus) {
            return Err(Error::BusOutOfRange(bus));
        }
        Ok(&self.initialized_config()?.buses()[bus as usize - 1])
    }
}
