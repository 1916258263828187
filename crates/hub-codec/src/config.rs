use crate::peripheral::Peripheral;
use crate::{Error, Result};

/// Number of analog/digital channels on the hub.
pub const CHANNELS: usize = 12;
/// Number of encoder ports.
pub const ENCODER_PORTS: usize = 6;
/// Number of downstream I2C buses.
pub const BUSES: usize = 3;

/// Operating mode of one analog/digital channel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChannelMode {
    Analog,
    Digital,
    #[default]
    None,
}

impl ChannelMode {
    /// 2-bit wire code in the init frame.
    pub(crate) fn code(self) -> u8 {
        match self {
            ChannelMode::Analog => 0,
            ChannelMode::Digital => 1,
            ChannelMode::None => 2,
        }
    }
}

/// Operating mode of one encoder port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EncoderMode {
    Quadrature,
    Pwm,
    #[default]
    None,
}

impl EncoderMode {
    /// 2-bit wire code in the init frame.
    pub(crate) fn code(self) -> u8 {
        match self {
            EncoderMode::Quadrature => 0,
            EncoderMode::Pwm => 1,
            EncoderMode::None => 2,
        }
    }
}

/// Host-selected hub configuration: channel modes, encoder modes and the
/// peripherals attached to each downstream bus.
///
/// Mutable while being built; the hub locks it when it is handed over at
/// initialization, after which every setter fails with
/// [`Error::ConfigLocked`] for the rest of the session.
#[derive(Default)]
pub struct HubConfig {
    locked: bool,
    channels: [ChannelMode; CHANNELS],
    encoders: [EncoderMode; ENCODER_PORTS],
    buses: [Vec<Box<dyn Peripheral>>; BUSES],
}

impl HubConfig {
    /// All channels and ports default to `None`, buses to empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure analog/digital channel `pin` (1 to 12).
    pub fn set_channel(&mut self, pin: u8, mode: ChannelMode) -> Result<()> {
        if !(1..=CHANNELS as u8).contains(&pin) {
            return Err(Error::ChannelOutOfRange(pin));
        }
        self.ensure_unlocked()?;
        self.channels[pin as usize - 1] = mode;
        Ok(())
    }

    /// Configure encoder port `port` (1 to 6).
    pub fn set_encoder(&mut self, port: u8, mode: EncoderMode) -> Result<()> {
        if !(1..=ENCODER_PORTS as u8).contains(&port) {
            return Err(Error::EncoderOutOfRange(port));
        }
        self.ensure_unlocked()?;
        self.encoders[port as usize - 1] = mode;
        Ok(())
    }

    /// Attach a peripheral to downstream bus `bus` (1 to 3).
    ///
    /// Device type tags and bus addresses must be unique per bus; a clash
    /// is a configuration error raised here, never at poll time.
    pub fn attach(&mut self, bus: u8, device: Box<dyn Peripheral>) -> Result<()> {
        if !(1..=BUSES as u8).contains(&bus) {
            return Err(Error::BusOutOfRange(bus));
        }
        self.ensure_unlocked()?;
        let devices = &mut self.buses[bus as usize - 1];
        for existing in devices.iter() {
            if existing.type_tag() == device.type_tag() {
                return Err(Error::DuplicateDeviceType {
                    bus,
                    tag: device.type_tag(),
                });
            }
            if existing.address() == device.address() {
                return Err(Error::DuplicateAddress {
                    bus,
                    address: device.address(),
                });
            }
        }
        devices.push(device);
        Ok(())
    }

    /// Freeze the configuration. Idempotent; called by the hub when it
    /// takes the configuration at initialization.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn channels(&self) -> &[ChannelMode; CHANNELS] {
        &self.channels
    }

    pub fn encoders(&self) -> &[EncoderMode; ENCODER_PORTS] {
        &self.encoders
    }

    pub fn buses(&self) -> &[Vec<Box<dyn Peripheral>>; BUSES] {
        &self.buses
    }

    pub(crate) fn buses_mut(&mut self) -> &mut [Vec<Box<dyn Peripheral>>; BUSES] {
        &mut self.buses
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(Error::ConfigLocked);
        }
        Ok(())
    }
}
