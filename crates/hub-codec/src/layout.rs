use crate::config::{ChannelMode, EncoderMode, HubConfig, BUSES};
use crate::{crc, Error, Result};

/// Init-frame bits per analog/digital channel mode code.
pub(crate) const CHANNEL_MODE_BITS: usize = 2;
/// Init-frame bits per encoder mode code.
pub(crate) const ENCODER_MODE_BITS: usize = 2;
/// Fixed 16-bit payload-length header leading each bus section.
pub(crate) const BUS_HEADER_BITS: usize = 16;
/// Wire tag bits preceding each device's config payload.
pub(crate) const TYPE_TAG_BITS: usize = 4;

/// Telemetry bits per channel in analog mode.
pub(crate) const ANALOG_SAMPLE_BITS: usize = 12;
/// Telemetry bits per active encoder port (i16 position + i32 velocity).
pub(crate) const ENCODER_SAMPLE_BITS: usize = 48;

/// Leading identity byte of every telemetry frame.
const IDENTITY_BITS: usize = 8;

/// Hard firmware cap on one bulk telemetry read.
pub const MAX_UPDATE_BYTES: usize = 100;

/// Frame shape derived from a configuration, computed once per
/// initialization.
///
/// Field offsets within both frames are implicit: encoder and decoder walk
/// the same fixed order (channel modes 1-12, encoder modes 1-6, then buses
/// 1-3 as header + devices in attachment order), so only the totals are
/// recorded here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameLayout {
    /// Total init frame length in bits; encoded zero-padded to bytes.
    pub init_bits: usize,
    /// Per-bus payload lengths written into the 16-bit bus headers.
    pub bus_payload_bits: [u16; BUSES],
    /// Exact byte length of every telemetry frame, trailer included.
    pub update_bytes: usize,
}

/// Derive both frame shapes from a configuration.
///
/// Fails with [`Error::FrameTooLarge`] when the telemetry frame would
/// exceed the firmware's bulk-read cap; callers must send nothing to the
/// hub in that case.
pub fn plan(config: &HubConfig) -> Result<FrameLayout> {
    let mut init_bits = config.channels().len() * CHANNEL_MODE_BITS
        + config.encoders().len() * ENCODER_MODE_BITS
        + BUSES * BUS_HEADER_BITS;

    let mut update_bits = IDENTITY_BITS;

    for mode in config.channels() {
        match mode {
            ChannelMode::Analog => update_bits += ANALOG_SAMPLE_BITS,
            ChannelMode::Digital => update_bits += 1,
            ChannelMode::None => {}
        }
    }

    for mode in config.encoders() {
        if *mode != EncoderMode::None {
            update_bits += ENCODER_SAMPLE_BITS;
        }
    }

    let mut bus_payload_bits = [0u16; BUSES];
    for (bus, devices) in config.buses().iter().enumerate() {
        let mut payload = 0usize;
        for device in devices {
            payload += TYPE_TAG_BITS + device.config_len();
            update_bits += device.reply_len();
        }
        bus_payload_bits[bus] = payload as u16;
        init_bits += payload;
    }

    let update_bytes = crc::TRAILER_BYTES + update_bits.div_ceil(8);
    if update_bytes > MAX_UPDATE_BYTES {
        return Err(Error::FrameTooLarge(update_bytes));
    }

    Ok(FrameLayout {
        init_bits,
        bus_payload_bits,
        update_bytes,
    })
}
