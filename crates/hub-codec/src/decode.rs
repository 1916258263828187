use serde::{Deserialize, Serialize};

use crate::bits::{BitBuffer, BitReader};
use crate::config::{ChannelMode, EncoderMode, HubConfig, CHANNELS, ENCODER_PORTS};
use crate::crc;
use crate::layout::{FrameLayout, ANALOG_SAMPLE_BITS};
use crate::Result;

/// Identity byte every hub-originated frame leads with.
pub const DEVICE_ID: u8 = 0x61;

/// Full-scale raw value of a 12-bit analog sample.
const ANALOG_FULL_SCALE: f64 = 4095.0;

/// Position and velocity of one encoder port.
///
/// Quadrature ports report position as the running tick total accumulated
/// across the session; PWM ports report the absolute pulse-width sample in
/// microseconds. Velocity is absolute in both modes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncoderReading {
    pub position: i32,
    pub velocity: i32,
}

/// Result of one telemetry frame decode attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodeOutcome {
    /// Frame validated; all configured values were updated.
    Decoded,
    /// Empty frame or wrong identity byte: the hub is not answering.
    IdentityMismatch,
    /// Wrong length or trailer mismatch: corrupt frame, dropped without
    /// touching any decoded state.
    ChecksumMismatch,
}

impl EncoderMode {
    /// Per-mode decode strategy: quadrature accumulates a signed delta
    /// into the running position, PWM replaces the absolute sample, and
    /// unconfigured ports carry no bits at all.
    fn decode_into(self, r: &mut BitReader<'_>, state: &mut EncoderReading) -> Result<()> {
        match self {
            EncoderMode::Quadrature => {
                let delta = r.read_i16()?;
                state.position = state.position.wrapping_add(delta as i32);
                state.velocity = r.read_i32()?;
            }
            EncoderMode::Pwm => {
                state.position = r.read_i16()? as i32;
                state.velocity = r.read_i32()?;
            }
            EncoderMode::None => {}
        }
        Ok(())
    }
}

/// Validate and decode one telemetry frame in place.
///
/// Walks the same fixed field order the planner derived lengths from,
/// starting past the identity byte: analog/digital channels 1-12, encoder
/// ports 1-6, then every attached peripheral in bus and attachment order.
/// Each peripheral consumes exactly its own reply slice; the cursor is
/// re-seated afterwards so a misbehaving decoder cannot shift its
/// neighbors.
pub fn decode_update(
    config: &mut HubConfig,
    layout: &FrameLayout,
    frame: &[u8],
    channels: &mut [f64; CHANNELS],
    encoders: &mut [EncoderReading; ENCODER_PORTS],
) -> Result<DecodeOutcome> {
    if frame.is_empty() || frame[0] != DEVICE_ID {
        return Ok(DecodeOutcome::IdentityMismatch);
    }
    if frame.len() != layout.update_bytes || !crc::validate(frame) {
        return Ok(DecodeOutcome::ChecksumMismatch);
    }

    let buf = BitBuffer::from_bytes(frame);
    let mut r = BitReader::at(&buf, 8);

    for (i, mode) in config.channels().iter().enumerate() {
        match mode {
            ChannelMode::Analog => {
                channels[i] = r.read_bits(ANALOG_SAMPLE_BITS)? as f64 / ANALOG_FULL_SCALE;
            }
            ChannelMode::Digital => {
                channels[i] = if r.read_bit()? { 1.0 } else { 0.0 };
            }
            ChannelMode::None => {}
        }
    }

    let encoder_modes = *config.encoders();
    for (i, mode) in encoder_modes.iter().enumerate() {
        mode.decode_into(&mut r, &mut encoders[i])?;
    }

    for devices in config.buses_mut() {
        for device in devices.iter_mut() {
            let start = r.pos();
            device.decode(&mut r)?;
            r.seek(start + device.reply_len());
        }
    }

    Ok(DecodeOutcome::Decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitWriter;
    use crate::devices::Apds9151;
    use crate::layout::plan;

    fn decode(
        config: &mut HubConfig,
        layout: &FrameLayout,
        frame: &[u8],
        channels: &mut [f64; CHANNELS],
        encoders: &mut [EncoderReading; ENCODER_PORTS],
    ) -> DecodeOutcome {
        decode_update(config, layout, frame, channels, encoders).unwrap()
    }

    fn sealed(w: BitWriter) -> Vec<u8> {
        let mut frame = w.into_bytes();
        crc::seal(&mut frame);
        frame
    }

    #[test]
    fn test_analog_normalization() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Analog).unwrap();
        config.set_channel(2, ChannelMode::Analog).unwrap();
        config.set_channel(3, ChannelMode::Analog).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.0; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        let mut w = BitWriter::new();
        w.write_bits(DEVICE_ID as u64, 8);
        w.write_bits(4095, 12);
        w.write_bits(0, 12);
        w.write_bits(2048, 12);
        let outcome = decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);
        assert_eq!(outcome, DecodeOutcome::Decoded);
        assert_eq!(channels[0], 1.0);
        assert_eq!(channels[1], 0.0);
        assert_eq!(channels[2], 2048.0 / 4095.0);
    }

    #[test]
    fn test_digital_channels_are_single_bits() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Digital).unwrap();
        config.set_channel(12, ChannelMode::Digital).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.5; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        let mut w = BitWriter::new();
        w.write_bits(DEVICE_ID as u64, 8);
        w.write_bit(true);
        w.write_bit(false);
        decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);
        assert_eq!(channels[0], 1.0);
        assert_eq!(channels[11], 0.0);
        // Unconfigured channels are untouched
        assert_eq!(channels[5], 0.5);
    }

    #[test]
    fn test_quadrature_accumulates_deltas() {
        let mut config = HubConfig::new();
        config.set_encoder(1, EncoderMode::Quadrature).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.0; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        for (delta, expected) in [(5i16, 5i32), (-2, 3), (100, 103)] {
            let mut w = BitWriter::new();
            w.write_bits(DEVICE_ID as u64, 8);
            w.write_bits(delta as u16 as u64, 16);
            w.write_bits(1000u64, 32);
            decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);
            assert_eq!(encoders[0].position, expected);
            assert_eq!(encoders[0].velocity, 1000);
        }
    }

    #[test]
    fn test_pwm_is_absolute() {
        let mut config = HubConfig::new();
        config.set_encoder(2, EncoderMode::Pwm).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.0; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        for _ in 0..2 {
            let mut w = BitWriter::new();
            w.write_bits(DEVICE_ID as u64, 8);
            w.write_bits(42, 16);
            w.write_bits(-7i32 as u32 as u64, 32);
            decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);
            assert_eq!(encoders[1].position, 42);
            assert_eq!(encoders[1].velocity, -7);
        }
    }

    #[test]
    fn test_identity_mismatch_leaves_state_alone() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Analog).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.25; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        let mut w = BitWriter::new();
        w.write_bits(0x60, 8);
        w.write_bits(4095, 12);
        let outcome = decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);
        assert_eq!(outcome, DecodeOutcome::IdentityMismatch);
        assert_eq!(channels[0], 0.25);

        assert_eq!(
            decode(&mut config, &layout, &[], &mut channels, &mut encoders),
            DecodeOutcome::IdentityMismatch
        );
    }

    #[test]
    fn test_corrupt_frame_is_dropped() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Analog).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.25; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        let mut w = BitWriter::new();
        w.write_bits(DEVICE_ID as u64, 8);
        w.write_bits(4095, 12);
        let mut frame = sealed(w);
        frame[1] ^= 0x10;
        let outcome = decode(&mut config, &layout, &frame, &mut channels, &mut encoders);
        assert_eq!(outcome, DecodeOutcome::ChecksumMismatch);
        assert_eq!(channels[0], 0.25);
    }

    #[test]
    fn test_wrong_length_frame_is_dropped() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Analog).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.0; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        // Valid trailer, but one byte short of the planned length
        let mut frame = vec![DEVICE_ID];
        crc::seal(&mut frame);
        let outcome = decode(&mut config, &layout, &frame, &mut channels, &mut encoders);
        assert_eq!(outcome, DecodeOutcome::ChecksumMismatch);
    }

    #[test]
    fn test_devices_decode_their_own_slice() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Digital).unwrap();
        config.attach(2, Box::new(Apds9151::new())).unwrap();
        let layout = plan(&config).unwrap();
        let mut channels = [0.0; CHANNELS];
        let mut encoders = [EncoderReading::default(); ENCODER_PORTS];

        let mut w = BitWriter::new();
        w.write_bits(DEVICE_ID as u64, 8);
        w.write_bit(true); // digital channel 1
        w.write_bit(false); // device connected
        w.write_bits(123, 11);
        w.write_bits(10, 20);
        w.write_bits(20, 20);
        w.write_bits(30, 20);
        w.write_bits(40, 20);
        decode(&mut config, &layout, &sealed(w), &mut channels, &mut encoders);

        let device = config.buses()[1][0]
            .as_any()
            .downcast_ref::<Apds9151>()
            .unwrap();
        assert_eq!(device.proximity, 123);
        assert_eq!(device.green, 30);
        assert_eq!(channels[0], 1.0);
    }
}
