use crate::bits::BitWriter;
use crate::config::HubConfig;
use crate::layout::{FrameLayout, BUS_HEADER_BITS, CHANNEL_MODE_BITS, ENCODER_MODE_BITS, TYPE_TAG_BITS};

/// Serialize the init frame for a planned configuration.
///
/// Fields follow the fixed wire order: channel mode codes 1-12, encoder
/// mode codes 1-6, then each bus as its 16-bit payload header followed by
/// the attached devices in order (4-bit type tag, then config payload).
/// The final partial byte zero-pads. Idempotent for a locked
/// configuration.
pub fn encode_init(config: &HubConfig, layout: &FrameLayout) -> Vec<u8> {
    let mut w = BitWriter::with_bit_capacity(layout.init_bits);

    for mode in config.channels() {
        w.write_bits(mode.code() as u64, CHANNEL_MODE_BITS);
    }

    for mode in config.encoders() {
        w.write_bits(mode.code() as u64, ENCODER_MODE_BITS);
    }

    for (bus, devices) in config.buses().iter().enumerate() {
        w.write_bits(layout.bus_payload_bits[bus] as u64, BUS_HEADER_BITS);
        for device in devices {
            w.write_bits(device.type_tag() as u64, TYPE_TAG_BITS);
            device.write_config(&mut w);
        }
    }

    debug_assert_eq!(w.bit_len(), layout.init_bits);
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelMode, EncoderMode};
    use crate::devices::{Resolution, Vl53l5cx};
    use crate::layout::plan;

    #[test]
    fn test_empty_config_golden_bytes() {
        let config = HubConfig::new();
        let layout = plan(&config).unwrap();
        let frame = encode_init(&config, &layout);
        // 18 mode codes of 0b10 pack to alternating bits, then zero headers
        assert_eq!(
            frame,
            vec![0xAA, 0xAA, 0xAA, 0xAA, 0x0A, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_mode_codes_pack_lsb_first() {
        let mut config = HubConfig::new();
        config.set_channel(1, ChannelMode::Analog).unwrap();
        config.set_channel(2, ChannelMode::Digital).unwrap();
        config.set_encoder(1, EncoderMode::Quadrature).unwrap();
        config.set_encoder(2, EncoderMode::Pwm).unwrap();
        let layout = plan(&config).unwrap();
        let frame = encode_init(&config, &layout);
        // Channels: 00 01 then ten 10s
        assert_eq!(frame[0], 0b1010_0100);
        // Encoders start at bit 24: 00 01 10 10 -> 0xA4 again
        assert_eq!(frame[3], 0b1010_0100);
    }

    #[test]
    fn test_bus_sections_carry_header_then_tag_then_config() {
        let mut config = HubConfig::new();
        config
            .attach(1, Box::new(Vl53l5cx::new(Resolution::Grid8x8)))
            .unwrap();
        let layout = plan(&config).unwrap();
        assert_eq!(layout.bus_payload_bits, [5, 0, 0]);
        let frame = encode_init(&config, &layout);
        assert_eq!(frame.len(), layout.init_bits.div_ceil(8));
        // Bus 1 header (bits 36..52) reads back 5, tag (52..56) reads 1,
        // then the single 8x8 grid-select bit
        let buf = crate::bits::BitBuffer::from_bytes(&frame);
        assert_eq!(buf.get_range(36, 16).unwrap(), 5);
        assert_eq!(buf.get_range(52, 4).unwrap(), 1);
        assert!(buf.get_bit(56).unwrap());
        // Remaining bus headers and the pad stay zero
        assert_eq!(buf.get_range(57, 7).unwrap(), 0);
        assert_eq!(buf.get_range(64, 32).unwrap(), 0);
    }

    #[test]
    fn test_idempotent_for_same_config() {
        let mut config = HubConfig::new();
        config.set_channel(5, ChannelMode::Analog).unwrap();
        config.lock();
        let layout = plan(&config).unwrap();
        assert_eq!(encode_init(&config, &layout), encode_init(&config, &layout));
    }
}
