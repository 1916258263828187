use std::any::Any;
use std::collections::BTreeMap;

use crate::bits::{BitReader, BitWriter};
use crate::peripheral::{DeviceReading, FieldValue, Peripheral};
use crate::Result;

/// VL53L0X single-zone time-of-flight ranger.
///
/// Telemetry (17 bits): disconnect(1) + u16 distance in millimeters. No
/// configuration payload.
#[derive(Debug, Default)]
pub struct Vl53l0x {
    pub disconnected: bool,
    pub distance_mm: f32,
}

impl Vl53l0x {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for Vl53l0x {
    fn name(&self) -> &'static str {
        "vl53l0x"
    }

    fn type_tag(&self) -> u8 {
        2
    }

    fn address(&self) -> u8 {
        0x29
    }

    fn config_len(&self) -> usize {
        0
    }

    fn write_config(&self, _w: &mut BitWriter) {}

    fn reply_len(&self) -> usize {
        17
    }

    fn decode(&mut self, r: &mut BitReader<'_>) -> Result<()> {
        self.disconnected = r.read_bit()?;
        if self.disconnected {
            return Ok(());
        }
        self.distance_mm = r.read_bits(16)? as f32;
        Ok(())
    }

    fn reading(&self) -> DeviceReading {
        let mut fields = BTreeMap::new();
        fields.insert(
            "distance_mm".into(),
            FieldValue::F64(self.distance_mm as f64),
        );
        DeviceReading {
            device: self.name().to_string(),
            disconnected: self.disconnected,
            fields,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitBuffer;

    #[test]
    fn test_decode_distance() {
        let mut w = BitWriter::new();
        w.write_bit(false);
        w.write_bits(1250, 16);
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        let mut dev = Vl53l0x::new();
        dev.decode(&mut BitReader::new(&buf)).unwrap();
        assert!(!dev.disconnected);
        assert_eq!(dev.distance_mm, 1250.0);
    }

    #[test]
    fn test_full_scale_is_unsigned() {
        let mut w = BitWriter::new();
        w.write_bit(false);
        w.write_bits(0xFFFF, 16);
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        let mut dev = Vl53l0x::new();
        dev.decode(&mut BitReader::new(&buf)).unwrap();
        assert_eq!(dev.distance_mm, 65535.0);
    }

    #[test]
    fn test_disconnect_bit_keeps_previous_distance() {
        let mut dev = Vl53l0x::new();
        dev.distance_mm = 42.0;
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.write_bits(0, 16);
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        dev.decode(&mut BitReader::new(&buf)).unwrap();
        assert!(dev.disconnected);
        assert_eq!(dev.distance_mm, 42.0);
    }
}
