use std::any::Any;
use std::collections::BTreeMap;

use crate::bits::{BitReader, BitWriter};
use crate::peripheral::{DeviceReading, FieldValue, Peripheral};
use crate::Result;

/// Zone grid of the VL53L5CX multizone ranger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    Grid4x4,
    Grid8x8,
}

impl Resolution {
    pub fn zones(self) -> usize {
        match self {
            Resolution::Grid4x4 => 16,
            Resolution::Grid8x8 => 64,
        }
    }
}

/// VL53L5CX multizone time-of-flight ranger.
///
/// One configuration bit selects the zone grid (0 = 4x4, 1 = 8x8); the
/// telemetry slice is the disconnect bit followed by one u11 distance in
/// millimeters per zone, row-major.
#[derive(Debug)]
pub struct Vl53l5cx {
    resolution: Resolution,
    pub disconnected: bool,
    pub distances_mm: Vec<u16>,
}

impl Vl53l5cx {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            disconnected: false,
            distances_mm: vec![0; resolution.zones()],
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl Peripheral for Vl53l5cx {
    fn name(&self) -> &'static str {
        "vl53l5cx"
    }

    fn type_tag(&self) -> u8 {
        1
    }

    fn address(&self) -> u8 {
        0x29
    }

    fn config_len(&self) -> usize {
        1
    }

    fn write_config(&self, w: &mut BitWriter) {
        w.write_bit(self.resolution == Resolution::Grid8x8);
    }

    fn reply_len(&self) -> usize {
        1 + self.resolution.zones() * 11
    }

    fn decode(&mut self, r: &mut BitReader<'_>) -> Result<()> {
        self.disconnected = r.read_bit()?;
        if self.disconnected {
            return Ok(());
        }
        for zone in 0..self.resolution.zones() {
            self.distances_mm[zone] = r.read_bits(11)? as u16;
        }
        Ok(())
    }

    fn reading(&self) -> DeviceReading {
        let mut fields = BTreeMap::new();
        fields.insert(
            "distances_mm".into(),
            FieldValue::List(
                self.distances_mm
                    .iter()
                    .map(|d| FieldValue::I64(*d as i64))
                    .collect(),
            ),
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
    fn test_reply_length_tracks_resolution() {
        assert_eq!(Vl53l5cx::new(Resolution::Grid4x4).reply_len(), 177);
        assert_eq!(Vl53l5cx::new(Resolution::Grid8x8).reply_len(), 705);
    }

    #[test]
    fn test_config_bit_is_the_grid_select() {
        let mut w = BitWriter::new();
        Vl53l5cx::new(Resolution::Grid4x4).write_config(&mut w);
        Vl53l5cx::new(Resolution::Grid8x8).write_config(&mut w);
        assert_eq!(w.bit_len(), 2);
        assert_eq!(w.into_bytes(), vec![0b10]);
    }

    #[test]
    fn test_decode_4x4_grid() {
        let mut w = BitWriter::new();
        w.write_bit(false);
        for zone in 0..16u64 {
            w.write_bits(zone * 100, 11);
        }
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        let mut dev = Vl53l5cx::new(Resolution::Grid4x4);
        dev.decode(&mut BitReader::new(&buf)).unwrap();
        assert!(!dev.disconnected);
        assert_eq!(dev.distances_mm[0], 0);
        assert_eq!(dev.distances_mm[7], 700);
        assert_eq!(dev.distances_mm[15], 1500);
    }

    #[test]
    fn test_disconnect_bit_keeps_previous_distances() {
        let mut dev = Vl53l5cx::new(Resolution::Grid4x4);
        let mut w = BitWriter::new();
        w.write_bit(false);
        for _ in 0..16 {
            w.write_bits(321, 11);
        }
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        dev.decode(&mut BitReader::new(&buf)).unwrap();

        let mut w = BitWriter::new();
        w.write_bit(true);
        for _ in 0..16 {
            w.write_bits(0x7FF, 11);
        }
        let buf = BitBuffer::from_bytes(&w.into_bytes());
        dev.decode(&mut BitReader::new(&buf)).unwrap();
        assert!(dev.disconnected);
        assert!(dev.distances_mm.iter().all(|d| *d == 321));
    }
}
