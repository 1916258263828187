use std::any::Any;
use std::collections::BTreeMap;

use crate::bits::{BitReader, BitWriter};
use crate::peripheral::{DeviceReading, FieldValue, Peripheral};
use crate::Result;

/// APDS-9151 proximity and RGB+IR light sensor.
///
/// Telemetry (92 bits): disconnect(1), proximity u11, then four 20-bit
/// light channels: infrared, red, green, blue. No configuration payload.
#[derive(Debug, Default)]
pub struct Apds9151 {
    pub disconnected: bool,
    pub proximity: u16,
    pub infrared: u32,
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl Apds9151 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for Apds9151 {
    fn name(&self) -> &'static str {
        "apds9151"
    }

    fn type_tag(&self) -> u8 {
        0
    }

    fn address(&self) -> u8 {
        0x52
    }

    fn config_len(&self) -> usize {
        0
    }

    fn write_config(&self, _w: &mut BitWriter) {}

    fn reply_len(&self) -> usize {
        92
    }

    fn decode(&mut self, r: &mut BitReader<'_>) -> Result<()> {
        self.disconnected = r.read_bit()?;
        if self.disconnected {
            return Ok(());
        }
        self.proximity = r.read_bits(11)? as u16;
        self.infrared = r.read_bits(20)? as u32;
        self.red = r.read_bits(20)? as u32;
        self.green = r.read_bits(20)? as u32;
        self.blue = r.read_bits(20)? as u32;
        Ok(())
    }

    fn reading(&self) -> DeviceReading {
        let mut fields = BTreeMap::new();
        fields.insert("proximity".into(), FieldValue::I64(self.proximity as i64));
        fields.insert("infrared".into(), FieldValue::I64(self.infrared as i64));
        fields.insert("red".into(), FieldValue::I64(self.red as i64));
        fields.insert("green".into(), FieldValue::I64(self.green as i64));
        fields.insert("blue".into(), FieldValue::I64(self.blue as i64));
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
