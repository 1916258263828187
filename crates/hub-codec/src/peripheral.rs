use std::any::Any;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bits::{BitReader, BitWriter};
use crate::Result;

/// Capability contract for one peripheral type on a downstream bus.
///
/// The layout planner, init encoder and telemetry decoder only ever see
/// this trait; new device types plug in by implementing it and need no
/// changes anywhere else in the codec.
pub trait Peripheral: Any {
    /// Device name used in snapshots and diagnostics.
    fn name(&self) -> &'static str;

    /// 4-bit wire tag identifying the protocol variant.
    fn type_tag(&self) -> u8;

    /// 7-bit bus address the hub will talk to.
    fn address(&self) -> u8;

    /// Number of configuration bits contributed to the init frame.
    fn config_len(&self) -> usize;

    /// Append exactly `config_len` bits of setup payload.
    fn write_config(&self, w: &mut BitWriter);

    /// Number of telemetry bits this device occupies per update frame.
    /// May depend on the configuration (e.g. resolution selection).
    fn reply_len(&self) -> usize;

    /// Decode this device's telemetry slice. The reader is positioned at
    /// the device's leading disconnect bit; implementations must not read
    /// past `reply_len` bits.
    fn decode(&mut self, r: &mut BitReader<'_>) -> Result<()>;

    /// Generic snapshot of the last decoded values.
    fn reading(&self) -> DeviceReading;

    /// Typed-access escape hatch for hosts that know the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    F64(f64),
    I64(i64),
    Bool(bool),
    List(Vec<FieldValue>),
}

/// Snapshot of a peripheral after a decode: a flat field map plus the
/// per-device disconnect flag that gates whether the fields are current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReading {
    pub device: String,
    pub disconnected: bool,
    pub fields: BTreeMap<String, FieldValue>,
}
