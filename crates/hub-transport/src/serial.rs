use crate::{BusInfo, HubBus, Result, TransportError};
use serialport::{SerialPort, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// ASCII register-bridge protocol over serial (USB I2C-bridge dongles).
///
/// Wire format, one command per `\r`-terminated line:
/// - `W<reg:2hex><data hex...>` writes the data bytes to a register window
/// - `R<reg:2hex><len:2hex>` requests a read; the bridge answers with
///   `r` followed by `2*len` hex digits and `\r`
pub struct BridgeBus {
    _port_path: String,
    port: Box<dyn SerialPort>,
}

impl BridgeBus {
    fn encode_write(register: u8, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + bytes.len() * 2);
        out.push(b'W');
        out.extend_from_slice(format!("{register:02X}").as_bytes());
        for b in bytes {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'\r');
        out
    }

    fn encode_read(register: u8, len: usize) -> Result<Vec<u8>> {
        if len > 0xFF {
            return Err(TransportError::Unsupported("reads above 255 bytes"));
        }
        let mut out = Vec::with_capacity(6);
        out.push(b'R');
        out.extend_from_slice(format!("{register:02X}").as_bytes());
        out.extend_from_slice(format!("{len:02X}").as_bytes());
        out.push(b'\r');
        Ok(out)
    }

    fn parse_reply(line: &[u8]) -> Result<Vec<u8>> {
        if line.is_empty() {
            return Err(TransportError::MalformedReply("empty"));
        }
        if line[0] != b'r' {
            return Err(TransportError::MalformedReply("unknown header"));
        }
        let hex = &line[1..];
        if hex.len() % 2 != 0 {
            return Err(TransportError::MalformedReply("odd hex length"));
        }
        let mut out = Vec::with_capacity(hex.len() / 2);
        for pair in hex.chunks(2) {
            let text = std::str::from_utf8(pair)
                .map_err(|_| TransportError::MalformedReply("utf8"))?;
            let byte = u8::from_str_radix(text, 16)
                .map_err(|_| TransportError::MalformedReply("hex digit"))?;
            out.push(byte);
        }
        Ok(out)
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; 128];
        let mut acc: Vec<u8> = Vec::with_capacity(256);
        loop {
            match self.port.read(&mut buf) {
                Ok(n) if n > 0 => {
                    acc.extend_from_slice(&buf[..n]);
                    if let Some(pos) = acc.iter().position(|&b| b == b'\r') {
                        let line = acc.drain(..=pos).collect::<Vec<u8>>();
                        // Drop terminator
                        return Ok(line[..line.len().saturating_sub(1)].to_vec());
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    let msg = e.to_string();
                    if msg.contains("Operation timed out") || msg.contains("timed out") {
                        return Err(TransportError::Timeout);
                    }
                    return Err(TransportError::Io(msg));
                }
            }
        }
    }
}

impl HubBus for BridgeBus {
    fn open(path: &str) -> Result<Self>
    where
        Self: Sized,
    {
        let port = serialport::new(path, 115_200)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        debug!(path, "opened register bridge");
        Ok(BridgeBus {
            _port_path: path.to_string(),
            port,
        })
    }

    fn list() -> Result<Vec<BusInfo>> {
        let mut out = Vec::new();
        for p in serialport::available_ports().map_err(|e| TransportError::Io(e.to_string()))? {
            match p.port_type {
                SerialPortType::UsbPort(_u) => {
                    out.push(BusInfo {
                        name: p.port_name,
                        driver: "bridge-serial".to_string(),
                    });
                }
                _ => {
                    // Still include other serial ports; user can pick
                    out.push(BusInfo {
                        name: p.port_name,
                        driver: "serial".to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    fn read(&mut self, register: u8, len: usize) -> Result<Vec<u8>> {
        let cmd = Self::encode_read(register, len)?;
        self.port
            .write_all(&cmd)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let line = self.read_line()?;
        Self::parse_reply(&line)
    }

    fn write(&mut self, register: u8, bytes: &[u8]) -> Result<()> {
        let cmd = Self::encode_write(register, bytes);
        self.port
            .write_all(&cmd)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_write_line() {
        let line = BridgeBus::encode_write(0x02, &[0xDE, 0xAD]);
        assert_eq!(line, b"W02DEAD\r".to_vec());
    }

    #[test]
    fn test_encode_read_line() {
        let line = BridgeBus::encode_read(0x03, 100).unwrap();
        assert_eq!(line, b"R0364\r".to_vec());
        assert!(BridgeBus::encode_read(0x03, 300).is_err());
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            BridgeBus::parse_reply(b"r61010101").unwrap(),
            vec![0x61, 0x01, 0x01, 0x01]
        );
        assert!(BridgeBus::parse_reply(b"").is_err());
        assert!(BridgeBus::parse_reply(b"x00").is_err());
        assert!(BridgeBus::parse_reply(b"r0").is_err());
        assert!(BridgeBus::parse_reply(b"rZZ").is_err());
    }
}
