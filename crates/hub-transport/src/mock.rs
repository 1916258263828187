use std::collections::{HashMap, VecDeque};

use crate::{BusInfo, HubBus, Result, TransportError};

/// A simple in-process mock bus. Each instance is independent.
///
/// Reads are served from per-register reply queues loaded by the test or
/// demo harness; writes are recorded in issue order so callers can assert
/// on the exact bytes that would have reached the wire.
#[derive(Default)]
pub struct MockBus {
    name: String,
    replies: HashMap<u8, VecDeque<Vec<u8>>>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl MockBus {
    /// Queue a reply for a future read of `register`.
    pub fn queue_read(&mut self, register: u8, bytes: Vec<u8>) {
        self.replies.entry(register).or_default().push_back(bytes);
    }

    /// All writes issued so far, in order.
    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }
}

impl HubBus for MockBus {
    fn open(name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    fn list() -> Result<Vec<BusInfo>> {
        Ok(vec![BusInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    fn read(&mut self, register: u8, len: usize) -> Result<Vec<u8>> {
        // A real link would block; an unstocked queue reads as a timeout
        let _ = (&self.name, len);
        self.replies
            .get_mut(&register)
            .and_then(|queue| queue.pop_front())
            .ok_or(TransportError::Timeout)
    }

    fn write(&mut self, register: u8, bytes: &[u8]) -> Result<()> {
        self.writes.push((register, bytes.to_vec()));
        Ok(())
    }
}
