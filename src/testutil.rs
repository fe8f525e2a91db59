// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::thread;

use parking_lot::Mutex;

use crate::{
    dmx::{FixtureSink, Frame, MemorySink, SinkError},
    fixture::Fixture,
};

mod polling;

pub use polling::eventually;

/// A single write seen by a recording sink.
#[derive(Debug, Clone)]
pub struct Write {
    /// Name of the thread that made the write.
    pub owner: String,
    /// Address of the first channel, or 0 for whole-array writes.
    pub address: u16,
    pub values: Vec<u8>,
}

/// A memory sink that records who wrote what.
#[derive(Default)]
pub struct RecordingSink {
    inner: MemorySink,
    writes: Mutex<Vec<Write>>,
}

impl RecordingSink {
    pub fn new() -> RecordingSink {
        Self::default()
    }

    fn record(&self, address: u16, values: &[u8]) {
        let owner = thread::current().name().unwrap_or("unnamed").to_string();
        self.writes.lock().push(Write {
            owner,
            address,
            values: values.to_vec(),
        });
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Writes to the given channel, in order.
    pub fn writes_to(&self, address: u16) -> Vec<Write> {
        self.writes
            .lock()
            .iter()
            .filter(|write| write.address == address)
            .cloned()
            .collect()
    }
}

impl FixtureSink for RecordingSink {
    fn set(&self, address: u16, values: &[u8]) -> Result<(), SinkError> {
        self.record(address, values);
        self.inner.set(address, values)
    }

    fn set_all(&self, frame: &Frame) -> Result<(), SinkError> {
        self.record(0, &frame[..]);
        self.inner.set_all(frame)
    }

    fn get_all(&self) -> Frame {
        self.inner.get_all()
    }
}

/// Builds a fixture from a list of channel names.
pub fn fixture(name: &str, address: u16, channels: &[&str]) -> Fixture {
    Fixture::new(
        name,
        address,
        channels.iter().map(|channel| channel.to_string()).collect(),
    )
    .expect("valid fixture")
}
