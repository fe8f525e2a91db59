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
use parking_lot::Mutex;
use tracing::trace;

use super::{check_write, FixtureSink, Frame, SinkError, UNIVERSE_SIZE};

/// A sink that only keeps the array in memory. Used when no lighting hardware is attached.
pub struct MemorySink {
    frame: Mutex<Frame>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink {
            frame: Mutex::new([0; UNIVERSE_SIZE + 1]),
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSink for MemorySink {
    fn set(&self, address: u16, values: &[u8]) -> Result<(), SinkError> {
        check_write(address, values)?;
        let start = usize::from(address);
        self.frame.lock()[start..start + values.len()].copy_from_slice(values);
        trace!(address, ?values, "DMX set");
        Ok(())
    }

    fn set_all(&self, frame: &Frame) -> Result<(), SinkError> {
        let mut current = self.frame.lock();
        *current = *frame;
        current[0] = 0;
        Ok(())
    }

    fn get_all(&self) -> Frame {
        *self.frame.lock()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_and_read_back() -> Result<(), SinkError> {
        let sink = MemorySink::new();
        sink.set(10, &[1, 2, 3])?;
        sink.set(512, &[99])?;

        let frame = sink.get_all();
        assert_eq!(&frame[10..13], &[1, 2, 3]);
        assert_eq!(frame[512], 99);
        assert_eq!(frame[9], 0);

        assert!(sink.set(511, &[1, 2]).is_ok());
        assert!(sink.set(512, &[1, 2]).is_err());
        Ok(())
    }

    #[test]
    fn test_set_all_and_clear() -> Result<(), SinkError> {
        let sink = MemorySink::new();
        let mut frame = [7u8; UNIVERSE_SIZE + 1];
        frame[0] = 42;
        sink.set_all(&frame)?;

        let read = sink.get_all();
        assert_eq!(read[0], 0);
        assert!(read[1..].iter().all(|value| *value == 7));

        sink.clear()?;
        assert!(sink.get_all().iter().all(|value| *value == 0));
        Ok(())
    }
}
