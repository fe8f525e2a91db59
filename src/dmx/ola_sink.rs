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
use ola::DmxBuffer;
use parking_lot::Mutex;
use tracing::debug;

use super::{check_write, ola_client::OlaClient, FixtureSink, Frame, SinkError, UNIVERSE_SIZE};

struct OlaState {
    frame: Frame,
    client: Box<dyn OlaClient>,
}

/// Sends the array to an OLA universe. A shadow copy is kept so reads never touch the daemon, and
/// every write sends the full universe.
pub struct OlaSink {
    universe: u32,
    state: Mutex<OlaState>,
}

impl OlaSink {
    pub fn new(universe: u32, client: Box<dyn OlaClient>) -> OlaSink {
        debug!(universe, "Sending DMX through OLA");
        OlaSink {
            universe,
            state: Mutex::new(OlaState {
                frame: [0; UNIVERSE_SIZE + 1],
                client,
            }),
        }
    }

    fn flush(&self, state: &mut OlaState) -> Result<(), SinkError> {
        let mut buffer = DmxBuffer::new();
        for (channel, value) in state.frame[1..].iter().enumerate() {
            buffer.set_channel(channel, *value);
        }
        state
            .client
            .send_dmx(self.universe, &buffer)
            .map_err(|e| SinkError::Output(e.to_string()))
    }
}

impl FixtureSink for OlaSink {
    fn set(&self, address: u16, values: &[u8]) -> Result<(), SinkError> {
        check_write(address, values)?;
        let mut state = self.state.lock();
        let start = usize::from(address);
        state.frame[start..start + values.len()].copy_from_slice(values);
        self.flush(&mut state)
    }

    fn set_all(&self, frame: &Frame) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.frame = *frame;
        state.frame[0] = 0;
        self.flush(&mut state)
    }

    fn get_all(&self) -> Frame {
        self.state.lock().frame
    }
}
