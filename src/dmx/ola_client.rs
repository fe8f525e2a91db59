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

use std::{error::Error, net::TcpStream};

use ola::{client::StreamingClientConfig, DmxBuffer, StreamingClient};

/// Where an [`OlaSink`](super::OlaSink) sends its buffer.
pub trait OlaClient: Send + Sync {
    fn send_dmx(&mut self, universe: u32, buffer: &DmxBuffer) -> Result<(), Box<dyn Error>>;
}

impl OlaClient for StreamingClient<TcpStream> {
    fn send_dmx(&mut self, universe: u32, buffer: &DmxBuffer) -> Result<(), Box<dyn Error>> {
        StreamingClient::send_dmx(self, universe, buffer)?;
        Ok(())
    }
}

/// Opens a streaming connection to olad on the given port. Fails if the daemon isn't running.
pub fn connect(port: u16) -> Result<Box<dyn OlaClient>, Box<dyn Error>> {
    let client = ola::connect_with_config(StreamingClientConfig {
        server_port: port,
        ..Default::default()
    })?;
    Ok(Box::new(client))
}

/// Keeps every universe and buffer it was handed.
#[cfg(test)]
pub struct RecordingClient {
    pub sent: std::sync::Arc<parking_lot::Mutex<Vec<(u32, Vec<u8>)>>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingClient {
    pub fn new() -> RecordingClient {
        RecordingClient {
            sent: Default::default(),
            fail: false,
        }
    }
}

#[cfg(test)]
impl OlaClient for RecordingClient {
    fn send_dmx(&mut self, universe: u32, buffer: &DmxBuffer) -> Result<(), Box<dyn Error>> {
        if self.fail {
            return Err("olad went away".into());
        }
        self.sent
            .lock()
            .push((universe, buffer.as_slice().to_vec()));
        Ok(())
    }
}
