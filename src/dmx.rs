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
use std::{error::Error, sync::Arc};

use thiserror::Error;

use crate::config;

mod memory;
mod ola_client;
mod ola_sink;

pub use memory::MemorySink;
pub use ola_sink::OlaSink;

/// A DMX universe is 512 channels.
pub const UNIVERSE_SIZE: usize = 512;

/// The most values a single write may carry.
pub const MAX_WRITE: usize = 4;

/// A full DMX array. Index 0 is unused so channel addresses index it directly.
pub type Frame = [u8; UNIVERSE_SIZE + 1];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("address {address} with {len} values falls outside the universe")]
    Address { address: u16, len: usize },

    #[error("a single write carries at most {MAX_WRITE} values, got {0}")]
    TooWide(usize),

    #[error("DMX output failed: {0}")]
    Output(String),
}

/// The hardware side of the console. Everything that changes what the lights show goes through
/// one of these.
pub trait FixtureSink: Send + Sync {
    /// Writes up to four consecutive channel values starting at the 1-indexed address.
    fn set(&self, address: u16, values: &[u8]) -> Result<(), SinkError>;

    /// Replaces the whole array.
    fn set_all(&self, frame: &Frame) -> Result<(), SinkError>;

    /// Reads back the whole array.
    fn get_all(&self) -> Frame;

    /// Sets every channel to zero.
    fn clear(&self) -> Result<(), SinkError> {
        self.set_all(&[0; UNIVERSE_SIZE + 1])
    }
}

/// Checks a write against the universe bounds.
pub fn check_write(address: u16, values: &[u8]) -> Result<(), SinkError> {
    if values.len() > MAX_WRITE {
        return Err(SinkError::TooWide(values.len()));
    }
    let address_ok = address >= 1 && usize::from(address) + values.len() <= UNIVERSE_SIZE + 1;
    if !address_ok {
        return Err(SinkError::Address {
            address,
            len: values.len(),
        });
    }
    Ok(())
}

/// Creates the sink described by the output configuration.
pub fn create_sink(output: &config::Output) -> Result<Arc<dyn FixtureSink>, Box<dyn Error>> {
    let sink: Arc<dyn FixtureSink> = match output {
        config::Output::Dummy => Arc::new(MemorySink::new()),
        config::Output::Ola(ola) => {
            let client = ola_client::connect(ola.port())?;
            Arc::new(OlaSink::new(ola.universe(), client))
        }
    };

    // Start dark so the output matches the shadow frame.
    sink.clear()?;
    Ok(sink)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_check_write() {
        assert!(check_write(1, &[1, 2, 3, 4]).is_ok());
        assert!(check_write(512, &[1]).is_ok());
        assert!(check_write(509, &[1, 2, 3, 4]).is_ok());
        assert!(matches!(
            check_write(0, &[1]),
            Err(SinkError::Address { address: 0, .. })
        ));
        assert!(matches!(
            check_write(510, &[1, 2, 3, 4]),
            Err(SinkError::Address { address: 510, .. })
        ));
        assert!(matches!(check_write(1, &[0; 5]), Err(SinkError::TooWide(5))));
    }

    #[test]
    fn test_dummy_sink_starts_dark() -> Result<(), Box<dyn Error>> {
        let sink = create_sink(&config::Output::Dummy)?;
        assert!(sink.get_all().iter().all(|value| *value == 0));
        Ok(())
    }
}
