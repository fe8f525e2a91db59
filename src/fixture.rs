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
use std::{collections::HashSet, fmt};

use thiserror::Error;

use crate::{
    color::{self, Color},
    dmx::{FixtureSink, Frame, SinkError, MAX_WRITE, UNIVERSE_SIZE},
};

pub const DIMMER: &str = "dimmer";
pub const RED: &str = "red";
pub const GREEN: &str = "green";
pub const BLUE: &str = "blue";
pub const WHITE: &str = "white";

/// Channels that carry color. The first one a fixture has is its default color channel.
pub const COLOR_CHANNELS: [&str; 5] = ["red", "green", "blue", "amber", "white"];

/// Channel layouts of the fixture types the console ships with.
pub fn template(name: &str) -> Option<&'static [&'static str]> {
    match name.to_lowercase().as_str() {
        "exa" => Some(&[
            "dimmer",
            "red",
            "green",
            "blue",
            "amber",
            "white",
            "uv",
            "strobe",
            "auto",
            "auto_speed",
            "color_wheel",
            "unknown",
        ]),
        "zoom" => Some(&[
            "dimmer", "red", "green", "blue", "amber", "white", "strobe", "zoom", "preset",
            "unknown1", "unknown2",
        ]),
        "snakeye" => Some(&[
            "pan",
            "tilt",
            "infinite_tilt",
            "pan_tilt_speed",
            "red",
            "green",
            "blue",
            "white",
            "strobe",
            "dimmer",
            "led_program",
            "program_speed",
            "color_macros",
            "auto_program",
        ]),
        _ => None,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixtureError {
    #[error("fixture name may not be empty")]
    EmptyName,

    #[error("fixture {name} must have between 1 and {UNIVERSE_SIZE} channels, has {count}")]
    ChannelCount { name: String, count: usize },

    #[error("fixture {name} has address {address}, must be within [1, {UNIVERSE_SIZE}]")]
    Address { name: String, address: u16 },

    #[error("fixture {name} at {address} with {count} channels runs past the end of the universe")]
    OutOfUniverse {
        name: String,
        address: u16,
        count: usize,
    },

    #[error("fixture {name} has an empty channel name")]
    EmptyChannel { name: String },

    #[error("fixture {name} has duplicate channel {channel}")]
    DuplicateChannel { name: String, channel: String },

    #[error("fixture {name} at {address} overlaps the channels of fixture {other}")]
    Overlap {
        name: String,
        address: u16,
        other: String,
    },
}

/// A light occupying a contiguous run of channels. Fixtures hold no DMX values of their own;
/// everything is read from and written to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    name: String,
    address: u16,
    channels: Vec<String>,
    default_color: Option<usize>,
}

impl Fixture {
    pub fn new(name: &str, address: u16, channels: Vec<String>) -> Result<Fixture, FixtureError> {
        if name.is_empty() {
            return Err(FixtureError::EmptyName);
        }
        if channels.is_empty() || channels.len() > UNIVERSE_SIZE {
            return Err(FixtureError::ChannelCount {
                name: name.to_string(),
                count: channels.len(),
            });
        }
        if address < 1 || usize::from(address) > UNIVERSE_SIZE {
            return Err(FixtureError::Address {
                name: name.to_string(),
                address,
            });
        }
        if usize::from(address) + channels.len() > UNIVERSE_SIZE + 1 {
            return Err(FixtureError::OutOfUniverse {
                name: name.to_string(),
                address,
                count: channels.len(),
            });
        }

        let mut seen = HashSet::new();
        for channel in channels.iter() {
            if channel.is_empty() {
                return Err(FixtureError::EmptyChannel {
                    name: name.to_string(),
                });
            }
            if !seen.insert(channel.as_str()) {
                return Err(FixtureError::DuplicateChannel {
                    name: name.to_string(),
                    channel: channel.clone(),
                });
            }
        }

        let default_color = COLOR_CHANNELS
            .iter()
            .find_map(|color| channels.iter().position(|channel| channel == color));

        Ok(Fixture {
            name: name.to_string(),
            address,
            channels,
            default_color,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// The offset of the named channel, if the fixture has it.
    pub fn offset(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|name| name == channel)
    }

    /// The channel forced on when a colorless fixture is highlighted.
    pub fn default_color_offset(&self) -> Option<usize> {
        self.default_color
    }

    fn channel_address(&self, offset: usize) -> u16 {
        self.address + offset as u16
    }

    /// This fixture's slice of the array.
    pub fn values(&self, frame: &Frame) -> Vec<u8> {
        let start = usize::from(self.address);
        frame[start..start + self.channels.len()].to_vec()
    }

    /// Returns true if any color channel is nonzero in the array.
    pub fn has_color(&self, frame: &Frame) -> bool {
        COLOR_CHANNELS
            .iter()
            .filter_map(|color| self.offset(color))
            .any(|offset| frame[usize::from(self.channel_address(offset))] != 0)
    }

    /// Writes every channel of the fixture, in chunks the sink accepts.
    pub fn set_values(&self, sink: &dyn FixtureSink, values: &[u8]) -> Result<(), SinkError> {
        let values = &values[..values.len().min(self.channels.len())];
        for (i, chunk) in values.chunks(MAX_WRITE).enumerate() {
            sink.set(self.channel_address(i * MAX_WRITE), chunk)?;
        }
        Ok(())
    }

    /// Writes a single channel by offset. Offsets past the fixture are ignored.
    pub fn set_channel(
        &self,
        sink: &dyn FixtureSink,
        offset: usize,
        value: u8,
    ) -> Result<(), SinkError> {
        if offset >= self.channels.len() {
            return Ok(());
        }
        sink.set(self.channel_address(offset), &[value])
    }

    /// Fixtures without a dimmer channel are left alone.
    pub fn set_dimmer(&self, sink: &dyn FixtureSink, value: u8) -> Result<(), SinkError> {
        match self.offset(DIMMER) {
            Some(offset) => self.set_channel(sink, offset, value),
            None => Ok(()),
        }
    }

    /// Writes red, green and blue. Fixtures without all three are left alone.
    pub fn set_color(&self, sink: &dyn FixtureSink, color: Color) -> Result<(), SinkError> {
        let (red, green, blue) = match (self.offset(RED), self.offset(GREEN), self.offset(BLUE)) {
            (Some(red), Some(green), Some(blue)) => (red, green, blue),
            _ => return Ok(()),
        };

        if green == red + 1 && blue == red + 2 {
            return sink.set(self.channel_address(red), &[color.r, color.g, color.b]);
        }
        self.set_channel(sink, red, color.r)?;
        self.set_channel(sink, green, color.g)?;
        self.set_channel(sink, blue, color.b)
    }

    /// Drives the white channel, or all of red, green and blue when there isn't one.
    pub fn set_white(&self, sink: &dyn FixtureSink, intensity: u8) -> Result<(), SinkError> {
        match self.offset(WHITE) {
            Some(offset) => self.set_channel(sink, offset, intensity),
            None => self.set_color(sink, color::WHITE),
        }
    }

    pub fn clear(&self, sink: &dyn FixtureSink) -> Result<(), SinkError> {
        self.set_values(sink, &vec![0; self.channels.len()])
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({} channels)",
            self.name,
            self.address,
            self.channels.len()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dmx::MemorySink;

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            Fixture::new("", 1, channels(&["dimmer"])),
            Err(FixtureError::EmptyName)
        );
        assert!(matches!(
            Fixture::new("par", 1, vec![]),
            Err(FixtureError::ChannelCount { count: 0, .. })
        ));
        assert!(matches!(
            Fixture::new("par", 0, channels(&["dimmer"])),
            Err(FixtureError::Address { address: 0, .. })
        ));
        assert!(matches!(
            Fixture::new("par", 511, channels(&["dimmer", "red", "green"])),
            Err(FixtureError::OutOfUniverse { .. })
        ));
        assert!(matches!(
            Fixture::new("par", 1, channels(&["dimmer", ""])),
            Err(FixtureError::EmptyChannel { .. })
        ));
        assert!(matches!(
            Fixture::new("par", 1, channels(&["red", "red"])),
            Err(FixtureError::DuplicateChannel { .. })
        ));
        assert!(Fixture::new("par", 512, channels(&["dimmer"])).is_ok());
    }

    #[test]
    fn test_default_color() -> Result<(), FixtureError> {
        let fixture = Fixture::new("par", 1, channels(&["dimmer", "white", "blue"]))?;
        assert_eq!(fixture.default_color_offset(), Some(2));

        let fixture = Fixture::new("dim", 1, channels(&["dimmer"]))?;
        assert_eq!(fixture.default_color_offset(), None);

        let snakeye = template("snakeye").expect("template");
        let fixture = Fixture::new(
            "snakeye",
            1,
            snakeye.iter().map(|name| name.to_string()).collect(),
        )?;
        assert_eq!(fixture.default_color_offset(), Some(4));
        assert_eq!(fixture.channel_count(), 14);
        Ok(())
    }

    #[test]
    fn test_writes() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let fixture = Fixture::new(
            "par",
            10,
            channels(&["dimmer", "red", "green", "blue", "amber", "white"]),
        )?;

        fixture.set_dimmer(&sink, 200)?;
        fixture.set_color(&sink, Color::new(1, 2, 3))?;
        assert_eq!(fixture.values(&sink.get_all()), vec![200, 1, 2, 3, 0, 0]);
        assert!(fixture.has_color(&sink.get_all()));

        fixture.set_white(&sink, 255)?;
        assert_eq!(sink.get_all()[15], 255);

        fixture.set_values(&sink, &[9, 8, 7, 6, 5, 4])?;
        assert_eq!(fixture.values(&sink.get_all()), vec![9, 8, 7, 6, 5, 4]);

        fixture.clear(&sink)?;
        assert_eq!(fixture.values(&sink.get_all()), vec![0; 6]);
        assert!(!fixture.has_color(&sink.get_all()));
        Ok(())
    }

    #[test]
    fn test_scattered_color_channels() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let fixture = Fixture::new("wash", 1, channels(&["blue", "dimmer", "green", "red"]))?;
        fixture.set_color(&sink, Color::new(10, 20, 30))?;
        assert_eq!(fixture.values(&sink.get_all()), vec![30, 0, 20, 10]);

        // No dimmer, no rgb: nothing is written.
        let fixture = Fixture::new("fog", 100, channels(&["output"]))?;
        fixture.set_dimmer(&sink, 255)?;
        fixture.set_white(&sink, 255)?;
        assert_eq!(sink.get_all()[100], 0);
        Ok(())
    }
}
