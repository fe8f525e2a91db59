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
use std::time::Duration;

use super::{report, Effect, Triangle, PULSE_TICK};
use crate::{dmx::FixtureSink, fixture::Fixture};

/// A fixture under the cursor together with what it looked like before it was highlighted.
struct Highlighted {
    index: usize,
    fixture: Fixture,
    saved: Vec<u8>,
}

/// Pulses the dimmer of every fixture the operator is pointing at or has selected.
pub struct Highlight {
    lights: Vec<Highlighted>,
    wave: Triangle,
    resync: bool,
}

impl Highlight {
    pub fn new() -> Highlight {
        Highlight {
            lights: Vec::new(),
            wave: Triangle::new(),
            resync: false,
        }
    }

    /// Starts highlighting a fixture, remembering its current values. Returns false if it was
    /// already highlighted.
    pub fn add_light(&mut self, index: usize, fixture: &Fixture, sink: &dyn FixtureSink) -> bool {
        if self.contains(index) {
            return false;
        }
        self.lights.push(Highlighted {
            index,
            fixture: fixture.clone(),
            saved: fixture.values(&sink.get_all()),
        });
        self.resync = true;
        true
    }

    /// Stops highlighting a fixture and puts its values back.
    pub fn remove_light(&mut self, index: usize, sink: &dyn FixtureSink) -> bool {
        match self.lights.iter().position(|light| light.index == index) {
            Some(position) => {
                let light = self.lights.remove(position);
                report(light.fixture.set_values(sink, &light.saved));
                true
            }
            None => false,
        }
    }

    /// On the next tick, light the default color channel of any highlighted fixture that shows
    /// no color at all.
    pub fn resync_default_color(&mut self) {
        self.resync = true;
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lights.iter().any(|light| light.index == index)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.lights.iter().map(|light| light.index).collect()
    }
}

impl Default for Highlight {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Highlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn interval(&self) -> Duration {
        PULSE_TICK
    }

    fn tick(&mut self, sink: &dyn FixtureSink) {
        if self.resync {
            let frame = sink.get_all();
            for light in self.lights.iter() {
                if light.fixture.has_color(&frame) {
                    continue;
                }
                if let Some(offset) = light.fixture.default_color_offset() {
                    report(light.fixture.set_channel(sink, offset, u8::MAX));
                }
            }
            self.resync = false;
        }

        let value = self.wave.advance();
        for light in self.lights.iter() {
            report(light.fixture.set_dimmer(sink, value));
        }
    }

    fn restore(&mut self, sink: &dyn FixtureSink) {
        for light in self.lights.drain(..) {
            report(light.fixture.set_values(sink, &light.saved));
        }
    }
}
