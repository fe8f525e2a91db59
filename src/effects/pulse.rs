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
use crate::{
    dmx::{FixtureSink, Frame},
    fixture::Fixture,
};

/// Pulses the working set in white so the operator knows raw channel editing is next.
pub struct RawDmxPulse {
    fixtures: Vec<Fixture>,
    saved: Vec<Vec<u8>>,
    wave: Triangle,
}

impl RawDmxPulse {
    /// Remembers the fixtures' values in the given array so they can be put back on stop.
    pub fn new(fixtures: Vec<Fixture>, frame: &Frame) -> RawDmxPulse {
        let saved = fixtures
            .iter()
            .map(|fixture| fixture.values(frame))
            .collect();
        RawDmxPulse {
            fixtures,
            saved,
            wave: Triangle::new(),
        }
    }
}

impl Effect for RawDmxPulse {
    fn name(&self) -> &'static str {
        "raw-dmx-pulse"
    }

    fn interval(&self) -> Duration {
        PULSE_TICK
    }

    fn tick(&mut self, sink: &dyn FixtureSink) {
        let value = self.wave.advance();
        for fixture in self.fixtures.iter() {
            report(fixture.set_white(sink, u8::MAX));
            report(fixture.set_dimmer(sink, value));
        }
    }

    fn restore(&mut self, sink: &dyn FixtureSink) {
        for (fixture, saved) in self.fixtures.iter().zip(self.saved.iter()) {
            report(fixture.set_values(sink, saved));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dmx::MemorySink;

    #[test]
    fn test_pulse_and_restore() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let par = Fixture::new(
            "par",
            20,
            vec!["dimmer".into(), "white".into(), "strobe".into()],
        )?;
        par.set_values(&sink, &[40, 0, 7])?;

        let mut pulse = RawDmxPulse::new(vec![par.clone()], &sink.get_all());
        pulse.tick(&sink);
        pulse.tick(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![245, 255, 7]);

        pulse.restore(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![40, 0, 7]);
        Ok(())
    }
}
