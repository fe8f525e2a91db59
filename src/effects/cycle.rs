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

use super::{report, Effect};
use crate::{
    color::{self, Color},
    dmx::FixtureSink,
    fixture::Fixture,
};

pub const PRESET_TICK: Duration = Duration::from_millis(400);
pub const RAINBOW_TICK: Duration = Duration::from_millis(25);

/// Steps the working set through a fixed sequence of colors at full dimmer.
pub struct ColorCycle {
    name: &'static str,
    fixtures: Vec<Fixture>,
    colors: Vec<Color>,
    interval: Duration,
    position: usize,
}

impl ColorCycle {
    /// Previews the preset palette.
    pub fn presets(fixtures: Vec<Fixture>) -> ColorCycle {
        ColorCycle {
            name: "preset-cycle",
            fixtures,
            colors: color::PRESETS.to_vec(),
            interval: PRESET_TICK,
            position: 0,
        }
    }

    /// Previews the color wheel with a hue sweep.
    pub fn rainbow(fixtures: Vec<Fixture>) -> ColorCycle {
        ColorCycle {
            name: "rainbow-cycle",
            fixtures,
            colors: color::rainbow(),
            interval: RAINBOW_TICK,
            position: 0,
        }
    }
}

impl Effect for ColorCycle {
    fn name(&self) -> &'static str {
        self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn tick(&mut self, sink: &dyn FixtureSink) {
        let color = self.colors[self.position];
        for fixture in self.fixtures.iter() {
            report(fixture.set_color(sink, color));
            report(fixture.set_dimmer(sink, u8::MAX));
        }
        self.position = (self.position + 1) % self.colors.len();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dmx::MemorySink;

    #[test]
    fn test_presets_wrap() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let par = Fixture::new(
            "par",
            1,
            vec!["dimmer".into(), "red".into(), "green".into(), "blue".into()],
        )?;
        let mut cycle = ColorCycle::presets(vec![par.clone()]);
        assert_eq!(cycle.interval(), PRESET_TICK);

        cycle.tick(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![255, 255, 255, 255]);
        cycle.tick(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![255, 255, 0, 0]);

        for _ in 2..color::PRESETS.len() {
            cycle.tick(&sink);
        }
        assert_eq!(par.values(&sink.get_all()), vec![255, 0, 0, 0]);

        // Back to white.
        cycle.tick(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![255, 255, 255, 255]);
        Ok(())
    }

    #[test]
    fn test_rainbow() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let par = Fixture::new("par", 5, vec!["red".into(), "green".into(), "blue".into()])?;
        let mut cycle = ColorCycle::rainbow(vec![par.clone()]);
        assert_eq!(cycle.name(), "rainbow-cycle");

        cycle.tick(&sink);
        assert_eq!(par.values(&sink.get_all()), vec![0, 255, 0]);
        Ok(())
    }
}
