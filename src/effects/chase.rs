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
use crate::{dmx::FixtureSink, scenes::Snapshot};

pub const MIN_CHASE_DELAY: Duration = Duration::from_millis(30);
pub const MAX_CHASE_DELAY: Duration = Duration::from_millis(10000);

/// Plays the saved scenes in order, holding each for the chase delay.
pub struct SceneChase {
    scenes: Vec<Snapshot>,
    position: usize,
    delay: Duration,
}

impl SceneChase {
    /// A chase needs at least two scenes.
    pub fn new(scenes: Vec<Snapshot>, delay: Duration) -> Option<SceneChase> {
        if scenes.len() < 2 {
            return None;
        }
        Some(SceneChase {
            scenes,
            position: 0,
            delay,
        })
    }

    /// Also shortens or stretches the hold of the scene on stage.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    #[cfg(test)]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Effect for SceneChase {
    fn name(&self) -> &'static str {
        "scene-chase"
    }

    fn interval(&self) -> Duration {
        self.delay
    }

    fn tick(&mut self, sink: &dyn FixtureSink) {
        report(sink.set_all(self.scenes[self.position].values()));
        self.position = (self.position + 1) % self.scenes.len();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dmx::{MemorySink, UNIVERSE_SIZE};

    fn snapshot(value: u8) -> Snapshot {
        Snapshot::new([value; UNIVERSE_SIZE + 1])
    }

    #[test]
    fn test_needs_two_scenes() {
        assert!(SceneChase::new(vec![], MIN_CHASE_DELAY).is_none());
        assert!(SceneChase::new(vec![snapshot(1)], MIN_CHASE_DELAY).is_none());
        assert!(SceneChase::new(vec![snapshot(1), snapshot(2)], MIN_CHASE_DELAY).is_some());
    }

    #[test]
    fn test_wraps() {
        let sink = MemorySink::new();
        let mut chase = SceneChase::new(
            vec![snapshot(1), snapshot(2), snapshot(3)],
            Duration::from_millis(100),
        )
        .expect("chase");

        let seen: Vec<u8> = (0..4)
            .map(|_| {
                chase.tick(&sink);
                sink.get_all()[1]
            })
            .collect();
        assert_eq!(seen, vec![1, 2, 3, 1]);

        chase.set_delay(MAX_CHASE_DELAY);
        assert_eq!(chase.interval(), MAX_CHASE_DELAY);
        assert_eq!(chase.delay(), MAX_CHASE_DELAY);
    }
}
