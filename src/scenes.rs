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
use crate::dmx::{Frame, UNIVERSE_SIZE};

mod file;

pub use file::FileScenes;

/// A captured DMX array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    values: Frame,
}

impl Snapshot {
    pub fn new(values: Frame) -> Snapshot {
        Snapshot { values }
    }

    pub fn values(&self) -> &Frame {
        &self.values
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::new([0; UNIVERSE_SIZE + 1])
    }
}

/// Saved scenes plus the live, unsaved scene. The store keeps a position that is either one of
/// the saved scenes or the unsaved sentinel.
pub trait SceneStore: Send {
    /// The unsaved scene. Returning to it is how the console reverts the lights.
    fn current(&self) -> Snapshot;

    /// Moves forward. Past the last saved scene the position wraps to the sentinel.
    fn next(&mut self) -> Snapshot;

    /// Moves backward. Before the first saved scene the position wraps to the sentinel.
    fn previous(&mut self) -> Snapshot;

    fn append(&mut self, snapshot: Snapshot);

    /// Deletes the saved scene at the position and returns to the sentinel. Does nothing at the
    /// sentinel.
    fn delete_current(&mut self) -> bool;

    fn count(&self) -> usize;

    /// Replaces the unsaved scene and moves to the sentinel.
    fn set_current(&mut self, values: Frame);

    /// The saved scene at the position, or None at the sentinel.
    fn current_index(&self) -> Option<usize>;

    /// All saved scenes in order.
    fn snapshots(&self) -> Vec<Snapshot>;
}

/// A scene store that forgets everything on exit.
#[derive(Default)]
pub struct MemoryScenes {
    scenes: Vec<Snapshot>,
    unsaved: Snapshot,
    index: Option<usize>,
}

impl MemoryScenes {
    pub fn new() -> MemoryScenes {
        Self::default()
    }

    pub fn with_scenes(scenes: Vec<Snapshot>) -> MemoryScenes {
        MemoryScenes {
            scenes,
            ..Default::default()
        }
    }

    fn at_index(&self) -> Snapshot {
        self.index
            .and_then(|index| self.scenes.get(index).copied())
            .unwrap_or(self.unsaved)
    }
}

impl SceneStore for MemoryScenes {
    fn current(&self) -> Snapshot {
        self.unsaved
    }

    fn next(&mut self) -> Snapshot {
        self.index = match self.index {
            None if !self.scenes.is_empty() => Some(0),
            Some(index) if index + 1 < self.scenes.len() => Some(index + 1),
            _ => None,
        };
        self.at_index()
    }

    fn previous(&mut self) -> Snapshot {
        self.index = match self.index {
            None if !self.scenes.is_empty() => Some(self.scenes.len() - 1),
            Some(index) if index > 0 => Some(index - 1),
            _ => None,
        };
        self.at_index()
    }

    fn append(&mut self, snapshot: Snapshot) {
        self.scenes.push(snapshot);
    }

    fn delete_current(&mut self) -> bool {
        match self.index.take() {
            Some(index) if index < self.scenes.len() => {
                self.scenes.remove(index);
                true
            }
            _ => false,
        }
    }

    fn count(&self) -> usize {
        self.scenes.len()
    }

    fn set_current(&mut self, values: Frame) {
        self.index = None;
        self.unsaved = Snapshot::new(values);
    }

    fn current_index(&self) -> Option<usize> {
        self.index
    }

    fn snapshots(&self) -> Vec<Snapshot> {
        self.scenes.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn snapshot(value: u8) -> Snapshot {
        let mut values = [0; UNIVERSE_SIZE + 1];
        values[1] = value;
        Snapshot::new(values)
    }

    #[test]
    fn test_empty_store_stays_on_sentinel() {
        let mut scenes = MemoryScenes::new();
        scenes.set_current(*snapshot(5).values());

        assert_eq!(scenes.next(), snapshot(5));
        assert_eq!(scenes.previous(), snapshot(5));
        assert_eq!(scenes.current_index(), None);
        assert!(!scenes.delete_current());
    }

    #[test]
    fn test_navigation_wraps_through_sentinel() {
        let mut scenes = MemoryScenes::with_scenes(vec![snapshot(1), snapshot(2)]);
        scenes.set_current(*snapshot(9).values());

        assert_eq!(scenes.next(), snapshot(1));
        assert_eq!(scenes.next(), snapshot(2));
        assert_eq!(scenes.next(), snapshot(9));
        assert_eq!(scenes.current_index(), None);

        assert_eq!(scenes.previous(), snapshot(2));
        assert_eq!(scenes.previous(), snapshot(1));
        assert_eq!(scenes.previous(), snapshot(9));

        // The unsaved scene is what current() returns regardless of position.
        scenes.next();
        assert_eq!(scenes.current(), snapshot(9));
    }

    #[test]
    fn test_append_and_delete() {
        let mut scenes = MemoryScenes::new();
        scenes.append(snapshot(1));
        scenes.append(snapshot(2));
        scenes.append(snapshot(3));
        assert_eq!(scenes.count(), 3);

        scenes.next();
        scenes.next();
        assert_eq!(scenes.current_index(), Some(1));
        assert!(scenes.delete_current());
        assert_eq!(scenes.current_index(), None);
        assert_eq!(scenes.snapshots(), vec![snapshot(1), snapshot(3)]);

        // Set current returns to the sentinel.
        scenes.next();
        scenes.set_current(*snapshot(4).values());
        assert_eq!(scenes.current_index(), None);
        assert_eq!(scenes.current(), snapshot(4));
    }
}
