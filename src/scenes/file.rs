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
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info};

use super::{MemoryScenes, SceneStore, Snapshot};
use crate::dmx::{Frame, UNIVERSE_SIZE};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unable to access scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse scene file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("scene {index} in {path} has {len} values, expected {expected}")]
    Length {
        path: PathBuf,
        index: usize,
        len: usize,
        expected: usize,
    },
}

/// A scene store that rewrites a JSON file after every change to the saved scenes.
pub struct FileScenes {
    path: PathBuf,
    scenes: MemoryScenes,
}

impl FileScenes {
    /// Loads the saved scenes. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<FileScenes, SceneError> {
        let scenes = match fs::read_to_string(path) {
            Ok(contents) => parse(path, &contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(SceneError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        info!(path = ?path, scenes = scenes.len(), "Loaded scenes");

        Ok(FileScenes {
            path: path.to_path_buf(),
            scenes: MemoryScenes::with_scenes(scenes),
        })
    }

    fn save(&self) -> Result<(), SceneError> {
        let rows: Vec<Vec<u8>> = self
            .scenes
            .snapshots()
            .iter()
            .map(|snapshot| snapshot.values().to_vec())
            .collect();
        let contents = serde_json::to_string(&rows).map_err(|source| SceneError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, contents).map_err(|source| SceneError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn save_or_log(&self) {
        if let Err(e) = self.save() {
            error!(err = e.to_string(), "Error saving scenes");
        }
    }
}

fn parse(path: &Path, contents: &str) -> Result<Vec<Snapshot>, SceneError> {
    let rows: Vec<Vec<u8>> = serde_json::from_str(contents).map_err(|source| SceneError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let values = Frame::try_from(row.as_slice()).map_err(|_| SceneError::Length {
                path: path.to_path_buf(),
                index,
                len: row.len(),
                expected: UNIVERSE_SIZE + 1,
            })?;
            Ok(Snapshot::new(values))
        })
        .collect()
}

impl SceneStore for FileScenes {
    fn current(&self) -> Snapshot {
        self.scenes.current()
    }

    fn next(&mut self) -> Snapshot {
        self.scenes.next()
    }

    fn previous(&mut self) -> Snapshot {
        self.scenes.previous()
    }

    fn append(&mut self, snapshot: Snapshot) {
        self.scenes.append(snapshot);
        self.save_or_log();
    }

    fn delete_current(&mut self) -> bool {
        let deleted = self.scenes.delete_current();
        if deleted {
            self.save_or_log();
        }
        deleted
    }

    fn count(&self) -> usize {
        self.scenes.count()
    }

    fn set_current(&mut self, values: Frame) {
        self.scenes.set_current(values)
    }

    fn current_index(&self) -> Option<usize> {
        self.scenes.current_index()
    }

    fn snapshots(&self) -> Vec<Snapshot> {
        self.scenes.snapshots()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let scenes = FileScenes::load(&dir.path().join("scenes.json"))?;
        assert_eq!(scenes.count(), 0);
        Ok(())
    }

    #[test]
    fn test_persists_changes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scenes.json");

        let mut values = [0; UNIVERSE_SIZE + 1];
        {
            let mut scenes = FileScenes::load(&path)?;
            values[1] = 10;
            scenes.append(Snapshot::new(values));
            values[1] = 20;
            scenes.append(Snapshot::new(values));
            values[1] = 30;
            scenes.append(Snapshot::new(values));

            scenes.next();
            assert!(scenes.delete_current());
        }

        let scenes = FileScenes::load(&path)?;
        let firsts: Vec<u8> = scenes
            .snapshots()
            .iter()
            .map(|snapshot| snapshot.values()[1])
            .collect();
        assert_eq!(firsts, vec![20, 30]);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scenes.json");

        fs::write(&path, "not json")?;
        assert!(matches!(
            FileScenes::load(&path),
            Err(SceneError::Parse { .. })
        ));

        fs::write(&path, "[[1, 2, 3]]")?;
        assert!(matches!(
            FileScenes::load(&path),
            Err(SceneError::Length { len: 3, .. })
        ));
        Ok(())
    }
}
