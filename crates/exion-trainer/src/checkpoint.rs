//! Checkpoint files written by the orchestrator.
//!
//! Each checkpointed artifact lands in its own JSON file named
//! `<kind>_<counter>.json`, where the counter is either the game count or
//! the weight-update count depending on configuration. Per-player kinds
//! carry the player in the kind itself (`features_p0`, `policy_p1`, ...).

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Which training counter names checkpoint files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointCounter {
    Games,
    WeightUpdates,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointError {
    #[display("failed to write checkpoint file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to encode checkpoint file {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Writes checkpoint artifacts into one run directory.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    dir: PathBuf,
}

impl CheckpointWriter {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serializes `value` to `<kind>_<counter>.json` in the run directory,
    /// creating the directory on first use. Returns the written path.
    pub fn write_json<T>(&self, kind: &str, counter: u64, value: &T) -> Result<PathBuf, CheckpointError>
    where
        T: Serialize,
    {
        let path = self.dir.join(format!("{kind}_{counter:06}.json"));
        fs::create_dir_all(&self.dir).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        let file = File::create(&path).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| {
            CheckpointError::Encode {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_json_names_files_by_kind_and_counter() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CheckpointWriter::new(dir.path().join("run"));
        let path = writer.write_json("features_p0", 42, &vec![1, 2, 3]).unwrap();
        assert_eq!(path.file_name().unwrap(), "features_p0_000042.json");
        let contents = fs::read_to_string(&path).unwrap();
        let restored: Vec<i32> = serde_json::from_str(&contents).unwrap();
        assert_eq!(restored, vec![1, 2, 3]);
    }
}
