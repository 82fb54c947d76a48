//! Scratch directories under the work directory, one per stage.

use crate::error::{StageError, StageResult};
use sieve_protocol::StageName;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory of `stage`, or `None` for stages that write outside
    /// the work directory.
    pub fn stage_dir(&self, stage: StageName) -> Option<PathBuf> {
        stage.scratch_dir_name().map(|name| self.root.join(name))
    }

    /// Create the stage's directory and return it.
    pub fn ensure_stage_dir(&self, stage: StageName) -> StageResult<PathBuf> {
        let dir = self.stage_dir(stage).ok_or_else(|| {
            StageError::Config(format!("stage '{}' has no scratch directory", stage))
        })?;
        fs::create_dir_all(&dir).map_err(|e| StageError::io(&dir, e))?;
        Ok(dir)
    }

    /// Delete a consumed stage directory. Missing directories are fine.
    pub fn clear_stage(&self, stage: StageName) -> StageResult<bool> {
        match self.stage_dir(stage) {
            Some(dir) => remove_dir_if_exists(&dir),
            None => Ok(false),
        }
    }

    /// Remove every scratch directory that exists; returns how many were
    /// removed.
    pub fn cleanup_all(&self) -> StageResult<usize> {
        let mut removed = 0;
        for stage in StageName::ALL {
            if self.clear_stage(stage)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_dir_if_exists(dir: &Path) -> StageResult<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(dir).map_err(|e| StageError::io(dir, e))?;
    debug!(dir = %dir.display(), "Removed scratch directory");
    Ok(true)
}
