//! Persistence for [`PipelineState`].
//!
//! The state is read once at run start and written once at run end. A missing
//! or unreadable file is not an error: the run starts from empty state, which
//! means reprocessing the visible notification window with an empty dedup
//! cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::pipeline_state::PipelineState;
use crate::constants::STATE_FILE_NAME;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write state to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait StateStore {
    /// Never fails; falls back to `PipelineState::default()`
    fn load(&self) -> PipelineState;

    fn save(&self, state: &PipelineState) -> Result<(), StoreError>;
}

/// JSON file at `<data_dir>/state.json`
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> PipelineState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no state at {}, starting fresh", self.path.display());
                return PipelineState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "failed to read state at {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return PipelineState::default();
            }
        };

        match serde_json::from_str::<PipelineState>(&contents) {
            Ok(state) => state.normalized(),
            Err(e) => {
                tracing::warn!(
                    "corrupt state at {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                PipelineState::default()
            }
        }
    }

    /// Write-to-temp-then-rename so an interrupted write never leaves a
    /// truncated state file behind.
    fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(write_err)?;
        fs::rename(&temp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// In-process store, used for dry runs that must not touch disk and in tests
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PipelineState>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new(state: PipelineState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> PipelineState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> PipelineState {
        self.snapshot()
    }

    fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state.clone();
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
