//! Whole-snapshot persistence for wizard state.
//!
//! The wizard writes its full state back after every transition; partial
//! updates are never persisted.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::models::wizard::WizardState;

pub trait StateStore {
    fn load(&self) -> Result<Option<WizardState>, StoreError>;
    fn save(&self, state: &WizardState) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// State persisted as one JSON file, replaced atomically via rename.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<WizardState>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &WizardState) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory store; clones share the same slot, which lets tests observe
/// persistence across wizard instances.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<WizardState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<WizardState>, StoreError> {
        Ok(self.slot.lock().expect("store lock poisoned").clone())
    }

    fn save(&self, state: &WizardState) -> Result<(), StoreError> {
        *self.slot.lock().expect("store lock poisoned") = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted state is invalid: {0}")]
    Decode(#[from] serde_json::Error),
}
