//! Progress persistence
//!
//! The engine loads the ledger and pet collection once at construction and
//! saves them after every change. Stores report failures as [`StoreError`];
//! the engine logs them and carries on with its in-memory state.

use crate::error::StoreError;
use crate::pets::PetCollection;
use crate::progression::ProgressionLedger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persistence collaborator for durable player state
pub trait ProgressStore {
    fn load_ledger(&self) -> Result<Option<ProgressionLedger>, StoreError>;
    fn save_ledger(&mut self, ledger: &ProgressionLedger) -> Result<(), StoreError>;
    fn load_pets(&self) -> Result<Option<PetCollection>, StoreError>;
    fn save_pets(&mut self, pets: &PetCollection) -> Result<(), StoreError>;
}

/// In-memory store, mainly for tests and ephemeral runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledger: Option<ProgressionLedger>,
    pets: Option<PetCollection>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(mut self, ledger: ProgressionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Make every save fail, to exercise error paths
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ProgressStore for MemoryStore {
    fn load_ledger(&self) -> Result<Option<ProgressionLedger>, StoreError> {
        Ok(self.ledger.clone())
    }

    fn save_ledger(&mut self, ledger: &ProgressionLedger) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write("memory store rejects saves".into()));
        }
        self.ledger = Some(ledger.clone());
        self.saves += 1;
        Ok(())
    }

    fn load_pets(&self) -> Result<Option<PetCollection>, StoreError> {
        Ok(self.pets.clone())
    }

    fn save_pets(&mut self, pets: &PetCollection) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write("memory store rejects saves".into()));
        }
        self.pets = Some(pets.clone());
        self.saves += 1;
        Ok(())
    }
}

/// Store keeping the ledger and pets as pretty-printed JSON files
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    ledger_path: PathBuf,
    pets_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(ledger_path: impl Into<PathBuf>, pets_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            pets_path: pets_path.into(),
        }
    }

    /// `ledger.json` and `pets.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("ledger.json"), dir.join("pets.json"))
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn pets_path(&self) -> &Path {
        &self.pets_path
    }
}

impl ProgressStore for JsonFileStore {
    fn load_ledger(&self) -> Result<Option<ProgressionLedger>, StoreError> {
        read_json(&self.ledger_path)
    }

    fn save_ledger(&mut self, ledger: &ProgressionLedger) -> Result<(), StoreError> {
        write_json(&self.ledger_path, ledger)
    }

    fn load_pets(&self) -> Result<Option<PetCollection>, StoreError> {
        read_json(&self.pets_path)
    }

    fn save_pets(&mut self, pets: &PetCollection) -> Result<(), StoreError> {
        write_json(&self.pets_path, pets)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Read(format!("{}: {e}", path.display()))),
    };
    Ok(Some(serde_json::from_str(&text)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::Write(format!("{}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StoreError::Write(format!("{}: {e}", path.display())))?;
    fs::write(path, json).map_err(|e| StoreError::Write(format!("{}: {e}", path.display())))
}
