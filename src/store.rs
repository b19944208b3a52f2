//! Persistent storage for the tracked city list.
//!
//! The whole list lives in a single record named `cities`. Every mutation
//! reads the full list, computes a new one and writes it back; there is no
//! locking, so two processes writing at once can lose one of the writes.

#[cfg(test)]
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WxError};
use crate::weather::City;

pub trait CityStore {
    /// Read the stored list. A store that has never been written is empty.
    fn load(&self) -> Result<Vec<City>>;

    /// Replace the stored list.
    fn save(&self, cities: &[City]) -> Result<()>;
}

#[derive(Serialize, Deserialize, Default)]
struct Record {
    #[serde(default)]
    cities: Vec<City>,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CityStore for JsonFileStore {
    fn load(&self) -> Result<Vec<City>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let record: Record = serde_json::from_str(&raw)
            .map_err(|e| WxError::Storage(format!("{}: {e}", self.path.display())))?;
        Ok(record.cities)
    }

    fn save(&self, cities: &[City]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = Record {
            cities: cities.to_vec(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| WxError::Storage(e.to_string()))?;

        // full replace: write a sibling file, then rename it over the old one
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!("saved {} cities to {}", cities.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    cities: RefCell<Vec<City>>,
    saves: RefCell<usize>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_cities(cities: Vec<City>) -> Self {
        Self {
            cities: RefCell::new(cities),
            saves: RefCell::new(0),
        }
    }

    /// Number of times `save` has been called.
    pub fn saves(&self) -> usize {
        *self.saves.borrow()
    }
}

#[cfg(test)]
impl CityStore for MemoryStore {
    fn load(&self) -> Result<Vec<City>> {
        Ok(self.cities.borrow().clone())
    }

    fn save(&self, cities: &[City]) -> Result<()> {
        *self.cities.borrow_mut() = cities.to_vec();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
