use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One product's name and currently available quantity. Read-only from the
/// engine's perspective; the catalog is an immutable snapshot during a call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub available: u32,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Product catalog with an explicit, deterministic matching policy:
/// an exact case-insensitive match on the full product name wins; otherwise
/// a substring match in either direction (query within catalog name, or
/// catalog name within query) is accepted, first entry in catalog order
/// winning. Repeated lookups against an unchanged catalog always return
/// the same entry.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Loads a snapshot from a TOML file of `[[entries]]` tables.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        let snapshot = toml::from_str::<SnapshotFile>(&raw)
            .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })?;

        let catalog = Self::new(snapshot.entries);
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(CatalogError::Validation(format!(
                    "entry {index} has an empty product name"
                )));
            }
        }
        Ok(())
    }

    pub fn lookup(&self, query: &str) -> Option<&CatalogEntry> {
        let needle = normalize(query);
        if needle.is_empty() {
            return None;
        }

        self.entries.iter().find(|entry| normalize(&entry.name) == needle).or_else(|| {
            self.entries.iter().find(|entry| {
                let name = normalize(&entry.name);
                name.contains(&needle) || needle.contains(&name)
            })
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_ascii_lowercase()
}
