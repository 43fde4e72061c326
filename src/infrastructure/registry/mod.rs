//! The persisted site registry (`sites.json`).

mod dto;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{DomainName, SiteRecord};
use crate::infrastructure::clock;

pub use dto::SiteRecordDto;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse registry {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Mapping of domain to site record. Configuration intent only; live state
/// such as "enabled" is never part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    sites: BTreeMap<DomainName, SiteRecord>,
}

impl Registry {
    pub fn get(&self, domain: &DomainName) -> Option<&SiteRecord> {
        self.sites.get(domain)
    }

    pub fn contains(&self, domain: &DomainName) -> bool {
        self.sites.contains_key(domain)
    }

    /// Insert or replace the record for its domain.
    pub fn insert(&mut self, record: SiteRecord) -> Option<SiteRecord> {
        self.sites.insert(record.domain().clone(), record)
    }

    pub fn remove(&mut self, domain: &DomainName) -> Option<SiteRecord> {
        self.sites.remove(domain)
    }

    /// Records in domain order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteRecord> {
        self.sites.values()
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainName> {
        self.sites.keys()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

pub struct SiteRegistry {
    path: PathBuf,
}

impl SiteRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, treating any failure as "no sites yet".
    ///
    /// A file that exists but cannot be parsed is copied aside as
    /// `sites.json.corrupt.<stamp>` first, so the next save does not
    /// destroy it.
    pub fn load(&self) -> Registry {
        match self.load_strict() {
            Ok(registry) => registry,
            Err(e @ RegistryError::Parse { .. }) => {
                warn!(error = %e, "Registry unreadable; starting empty");
                self.preserve_corrupt();
                Registry::default()
            }
            Err(e) => {
                warn!(error = %e, "Registry unreadable; starting empty");
                Registry::default()
            }
        }
    }

    /// Load the registry, surfacing I/O and parse errors. Individual entries
    /// with an invalid domain are skipped.
    pub fn load_strict(&self) -> Result<Registry, RegistryError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No registry yet");
            return Ok(Registry::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| RegistryError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Registry::default());
        }

        let raw: BTreeMap<String, SiteRecordDto> =
            serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let mut registry = Registry::default();
        for (key, dto) in raw {
            match dto.into_record(&key) {
                Ok(record) => {
                    registry.insert(record);
                }
                Err(e) => warn!(key = %key, error = %e, "Skipping invalid registry entry"),
            }
        }
        Ok(registry)
    }

    pub fn save(&self, registry: &Registry) -> Result<(), RegistryError> {
        let raw: BTreeMap<&str, SiteRecordDto> = registry
            .iter()
            .map(|record| (record.domain().as_str(), SiteRecordDto::from(record)))
            .collect();
        let content = serde_json::to_string_pretty(&raw)?;

        let write = || -> std::io::Result<()> {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&self.path, content)
        };
        write().map_err(|source| RegistryError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), sites = registry.len(), "Registry saved");
        Ok(())
    }

    fn preserve_corrupt(&self) {
        let mut aside = self.path.clone().into_os_string();
        aside.push(format!(".corrupt.{}", clock::backup_stamp(clock::now())));
        let aside = PathBuf::from(aside);
        match fs::copy(&self.path, &aside) {
            Ok(_) => warn!(copy = %aside.display(), "Corrupt registry preserved"),
            Err(e) => warn!(error = %e, "Could not preserve corrupt registry"),
        }
    }
}
