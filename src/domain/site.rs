use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use super::DomainName;

/// Certificate and key paths bound to a site. Both are always present
/// together, so a record cannot claim TLS with half a key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsBinding {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsBinding {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Returns the first of the two files that is missing on disk, if any.
    pub fn missing_file(&self) -> Option<&Path> {
        [&self.cert_path, &self.key_path]
            .into_iter()
            .find(|p| p.as_os_str().is_empty() || !p.is_file())
            .map(PathBuf::as_path)
    }
}

/// Configuration intent for one registered domain.
///
/// Whether the site is enabled is deliberately not part of this type: that
/// state lives in the server's enabled-sites symlink farm and is queried from
/// the filesystem every time it is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    domain: DomainName,
    pub root_dir: PathBuf,
    pub enable_php: bool,
    tls: Option<TlsBinding>,
    created_at: OffsetDateTime,
}

impl SiteRecord {
    pub fn new(
        domain: DomainName,
        root_dir: PathBuf,
        enable_php: bool,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            domain,
            root_dir,
            enable_php,
            tls: None, // Bound later, once certificate files exist
            created_at,
        }
    }

    /// Rebuilds a record from persisted fields.
    pub fn restore(
        domain: DomainName,
        root_dir: PathBuf,
        enable_php: bool,
        tls: Option<TlsBinding>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            domain,
            root_dir,
            enable_php,
            tls,
            created_at,
        }
    }

    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn tls(&self) -> Option<&TlsBinding> {
        self.tls.as_ref()
    }

    pub fn is_ssl_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Returns a copy of this record with the given certificate bound.
    pub fn with_tls(&self, binding: TlsBinding) -> Self {
        Self {
            tls: Some(binding),
            ..self.clone()
        }
    }
}
