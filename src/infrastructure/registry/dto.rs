//! Persistence DTO for `SiteRecord`.
//!
//! The on-disk JSON keeps the flat field names older registries were written
//! with. The DTO has no `enabled` field, so one found in an old file is
//! dropped on read and can never be written back.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::warn;

use crate::domain::{DomainName, DomainNameError, SiteRecord, TlsBinding};
use crate::infrastructure::clock;

/// Timestamps without an offset, as written by earlier tooling.
const NAIVE_ISO: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecordDto {
    pub domain: String,
    pub root_dir: PathBuf,
    #[serde(default)]
    pub enable_php: bool,
    #[serde(default)]
    pub enable_ssl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<PathBuf>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<&SiteRecord> for SiteRecordDto {
    fn from(record: &SiteRecord) -> Self {
        let tls = record.tls();
        Self {
            domain: record.domain().to_string(),
            root_dir: record.root_dir.clone(),
            enable_php: record.enable_php,
            enable_ssl: tls.is_some(),
            ssl_cert: tls.map(|t| t.cert_path.clone()),
            ssl_key: tls.map(|t| t.key_path.clone()),
            created_at: record.created_at().format(&Rfc3339).ok(),
        }
    }
}

impl SiteRecordDto {
    /// Convert to a record stored under `key`. The key wins over the
    /// embedded `domain` field when the two disagree.
    pub fn into_record(self, key: &str) -> Result<SiteRecord, DomainNameError> {
        let domain = DomainName::new(key)?;
        if !self.domain.is_empty() && !self.domain.eq_ignore_ascii_case(domain.as_str()) {
            warn!(
                key,
                embedded = %self.domain,
                "Registry entry names a different domain; using key"
            );
        }

        let tls = match (self.enable_ssl, self.ssl_cert, self.ssl_key) {
            (true, Some(cert), Some(key))
                if !cert.as_os_str().is_empty() && !key.as_os_str().is_empty() =>
            {
                Some(TlsBinding::new(cert, key))
            }
            (true, _, _) => {
                warn!(domain = %domain, "SSL flagged without certificate paths; treating as plain");
                None
            }
            _ => None,
        };

        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(clock::now);

        Ok(SiteRecord::restore(
            domain,
            self.root_dir,
            self.enable_php,
            tls,
            created_at,
        ))
    }
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    match PrimitiveDateTime::parse(raw, NAIVE_ISO) {
        Ok(naive) => Some(naive.assume_offset(clock::now().offset())),
        Err(e) => {
            warn!(value = raw, error = %e, "Unreadable created_at");
            None
        }
    }
}
