//! Inventory of installed certificates under the SSL directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, warn};

use super::exec::{Cmd, Runner};

/// `notAfter=Mar  5 07:08:09 2025 GMT`, after whitespace is collapsed.
const OPENSSL_DATE: &[FormatItem<'static>] = format_description!(
    "[month repr:short] [day padding:none] [hour]:[minute]:[second] [year]"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Valid,
    /// Fewer than 30 days left
    ExpiringSoon,
    /// Fewer than 7 days left
    Critical,
    Expired,
    /// Expiry could not be read or parsed
    Unreadable,
}

impl CertificateStatus {
    pub fn classify(expires_at: OffsetDateTime, now: OffsetDateTime) -> Self {
        if expires_at <= now {
            Self::Expired
        } else if expires_at - now < Duration::days(7) {
            Self::Critical
        } else if expires_at - now < Duration::days(30) {
            Self::ExpiringSoon
        } else {
            Self::Valid
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "Valid"),
            Self::ExpiringSoon => write!(f, "Expiring soon"),
            Self::Critical => write!(f, "Critical"),
            Self::Expired => write!(f, "Expired"),
            Self::Unreadable => write!(f, "Unreadable"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub domain: String,
    pub path: PathBuf,
    pub expires_at: Option<OffsetDateTime>,
    pub days_left: Option<i64>,
    pub status: CertificateStatus,
}

/// Parse the output of `openssl x509 -enddate -noout`.
pub fn parse_enddate(output: &str) -> Option<OffsetDateTime> {
    let (_, value) = output.trim().split_once('=')?;
    let normalized = value.split_whitespace().take(4).collect::<Vec<_>>().join(" ");
    PrimitiveDateTime::parse(&normalized, OPENSSL_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

pub struct CertificateInventory<'a> {
    runner: Runner<'a>,
    ssl_dir: &'a Path,
}

impl<'a> CertificateInventory<'a> {
    pub fn new(runner: Runner<'a>, ssl_dir: &'a Path) -> Self {
        Self { runner, ssl_dir }
    }

    /// Every `<ssl_dir>/<domain>/fullchain.pem`, in domain order.
    pub fn scan(&self, now: OffsetDateTime) -> Vec<CertificateInfo> {
        let entries = match fs::read_dir(self.ssl_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.ssl_dir.display(), error = %e, "SSL directory not readable");
                return Vec::new();
            }
        };

        let mut found: Vec<CertificateInfo> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path().join("fullchain.pem"))
            .filter(|chain| chain.is_file())
            .map(|chain| self.inspect(&chain, now))
            .collect();
        found.sort_by(|a, b| a.domain.cmp(&b.domain));
        found
    }

    pub fn inspect(&self, chain: &Path, now: OffsetDateTime) -> CertificateInfo {
        let domain = chain
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let expires_at = self.read_expiry(chain);
        let status = expires_at
            .map(|at| CertificateStatus::classify(at, now))
            .unwrap_or(CertificateStatus::Unreadable);

        CertificateInfo {
            domain,
            path: chain.to_path_buf(),
            expires_at,
            days_left: expires_at.map(|at| (at - now).whole_days()),
            status,
        }
    }

    fn read_expiry(&self, chain: &Path) -> Option<OffsetDateTime> {
        let cmd = Cmd::new("openssl")
            .args(["x509", "-enddate", "-noout", "-in"])
            .path(chain)
            .elevated()
            .allow_failure();

        match self.runner.run(&cmd) {
            Ok(output) if output.success() => {
                let parsed = parse_enddate(&output.stdout);
                if parsed.is_none() {
                    warn!(
                        path = %chain.display(),
                        output = %output.stdout.trim(),
                        "Unparseable certificate expiry"
                    );
                }
                parsed
            }
            Ok(output) => {
                warn!(
                    path = %chain.display(),
                    status = output.status,
                    "openssl could not read certificate"
                );
                None
            }
            Err(e) => {
                warn!(path = %chain.display(), error = %e, "openssl could not run");
                None
            }
        }
    }
}
