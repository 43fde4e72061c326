pub mod archive;
pub mod bind_certificate;
pub mod config_writer;
pub mod create_site;
pub mod delete_site;
pub mod disable_site;
pub mod enable_site;
pub mod issue_certificate;
pub mod list_sites;
pub mod main_config;
pub mod modules;
pub mod renew_certificate;
pub mod status;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DomainName;
use crate::infrastructure::acme::AcmeError;
use crate::infrastructure::backup::BackupManager;
use crate::infrastructure::config::Config;
use crate::infrastructure::exec::{ExecError, Runner};
use crate::infrastructure::nginx::{EnabledSites, NginxService, ReloadError};
use crate::infrastructure::paths::SitekeepPaths;
use crate::infrastructure::registry::{RegistryError, SiteRegistry};
use crate::infrastructure::templates::{ConfigRenderer, RenderError};

use self::config_writer::ConfigWriter;

/// Outcome of a single step in a multi-step operation.
///
/// Used by application services to report partial success/failure
/// so the CLI layer can render feedback appropriately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success(String),
    Warning(String),
    Skipped(String),
}

impl StepOutcome {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(msg) => write!(f, "{}", msg),
            Self::Warning(msg) => write!(f, "Warning: {}", msg),
            Self::Skipped(msg) => write!(f, "Skipped: {}", msg),
        }
    }
}

/// What happened to the artifact a failed gate was guarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    /// The preceding content or symlink is back in place.
    Restored,
    /// The artifact did not exist before and was removed again.
    Removed,
    /// No snapshot was available; the failing state was left for the operator.
    NotPossible,
    /// Rolling back was attempted and failed.
    Failed(String),
}

impl fmt::Display for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored => write!(f, "previous state restored"),
            Self::Removed => write!(f, "new file removed"),
            Self::NotPossible => write!(f, "no snapshot available, left as written"),
            Self::Failed(e) => write!(f, "rollback failed: {}", e),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Site '{0}' already exists")]
    DuplicateDomain(DomainName),

    #[error("Site '{0}' does not exist")]
    UnknownDomain(DomainName),

    #[error("No live configuration for '{domain}' at {path}")]
    ConfigMissing { domain: DomainName, path: PathBuf },

    #[error("Site '{0}' is not enabled")]
    NotEnabled(DomainName),

    #[error("{0} exists and is not a symlink; move it aside first")]
    LinkPathOccupied(PathBuf),

    #[error("Document root {0} contains characters nginx would misread")]
    InvalidRootDir(PathBuf),

    #[error("Site '{0}' already has SSL configured")]
    AlreadySecured(DomainName),

    #[error("Certificate file not found: {0}")]
    CertificateFilesMissing(PathBuf),

    #[error("Configuration test failed ({rollback})")]
    ValidationFailed { detail: String, rollback: Rollback },

    #[error("Service action failed: {source} ({rollback})")]
    ServiceActionFailed { source: ExecError, rollback: Rollback },

    #[error("Module '{0}' is not installed")]
    ModuleNotInstalled(String),

    #[error("Invalid module name '{0}'")]
    InvalidModuleName(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Acme(#[from] AcmeError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LifecycleError {
    /// Attach the rollback result to a failed reload.
    pub fn from_reload(err: ReloadError, rollback: Rollback) -> Self {
        match err {
            ReloadError::Validation(check) => Self::ValidationFailed {
                detail: check.detail,
                rollback,
            },
            ReloadError::Service(source) => Self::ServiceActionFailed { source, rollback },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Everything a use case needs, resolved once at start-up.
#[derive(Clone, Copy)]
pub struct Toolkit<'a> {
    pub config: &'a Config,
    pub paths: &'a SitekeepPaths,
    pub runner: Runner<'a>,
    pub renderer: &'a ConfigRenderer,
    pub registry: &'a SiteRegistry,
}

impl<'a> Toolkit<'a> {
    pub fn nginx(&self) -> NginxService<'a> {
        NginxService::new(self.runner, &self.config.nginx)
    }

    pub fn enabled_sites(&self) -> EnabledSites<'a> {
        EnabledSites::new(self.runner, self.paths)
    }

    pub fn backups(&self) -> BackupManager<'a> {
        BackupManager::new(self.runner)
    }

    pub fn writer(&self) -> ConfigWriter<'a> {
        ConfigWriter::new(self.runner, self.nginx())
    }

    pub fn php_fpm_socket(&self) -> &'a str {
        &self.config.web.php_fpm_socket
    }
}
