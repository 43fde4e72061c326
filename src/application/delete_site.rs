use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::{DomainName, SiteRecord};
use crate::infrastructure::exec::Cmd;
use crate::infrastructure::nginx::ReloadError;

use super::{LifecycleError, StepOutcome, Toolkit};

/// Result of a site deletion. Every cleanup step is reported on its own;
/// none of them aborts the deletion.
#[derive(Debug)]
pub struct DeleteReport {
    pub record: SiteRecord,
    pub link: StepOutcome,
    pub live_config: StepOutcome,
    pub mirror_config: StepOutcome,
    pub certificates: StepOutcome,
    pub document_root: StepOutcome,
    pub registry: StepOutcome,
    /// Final check + reload. A failure here does not bring the site back.
    pub consistency: StepOutcome,
}

impl DeleteReport {
    pub fn steps(&self) -> [&StepOutcome; 7] {
        [
            &self.link,
            &self.live_config,
            &self.mirror_config,
            &self.certificates,
            &self.document_root,
            &self.registry,
            &self.consistency,
        ]
    }

    pub fn is_clean(&self) -> bool {
        self.steps().iter().all(|s| !s.is_warning())
    }
}

/// Use case: remove a site and everything sitekeep created for it.
pub struct DeleteSite<'a> {
    kit: Toolkit<'a>,
}

impl<'a> DeleteSite<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Look up the record so the CLI can confirm before `execute()`.
    pub fn preview(&self, domain: &DomainName) -> Result<SiteRecord, LifecycleError> {
        self.kit
            .registry
            .load()
            .get(domain)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownDomain(domain.clone()))
    }

    pub fn execute(
        &self,
        domain: &DomainName,
        remove_root: bool,
    ) -> Result<DeleteReport, LifecycleError> {
        let mut registry = self.kit.registry.load();
        let Some(record) = registry.get(domain).cloned() else {
            return Err(LifecycleError::UnknownDomain(domain.clone()));
        };
        let paths = self.kit.paths;

        let sites = self.kit.enabled_sites();
        let link = if sites.is_enabled(domain) {
            match sites.unlink(domain) {
                Ok(()) => StepOutcome::Success("Link removed".into()),
                Err(e) => StepOutcome::Warning(format!("Failed to remove link: {}", e)),
            }
        } else if sites.occupied(domain) {
            StepOutcome::Warning(format!(
                "{} is not a symlink; left in place",
                sites.link_path(domain).display()
            ))
        } else {
            StepOutcome::Skipped("Site was not enabled".into())
        };

        let live_config = self.remove(&paths.live_site_config(domain), false, "live configuration");

        let mirror = paths.mirror_site_config(domain);
        let mirror_config = if mirror.exists() {
            match fs::remove_file(&mirror) {
                Ok(()) => StepOutcome::Success("Project configuration removed".into()),
                Err(e) => {
                    StepOutcome::Warning(format!("Failed to remove {}: {}", mirror.display(), e))
                }
            }
        } else {
            StepOutcome::Skipped("No project configuration".into())
        };

        let certificates = self.remove(&paths.site_ssl_dir(domain), true, "certificate directory");

        let document_root = if !remove_root {
            StepOutcome::Skipped(format!("Document root {} kept", record.root_dir.display()))
        } else if !is_removable_root(&record.root_dir, &paths.web_root_base) {
            StepOutcome::Warning(format!(
                "Refusing to remove {}; delete it by hand",
                record.root_dir.display()
            ))
        } else {
            self.remove(&record.root_dir, true, "document root")
        };

        registry.remove(domain);
        let registry_step = match self.kit.registry.save(&registry) {
            Ok(()) => StepOutcome::Success("Registry updated".into()),
            Err(e) => StepOutcome::Warning(format!("Registry not saved: {}", e)),
        };

        let consistency = match self.kit.nginx().reload() {
            Ok(()) => StepOutcome::Success("Configuration reloaded".into()),
            Err(ReloadError::Validation(check)) => StepOutcome::Warning(format!(
                "Configuration test failed after deletion: {}",
                check.detail
            )),
            Err(e @ ReloadError::Service(_)) => StepOutcome::Warning(e.to_string()),
        };

        info!(domain = %domain, "Site deleted");
        Ok(DeleteReport {
            record,
            link,
            live_config,
            mirror_config,
            certificates,
            document_root,
            registry: registry_step,
            consistency,
        })
    }

    fn remove(&self, path: &Path, recursive: bool, what: &str) -> StepOutcome {
        if fs::symlink_metadata(path).is_err() {
            return StepOutcome::Skipped(format!("No {}", what));
        }
        let cmd = Cmd::new("rm")
            .arg(if recursive { "-rf" } else { "-f" })
            .path(path)
            .describe(format!("Removing {}", path.display()))
            .elevated();
        match self.kit.runner.run(&cmd) {
            Ok(_) => StepOutcome::Success(format!("Removed {}", what)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cleanup step failed");
                StepOutcome::Warning(format!("Failed to remove {}: {}", what, e))
            }
        }
    }
}

/// Paths that are never handed to `rm -rf`: relative paths, the filesystem
/// root, top-level directories and the web root base itself.
fn is_removable_root(path: &Path, web_root_base: &Path) -> bool {
    path.is_absolute() && path.components().count() > 2 && path != web_root_base
}
