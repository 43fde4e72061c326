use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::DomainName;
use crate::infrastructure::nginx::EnabledSites;

use super::{LifecycleError, Rollback, Toolkit};

#[derive(Debug)]
pub struct EnableResult {
    pub link: PathBuf,
    pub target: PathBuf,
    /// Where the link pointed before, when the site was already enabled.
    pub previous_target: Option<PathBuf>,
}

/// Use case: link a site into the enabled set and reload.
///
/// The exact previous link target is captured before anything is touched, so
/// a failed re-enable puts the old link back instead of leaving the site
/// half-configured.
pub struct EnableSite<'a> {
    kit: Toolkit<'a>,
}

impl<'a> EnableSite<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(&self, domain: &DomainName) -> Result<EnableResult, LifecycleError> {
        let live = self.kit.paths.live_site_config(domain);
        if !live.exists() {
            return Err(LifecycleError::ConfigMissing {
                domain: domain.clone(),
                path: live,
            });
        }

        let sites = self.kit.enabled_sites();
        if sites.occupied(domain) && !sites.is_enabled(domain) {
            return Err(LifecycleError::LinkPathOccupied(sites.link_path(domain)));
        }
        let previous_target = sites.link_target(domain);
        if previous_target.is_some() {
            sites.unlink(domain)?;
        }

        if let Err(e) = sites.link(domain, &live) {
            relink(&sites, domain, previous_target.as_deref());
            return Err(e.into());
        }

        let nginx = self.kit.nginx();
        let check = nginx.test_config();
        if !check.passed {
            let rollback = relink(&sites, domain, previous_target.as_deref());
            return Err(LifecycleError::ValidationFailed {
                detail: check.detail,
                rollback,
            });
        }

        if let Err(e) = nginx.reload() {
            let rollback = relink(&sites, domain, previous_target.as_deref());
            return Err(LifecycleError::from_reload(e, rollback));
        }

        info!(domain = %domain, target = %live.display(), "Site enabled");
        Ok(EnableResult {
            link: sites.link_path(domain),
            target: live,
            previous_target,
        })
    }
}

/// Return the enabled-set entry for `domain` to `previous`: the old link
/// target, or no link at all.
pub(super) fn relink(
    sites: &EnabledSites<'_>,
    domain: &DomainName,
    previous: Option<&Path>,
) -> Rollback {
    if let Err(e) = sites.unlink(domain) {
        warn!(domain = %domain, error = %e, "Rollback could not remove link");
        return Rollback::Failed(e.to_string());
    }

    let outcome = match previous {
        Some(target) => match sites.link(domain, target) {
            Ok(()) => Rollback::Restored,
            Err(e) => Rollback::Failed(e.to_string()),
        },
        None => Rollback::Removed,
    };
    warn!(domain = %domain, rollback = %outcome, "Enabled set rolled back");
    outcome
}
