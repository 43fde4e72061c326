use std::path::PathBuf;

use tracing::info;

use crate::domain::DomainName;

use super::enable_site::relink;
use super::{LifecycleError, Toolkit};

/// Use case: unlink a site from the enabled set and reload.
pub struct DisableSite<'a> {
    kit: Toolkit<'a>,
}

impl<'a> DisableSite<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Returns the target the removed link pointed at.
    pub fn execute(&self, domain: &DomainName) -> Result<PathBuf, LifecycleError> {
        let sites = self.kit.enabled_sites();
        let Some(previous_target) = sites.link_target(domain) else {
            return Err(LifecycleError::NotEnabled(domain.clone()));
        };

        sites.unlink(domain)?;

        let nginx = self.kit.nginx();
        let check = nginx.test_config();
        if !check.passed {
            let rollback = relink(&sites, domain, Some(&previous_target));
            return Err(LifecycleError::ValidationFailed {
                detail: check.detail,
                rollback,
            });
        }

        if let Err(e) = nginx.reload() {
            let rollback = relink(&sites, domain, Some(&previous_target));
            return Err(LifecycleError::from_reload(e, rollback));
        }

        info!(domain = %domain, "Site disabled");
        Ok(previous_target)
    }
}
