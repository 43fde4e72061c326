use crate::domain::DomainName;
use crate::infrastructure::acme::AcmeClient;
use crate::infrastructure::nginx::ReloadError;

use super::{LifecycleError, StepOutcome, Toolkit};

/// Use case: renew a certificate and pick it up with a gated reload.
pub struct RenewCertificate<'a> {
    kit: Toolkit<'a>,
}

impl<'a> RenewCertificate<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Returns the outcome of the reload that follows a successful renewal.
    pub fn execute(&self, domain: &DomainName) -> Result<StepOutcome, LifecycleError> {
        AcmeClient::new(self.kit.runner, self.kit.config)?.renew(domain)?;

        Ok(match self.kit.nginx().reload() {
            Ok(()) => StepOutcome::Success("Configuration reloaded".into()),
            Err(ReloadError::Validation(check)) => StepOutcome::Warning(format!(
                "Certificate renewed but configuration test failed: {}",
                check.detail
            )),
            Err(e) => StepOutcome::Warning(format!("Certificate renewed but {}", e)),
        })
    }
}
