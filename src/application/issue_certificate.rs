use tracing::info;

use crate::domain::DomainName;
use crate::infrastructure::acme::{AcmeClient, AcmeError};
use crate::infrastructure::exec::Cmd;

use super::bind_certificate::{BindCertificate, BindResult};
use super::{LifecycleError, StepOutcome, Toolkit};

#[derive(Debug)]
pub struct IssueResult {
    pub steps: Vec<StepOutcome>,
    pub bound: BindResult,
}

/// Use case: obtain a certificate through acme.sh and bind it to the site.
pub struct IssueCertificate<'a> {
    kit: Toolkit<'a>,
}

impl<'a> IssueCertificate<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Whether acme.sh still needs installing, in which case `execute` needs
    /// an account email.
    pub fn needs_install(&self) -> Result<bool, LifecycleError> {
        Ok(!AcmeClient::new(self.kit.runner, self.kit.config)?.is_installed())
    }

    pub fn execute(
        &self,
        domain: &DomainName,
        email: Option<&str>,
    ) -> Result<IssueResult, LifecycleError> {
        let registry = self.kit.registry.load();
        let record = registry
            .get(domain)
            .ok_or_else(|| LifecycleError::UnknownDomain(domain.clone()))?;
        if record.is_ssl_enabled() {
            return Err(LifecycleError::AlreadySecured(domain.clone()));
        }
        // The webroot challenge is served by the site itself
        if !self.kit.enabled_sites().is_enabled(domain) {
            return Err(LifecycleError::NotEnabled(domain.clone()));
        }

        let acme = AcmeClient::new(self.kit.runner, self.kit.config)?;
        let mut steps = Vec::new();

        if !acme.is_installed() {
            let email = email
                .or(self.kit.config.acme.email.as_deref())
                .ok_or(AcmeError::EmailRequired)?;
            acme.install(email)?;
            steps.push(StepOutcome::Success(format!(
                "acme.sh installed in {}",
                acme.home().display()
            )));
        }

        let paths = self.kit.paths;
        let ssl_dir = paths.site_ssl_dir(domain);
        self.kit.runner.run(
            &Cmd::new("mkdir")
                .arg("-p")
                .path(&ssl_dir)
                .describe(format!("Creating {}", ssl_dir.display()))
                .elevated(),
        )?;

        let cert_path = paths.default_cert_path(domain);
        let key_path = paths.default_key_path(domain);
        acme.issue(domain, &record.root_dir)?;
        acme.install_cert(domain, &key_path, &cert_path)?;
        steps.push(StepOutcome::Success(format!(
            "Certificate installed to {}",
            ssl_dir.display()
        )));
        info!(domain = %domain, "Certificate issued");

        let bound = BindCertificate::new(self.kit).execute(domain, cert_path, key_path)?;
        Ok(IssueResult { steps, bound })
    }
}
