use std::path::PathBuf;

use tracing::info;

use crate::domain::{DomainName, SiteRecord, TlsBinding};
use crate::infrastructure::clock;
use crate::infrastructure::templates::TemplateSource;

use super::config_writer::ConfigTarget;
use super::{LifecycleError, Toolkit};

#[derive(Debug)]
pub struct BindResult {
    pub record: SiteRecord,
    pub template: TemplateSource,
    pub backup: Option<PathBuf>,
}

/// Use case: switch a site to its TLS vhost using existing certificate files.
///
/// The registry only learns about the binding after the new config has been
/// validated and the server reloaded.
pub struct BindCertificate<'a> {
    kit: Toolkit<'a>,
}

impl<'a> BindCertificate<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(
        &self,
        domain: &DomainName,
        cert_path: PathBuf,
        key_path: PathBuf,
    ) -> Result<BindResult, LifecycleError> {
        let mut registry = self.kit.registry.load();
        let record = registry
            .get(domain)
            .ok_or_else(|| LifecycleError::UnknownDomain(domain.clone()))?;
        if record.is_ssl_enabled() {
            return Err(LifecycleError::AlreadySecured(domain.clone()));
        }

        let binding = TlsBinding::new(cert_path, key_path);
        if let Some(missing) = binding.missing_file() {
            return Err(LifecycleError::CertificateFilesMissing(missing.to_path_buf()));
        }

        let secured = record.with_tls(binding);
        let rendered = self.kit.renderer.render_site(
            &secured,
            self.kit.php_fpm_socket(),
            clock::display(clock::now()),
        )?;

        let writer = self.kit.writer();
        let pending = writer.apply(ConfigTarget::site(self.kit.paths, domain), &rendered.text)?;

        if let Err(e) = self.kit.nginx().reload() {
            let rollback = writer.rollback(&pending);
            return Err(LifecycleError::from_reload(e, rollback));
        }

        registry.insert(secured.clone());
        self.kit.registry.save(&registry)?;
        info!(domain = %domain, "Certificate bound");

        Ok(BindResult {
            record: secured,
            template: rendered.source,
            backup: pending.backup().map(|p| p.to_path_buf()),
        })
    }
}
