use std::path::PathBuf;

use anyhow::Result;

use crate::application::bind_certificate::BindCertificate;
use crate::application::issue_certificate::IssueCertificate;
use crate::application::renew_certificate::RenewCertificate;
use crate::domain::DomainName;
use crate::infrastructure::certs::{CertificateInventory, CertificateStatus};
use crate::infrastructure::clock;

use super::{App, print_steps};

pub fn issue(app: &App, domain: &DomainName, email: Option<&str>) -> Result<()> {
    println!("Requesting certificate for {}...", domain);
    let result = IssueCertificate::new(app.toolkit()).execute(domain, email)?;

    print_steps(&result.steps);
    println!("\nHTTPS enabled: https://{}", result.bound.record.domain());
    Ok(())
}

pub fn renew(app: &App, domain: &DomainName) -> Result<()> {
    let reload = RenewCertificate::new(app.toolkit()).execute(domain)?;

    println!("Renewed certificate for {}", domain);
    print_steps([&reload]);
    Ok(())
}

pub fn bind(
    app: &App,
    domain: &DomainName,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
) -> Result<()> {
    let paths = &app.paths;
    let cert = cert.unwrap_or_else(|| paths.default_cert_path(domain));
    let key = key.unwrap_or_else(|| paths.default_key_path(domain));

    let result = BindCertificate::new(app.toolkit()).execute(domain, cert, key)?;

    println!("Certificate bound to {}", domain);
    if let Some(backup) = &result.backup {
        println!("  Previous config saved as {}", backup.display());
    }
    println!("  https://{}", domain);
    Ok(())
}

pub fn list(app: &App) -> Result<()> {
    let kit = app.toolkit();
    let inventory = CertificateInventory::new(kit.runner.with_progress(false), &app.paths.ssl_dir);
    let certs = inventory.scan(clock::now());

    if certs.is_empty() {
        println!("No certificates found in {}", app.paths.ssl_dir.display());
        return Ok(());
    }

    println!("{:<32} {:<22} {:<10} {}", "Domain", "Expires", "Days", "Status");
    for cert in certs {
        let expires = cert
            .expires_at
            .map(clock::display)
            .unwrap_or_else(|| "N/A".to_string());
        let days = cert
            .days_left
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let line = format!("{:<32} {:<22} {:<10} {}", cert.domain, expires, days, cert.status);
        match cert.status {
            CertificateStatus::Valid => println!("{}", line),
            _ => eprintln!("{}", line),
        }
    }
    Ok(())
}
