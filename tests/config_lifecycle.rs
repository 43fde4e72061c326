// Main config, modules, certificates and archives against a sandboxed host.

mod support;

use std::fs;

use sitekeep::application::archive::ArchiveProject;
use sitekeep::application::create_site::{CreateSite, CreateSiteRequest};
use sitekeep::application::enable_site::EnableSite;
use sitekeep::application::issue_certificate::IssueCertificate;
use sitekeep::application::main_config::MainConfig;
use sitekeep::application::modules::Modules;
use sitekeep::application::renew_certificate::RenewCertificate;
use sitekeep::application::{LifecycleError, Rollback, StepOutcome};
use sitekeep::domain::DomainName;
use sitekeep::infrastructure::acme::AcmeError;
use sitekeep::infrastructure::templates::TemplateSource;

use support::Sandbox;

const GZIP: &str = "gzip on;\ngzip_types text/css application/javascript;\n";
const MAIN: &str = "user www-data;\nevents {}\nhttp { include /etc/nginx/sites-enabled/*; }\n";

fn create_enabled(sandbox: &Sandbox, name: &str) -> DomainName {
    let domain = Sandbox::domain(name);
    CreateSite::new(sandbox.kit())
        .execute(CreateSiteRequest {
            domain: domain.clone(),
            root_dir: None,
            enable_php: false,
        })
        .unwrap();
    EnableSite::new(sandbox.kit()).execute(&domain).unwrap();
    domain
}

fn install_acme(sandbox: &Sandbox) {
    let home = sandbox.config.acme.home.clone().unwrap();
    fs::create_dir_all(&home).unwrap();
    fs::write(home.join("acme.sh"), "#!/bin/sh\n").unwrap();
}

#[test]
fn test_module_install_list_and_remove() {
    let sandbox = Sandbox::new();
    sandbox.template("modules/gzip.conf.template", GZIP);
    let modules = Modules::new(sandbox.kit());

    assert_eq!(modules.list().len(), 1);
    assert!(!modules.list()[0].installed);

    modules.install("gzip").unwrap();

    let live = sandbox.paths.live_module_config("gzip");
    assert_eq!(sandbox.read(&live), GZIP);
    assert_eq!(sandbox.read(&sandbox.paths.mirror_module_config("gzip")), GZIP);
    assert!(modules.list()[0].installed);
    assert_eq!(modules.show("gzip").unwrap().live.as_deref(), Some(GZIP));

    modules.remove("gzip").unwrap();

    assert!(!live.exists());
    assert!(!sandbox.paths.mirror_module_config("gzip").exists());
    assert!(matches!(
        modules.show("gzip"),
        Err(LifecycleError::ModuleNotInstalled(_))
    ));
    assert_eq!(sandbox.host.count("systemctl reload nginx"), 2);
}

#[test]
fn test_module_removal_rolled_back_on_failing_validation() {
    let sandbox = Sandbox::new();
    sandbox.template("modules/gzip.conf.template", GZIP);
    let modules = Modules::new(sandbox.kit());
    modules.install("gzip").unwrap();
    sandbox.host.script_nginx(&[1]);

    let err = modules.remove("gzip").unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::ValidationFailed {
            rollback: Rollback::Restored,
            ..
        }
    ));
    assert_eq!(sandbox.read(&sandbox.paths.live_module_config("gzip")), GZIP);
    assert_eq!(sandbox.read(&sandbox.paths.mirror_module_config("gzip")), GZIP);
}

#[test]
fn test_module_errors() {
    let sandbox = Sandbox::new();
    let modules = Modules::new(sandbox.kit());

    assert!(matches!(
        modules.remove("gzip"),
        Err(LifecycleError::ModuleNotInstalled(_))
    ));
    assert!(matches!(
        modules.install("../nginx"),
        Err(LifecycleError::InvalidModuleName(_))
    ));
    assert!(matches!(modules.install("brotli"), Err(LifecycleError::Render(_))));
    assert!(sandbox.host.commands().is_empty());
}

#[test]
fn test_main_apply_replaces_live_config() {
    let sandbox = Sandbox::new();
    sandbox.template("main/nginx.conf.template", MAIN);
    fs::write(&sandbox.paths.main_config, "user nobody;\n").unwrap();

    let applied = MainConfig::new(sandbox.kit()).apply().unwrap();

    assert!(matches!(applied.template, TemplateSource::File(_)));
    let backup = applied.backup.unwrap();
    assert_eq!(sandbox.read(&backup), "user nobody;\n");
    assert!(backup.starts_with(sandbox.paths.backup_dir("main")));
    assert_eq!(sandbox.read(&sandbox.paths.main_config), MAIN);
    assert_eq!(sandbox.read(&sandbox.paths.mirror_main_config()), MAIN);
    assert_eq!(MainConfig::new(sandbox.kit()).show().unwrap(), MAIN);
}

#[test]
fn test_main_apply_rolled_back_on_failing_validation() {
    let sandbox = Sandbox::new();
    sandbox.template("main/nginx.conf.template", MAIN);
    fs::write(&sandbox.paths.main_config, "user nobody;\n").unwrap();
    sandbox.host.set_nginx_status(1);

    let err = MainConfig::new(sandbox.kit()).apply().unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::ValidationFailed {
            rollback: Rollback::Restored,
            ..
        }
    ));
    assert_eq!(sandbox.read(&sandbox.paths.main_config), "user nobody;\n");
    assert!(!sandbox.paths.mirror_main_config().exists());
    assert_eq!(sandbox.host.count("systemctl reload nginx"), 0);
}

#[test]
fn test_main_backup_snapshots_without_changes() {
    let sandbox = Sandbox::new();
    let main = MainConfig::new(sandbox.kit());
    assert!(main.backup().is_none());

    fs::write(&sandbox.paths.main_config, "user nobody;\n").unwrap();
    let first = main.backup().unwrap();
    let second = main.backup().unwrap();

    assert_ne!(first, second);
    assert_eq!(sandbox.read(&second), "user nobody;\n");
}

#[test]
fn test_archive_copies_registry_and_mirrors() {
    let sandbox = Sandbox::new();
    create_enabled(&sandbox, "example.com");
    sandbox.template("modules/gzip.conf.template", GZIP);
    Modules::new(sandbox.kit()).install("gzip").unwrap();

    let archive = ArchiveProject::new(sandbox.kit()).execute().unwrap();

    assert_eq!(archive.files, 3);
    assert!(archive.dir.join("sites.json").is_file());
    assert!(archive.dir.join("sites/example.com.conf").is_file());
    assert!(archive.dir.join("modules/gzip.conf").is_file());
}

#[test]
fn test_archives_in_same_second_get_distinct_dirs() {
    let sandbox = Sandbox::new();
    create_enabled(&sandbox, "example.com");
    let at = time::OffsetDateTime::now_utc();
    let archive = ArchiveProject::new(sandbox.kit());

    let first = archive.execute_at(at).unwrap();
    let second = archive.execute_at(at).unwrap();

    assert_ne!(first.dir, second.dir);
    assert_eq!(second.dir.to_string_lossy(), format!("{}.1", first.dir.display()));
    assert!(first.dir.join("sites.json").is_file());
    assert!(second.dir.join("sites.json").is_file());
}

#[test]
fn test_issue_requires_enabled_site() {
    let sandbox = Sandbox::new();
    let domain = Sandbox::domain("example.com");
    CreateSite::new(sandbox.kit())
        .execute(CreateSiteRequest {
            domain: domain.clone(),
            root_dir: None,
            enable_php: false,
        })
        .unwrap();
    sandbox.host.clear();

    let err = IssueCertificate::new(sandbox.kit())
        .execute(&domain, Some("admin@example.com"))
        .unwrap_err();

    assert!(matches!(err, LifecycleError::NotEnabled(_)));
    assert!(sandbox.host.commands().is_empty());
}

#[test]
fn test_issue_without_client_needs_email() {
    let sandbox = Sandbox::new();
    let domain = create_enabled(&sandbox, "example.com");
    let issue = IssueCertificate::new(sandbox.kit());
    assert!(issue.needs_install().unwrap());

    let err = issue.execute(&domain, None).unwrap_err();

    assert!(matches!(err, LifecycleError::Acme(AcmeError::EmailRequired)));
    assert!(!sandbox.host.commands().iter().any(|c| c.starts_with("bash")));
}

#[test]
fn test_issue_binds_installed_certificate() {
    let sandbox = Sandbox::new();
    let domain = create_enabled(&sandbox, "example.com");
    install_acme(&sandbox);
    // acme.sh is faked; put the files where it would install them
    sandbox.install_cert_files(&domain);
    sandbox.host.clear();

    let issued = IssueCertificate::new(sandbox.kit())
        .execute(&domain, None)
        .unwrap();

    assert!(issued.bound.record.is_ssl_enabled());
    assert!(issued.steps.iter().all(|s| matches!(s, StepOutcome::Success(_))));

    let commands = sandbox.host.commands();
    let root = sandbox.paths.default_root(&domain);
    assert!(commands.iter().any(|c| c.ends_with(&format!(
        "acme.sh --issue -d example.com --webroot {}",
        root.display()
    ))));
    assert!(commands
        .iter()
        .any(|c| c.contains("--install-cert -d example.com") && c.contains("--reloadcmd")));
    assert!(sandbox
        .read(&sandbox.paths.live_site_config(&domain))
        .contains("listen 443 ssl;"));
}

#[test]
fn test_renew_reloads_and_reports_failed_check() {
    let sandbox = Sandbox::new();
    let domain = create_enabled(&sandbox, "example.com");

    let err = RenewCertificate::new(sandbox.kit()).execute(&domain).unwrap_err();
    assert!(matches!(err, LifecycleError::Acme(AcmeError::NotInstalled(_))));

    install_acme(&sandbox);
    let renewed = RenewCertificate::new(sandbox.kit()).execute(&domain).unwrap();
    assert!(matches!(renewed, StepOutcome::Success(_)));

    sandbox.host.set_nginx_status(1);
    let renewed = RenewCertificate::new(sandbox.kit()).execute(&domain).unwrap();
    assert!(renewed.is_warning());
}
