use std::path::PathBuf;

use anyhow::Result;

use crate::application::create_site::{CreateSite, CreateSiteRequest};
use crate::application::delete_site::DeleteSite;
use crate::application::disable_site::DisableSite;
use crate::application::enable_site::EnableSite;
use crate::application::list_sites::ListSites;
use crate::domain::DomainName;
use crate::infrastructure::templates::TemplateSource;

use super::{App, print_steps};

pub fn create(app: &App, domain: DomainName, root: Option<PathBuf>, php: bool) -> Result<()> {
    println!("Creating site {}...", domain);
    let result = CreateSite::new(app.toolkit()).execute(CreateSiteRequest {
        domain,
        root_dir: root,
        enable_php: php,
    })?;

    print_steps(&result.steps);
    if result.template == TemplateSource::Builtin {
        println!("  (rendered from the built-in template)");
    }

    println!("\nCreated site: {}", result.record.domain());
    println!("  Config:  {}", result.live_config.display());
    println!("  Mirror:  {}", result.mirror_config.display());
    println!("  Root:    {}", result.record.root_dir.display());
    println!("  PHP:     {}", if result.record.enable_php { "yes" } else { "no" });
    println!("\nEnable it with: sitekeep site enable {}", result.record.domain());
    Ok(())
}

pub fn list(app: &App) -> Result<()> {
    let sites = ListSites::new(app.toolkit()).execute();

    if sites.is_empty() {
        println!("No sites registered.");
        println!("\nCreate one with:");
        println!("  sitekeep site create example.com");
        return Ok(());
    }

    println!("{:<4} {:<32} {:<10} {:<5} {:<5}", "#", "Domain", "Status", "SSL", "PHP");
    for (index, site) in sites.iter().enumerate() {
        println!(
            "{:<4} {:<32} {:<10} {:<5} {:<5}",
            index + 1,
            site.record.domain(),
            if site.enabled { "enabled" } else { "disabled" },
            yes_no(site.record.is_ssl_enabled()),
            yes_no(site.record.enable_php),
        );
    }
    Ok(())
}

pub fn enable(app: &App, domain: &DomainName) -> Result<()> {
    let result = EnableSite::new(app.toolkit()).execute(domain)?;

    if let Some(previous) = result.previous_target.filter(|p| *p != result.target) {
        println!("  Replaced link to {}", previous.display());
    }
    println!("Enabled site: {}", domain);
    println!("  {} -> {}", result.link.display(), result.target.display());
    Ok(())
}

pub fn disable(app: &App, domain: &DomainName) -> Result<()> {
    DisableSite::new(app.toolkit()).execute(domain)?;
    println!("Disabled site: {}", domain);
    Ok(())
}

pub fn delete(app: &App, domain: &DomainName, remove_root: bool, force: bool) -> Result<()> {
    let use_case = DeleteSite::new(app.toolkit());
    let record = use_case.preview(domain)?;

    if !force {
        println!("This will delete the site:");
        println!("  Domain: {}", record.domain());
        let fate = if remove_root { "removed" } else { "kept" };
        println!("  Root:   {} ({})", record.root_dir.display(), fate);
        if record.is_ssl_enabled() {
            println!("  Its certificate directory will be removed");
        }
        println!("\nRun with --force to confirm.");
        return Ok(());
    }

    let report = use_case.execute(domain, remove_root)?;
    print_steps(report.steps());
    println!("Deleted site: {}", domain);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
