use anyhow::{Result, bail};

use crate::application::archive::ArchiveProject;
use crate::application::main_config::MainConfig;
use crate::application::modules::Modules;
use crate::infrastructure::config::{Config, ConfigStore};
use crate::infrastructure::templates::TemplateSource;

use super::App;

pub fn main_show(app: &App) -> Result<()> {
    let content = MainConfig::new(app.toolkit()).show()?;
    print!("{}", content);
    Ok(())
}

pub fn main_apply(app: &App) -> Result<()> {
    let result = MainConfig::new(app.toolkit()).apply()?;

    if let TemplateSource::File(path) = &result.template {
        println!("Applied main configuration from {}", path.display());
    }
    match &result.backup {
        Some(backup) => println!("  Previous version saved as {}", backup.display()),
        None => println!("  No previous version to back up"),
    }
    Ok(())
}

pub fn main_backup(app: &App) -> Result<()> {
    match MainConfig::new(app.toolkit()).backup() {
        Some(path) => println!("Backed up to {}", path.display()),
        None => bail!(
            "Could not back up {}; see the log for details",
            app.paths.main_config.display()
        ),
    }
    Ok(())
}

pub fn module_list(app: &App) -> Result<()> {
    let modules = Modules::new(app.toolkit()).list();
    if modules.is_empty() {
        println!(
            "No module templates in {}",
            app.paths.templates_dir.join("modules").display()
        );
        return Ok(());
    }

    println!("{:<4} {:<28} {}", "#", "Module", "Status");
    for (index, module) in modules.iter().enumerate() {
        println!(
            "{:<4} {:<28} {}",
            index + 1,
            module.name,
            if module.installed { "installed" } else { "available" }
        );
    }
    Ok(())
}

pub fn module_install(app: &App, name: &str) -> Result<()> {
    Modules::new(app.toolkit()).install(name)?;
    println!("Installed module: {}", name);
    println!("  {}", app.paths.live_module_config(name).display());
    Ok(())
}

pub fn module_show(app: &App, name: &str) -> Result<()> {
    let view = Modules::new(app.toolkit()).show(name)?;

    match &view.live {
        Some(live) => {
            println!("# {}", app.paths.live_module_config(name).display());
            print!("{}", live);
        }
        None => println!("# not installed in {}", app.paths.conf_d.display()),
    }
    if view.mirror.is_some() && view.mirror != view.live {
        println!("\n# project copy differs: {}", app.paths.mirror_module_config(name).display());
    }
    Ok(())
}

pub fn module_remove(app: &App, name: &str) -> Result<()> {
    Modules::new(app.toolkit()).remove(name)?;
    println!("Removed module: {}", name);
    Ok(())
}

pub fn archive(app: &App) -> Result<()> {
    let result = ArchiveProject::new(app.toolkit()).execute()?;
    println!("Archived {} file(s) to {}", result.files, result.dir.display());
    Ok(())
}

/// Write the default config file unless one exists.
pub fn init(app: &App) -> Result<()> {
    let store = ConfigStore::new(app.config_path.clone());
    if store.exists() {
        println!("Config already exists: {}", store.path().display());
        return Ok(());
    }

    store.save(&Config::default())?;
    println!("Wrote default config: {}", store.path().display());
    Ok(())
}
