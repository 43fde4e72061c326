use std::fs;

use tracing::info;

use crate::infrastructure::exec::Cmd;
use crate::infrastructure::templates::{TemplateKind, TemplateParams};

use super::config_writer::ConfigTarget;
use super::{LifecycleError, Toolkit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub installed: bool,
}

pub struct ModuleView {
    pub live: Option<String>,
    pub mirror: Option<String>,
}

/// Use case: drop-in module configs under `conf.d`.
pub struct Modules<'a> {
    kit: Toolkit<'a>,
}

impl<'a> Modules<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Every module with a template, and whether it is installed live.
    pub fn list(&self) -> Vec<ModuleInfo> {
        self.kit
            .renderer
            .available_modules()
            .into_iter()
            .map(|name| ModuleInfo {
                installed: self.kit.paths.live_module_config(&name).exists(),
                name,
            })
            .collect()
    }

    /// Install or update a module from its template.
    pub fn install(&self, name: &str) -> Result<(), LifecycleError> {
        check_name(name)?;
        let rendered = self
            .kit
            .renderer
            .render(TemplateKind::Module(name.to_string()), &TemplateParams::default())?;

        let writer = self.kit.writer();
        let pending = writer.apply(ConfigTarget::module(self.kit.paths, name), &rendered.text)?;

        if let Err(e) = self.kit.nginx().reload() {
            let rollback = writer.rollback(&pending);
            return Err(LifecycleError::from_reload(e, rollback));
        }
        info!(module = name, "Module installed");
        Ok(())
    }

    pub fn show(&self, name: &str) -> Result<ModuleView, LifecycleError> {
        check_name(name)?;
        let live_path = self.kit.paths.live_module_config(name);
        let live = if live_path.exists() {
            let output = self
                .kit
                .runner
                .run(&Cmd::new("cat").path(&live_path).elevated())?;
            Some(output.stdout)
        } else {
            None
        };
        let mirror = fs::read_to_string(self.kit.paths.mirror_module_config(name)).ok();

        if live.is_none() && mirror.is_none() {
            return Err(LifecycleError::ModuleNotInstalled(name.to_string()));
        }
        Ok(ModuleView { live, mirror })
    }

    pub fn remove(&self, name: &str) -> Result<(), LifecycleError> {
        check_name(name)?;
        let target = ConfigTarget::module(self.kit.paths, name);
        if !target.live.exists() {
            return Err(LifecycleError::ModuleNotInstalled(name.to_string()));
        }

        let writer = self.kit.writer();
        let pending = writer.remove(target)?;

        if let Err(e) = self.kit.nginx().reload() {
            let rollback = writer.rollback(&pending);
            return Err(LifecycleError::from_reload(e, rollback));
        }
        info!(module = name, "Module removed");
        Ok(())
    }
}

/// Module names become file names under `conf.d`.
fn check_name(name: &str) -> Result<(), LifecycleError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LifecycleError::InvalidModuleName(name.to_string()))
    }
}
