use std::path::PathBuf;

use tracing::info;

use crate::infrastructure::exec::Cmd;
use crate::infrastructure::templates::{TemplateKind, TemplateParams, TemplateSource};

use super::config_writer::ConfigTarget;
use super::{LifecycleError, Toolkit};

#[derive(Debug)]
pub struct MainApplyResult {
    pub template: TemplateSource,
    pub backup: Option<PathBuf>,
}

/// Use case: the server's main configuration file.
pub struct MainConfig<'a> {
    kit: Toolkit<'a>,
}

impl<'a> MainConfig<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    /// Contents of the live main config.
    pub fn show(&self) -> Result<String, LifecycleError> {
        let output = self.kit.runner.run(
            &Cmd::new("cat")
                .path(&self.kit.paths.main_config)
                .elevated(),
        )?;
        Ok(output.stdout)
    }

    /// Install the main template, gated on validation and reload.
    pub fn apply(&self) -> Result<MainApplyResult, LifecycleError> {
        let rendered = self
            .kit
            .renderer
            .render(TemplateKind::Main, &TemplateParams::default())?;

        let writer = self.kit.writer();
        let pending = writer.apply(ConfigTarget::main(self.kit.paths), &rendered.text)?;

        if let Err(e) = self.kit.nginx().reload() {
            let rollback = writer.rollback(&pending);
            return Err(LifecycleError::from_reload(e, rollback));
        }

        info!(path = %self.kit.paths.main_config.display(), "Main configuration applied");
        Ok(MainApplyResult {
            template: rendered.source,
            backup: pending.backup().map(|p| p.to_path_buf()),
        })
    }

    /// Snapshot the live main config without changing it.
    pub fn backup(&self) -> Option<PathBuf> {
        self.kit.backups().snapshot(
            &self.kit.paths.main_config,
            &self.kit.paths.backup_dir("main"),
        )
    }
}
