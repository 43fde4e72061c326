pub mod config;
pub mod menu;
pub mod prompt;
pub mod service;
pub mod site;
pub mod ssl;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use crate::application::{LifecycleError, StepOutcome, Toolkit};
use crate::infrastructure::config::{Config, ConfigStore};
use crate::infrastructure::exec::{CommandExecutor, Runner, SystemExecutor};
use crate::infrastructure::paths::SitekeepPaths;
use crate::infrastructure::registry::{Registry, SiteRegistry};
use crate::infrastructure::templates::ConfigRenderer;

/// Resolved configuration plus the long-lived components every command
/// borrows from.
pub struct App {
    pub config: Config,
    pub config_path: PathBuf,
    pub paths: SitekeepPaths,
    renderer: ConfigRenderer,
    registry: SiteRegistry,
    executor: Box<dyn CommandExecutor>,
    progress: bool,
}

impl App {
    /// Project directory: `--home`, else `$SITEKEEP_HOME`, else `~/.sitekeep`.
    pub fn project_dir(home: Option<PathBuf>) -> Result<PathBuf> {
        home.or_else(|| std::env::var_os("SITEKEEP_HOME").map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|h| h.join(".sitekeep")))
            .context("Could not find home directory; pass --home")
    }

    pub fn load(home: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let project_dir = Self::project_dir(home)?;
        let config_path = config_path.unwrap_or_else(|| project_dir.join("sitekeep.toml"));
        let config = ConfigStore::new(config_path.clone())
            .load()
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        let paths = config.resolve_paths(&project_dir);

        Ok(Self::with_executor(
            config,
            config_path,
            paths,
            Box::new(SystemExecutor),
        ))
    }

    pub fn with_executor(
        config: Config,
        config_path: PathBuf,
        paths: SitekeepPaths,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        Self {
            renderer: ConfigRenderer::new(paths.templates_dir.clone()),
            registry: SiteRegistry::new(paths.registry_file.clone()),
            config,
            config_path,
            paths,
            executor,
            progress: true,
        }
    }

    pub fn set_progress(&mut self, progress: bool) {
        self.progress = progress;
    }

    /// Create the project tree and an empty registry on first start.
    pub fn ensure_layout(&self) -> Result<()> {
        self.paths.ensure_layout().with_context(|| {
            format!(
                "Failed to create project directory {}",
                self.paths.project_dir.display()
            )
        })?;
        if !self.paths.registry_file.exists() {
            self.registry.save(&Registry::default())?;
        }
        Ok(())
    }

    pub fn toolkit(&self) -> Toolkit<'_> {
        Toolkit {
            config: &self.config,
            paths: &self.paths,
            runner: Runner::new(self.executor.as_ref(), &self.config.privilege.escalation)
                .with_progress(self.progress),
            renderer: &self.renderer,
            registry: &self.registry,
        }
    }

    /// Warn once at start-up when the managed server is missing.
    pub fn check_installed(&self) {
        if !self.toolkit().nginx().is_installed() {
            warn!(binary = %self.config.nginx.binary, "nginx not found");
            eprintln!(
                "Warning: `{}` was not found on PATH. Install nginx before managing sites.",
                self.config.nginx.binary
            );
        }
    }
}

pub fn print_steps<'s>(steps: impl IntoIterator<Item = &'s StepOutcome>) {
    for step in steps {
        match step {
            StepOutcome::Warning(_) => eprintln!("  {}", step),
            _ => println!("  {}", step),
        }
    }
}

/// Print an error, including the server's own diagnostics for failed
/// configuration tests.
pub fn report_error(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
    if let Some(LifecycleError::ValidationFailed { detail, .. }) =
        err.downcast_ref::<LifecycleError>()
    {
        for line in detail.lines().filter(|l| !l.trim().is_empty()) {
            eprintln!("  {}", line);
        }
    }
}
