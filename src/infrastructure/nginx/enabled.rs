use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::DomainName;
use crate::infrastructure::exec::{Cmd, ExecError, Runner};
use crate::infrastructure::paths::SitekeepPaths;

/// The server's enabled-sites symlink farm.
///
/// This is the only source of truth for whether a site is enabled; nothing
/// about it is cached or persisted.
pub struct EnabledSites<'a> {
    runner: Runner<'a>,
    paths: &'a SitekeepPaths,
}

impl<'a> EnabledSites<'a> {
    pub fn new(runner: Runner<'a>, paths: &'a SitekeepPaths) -> Self {
        Self { runner, paths }
    }

    pub fn link_path(&self, domain: &DomainName) -> PathBuf {
        self.paths.enabled_link(domain)
    }

    /// True when a symlink for the domain exists, even a dangling one.
    pub fn is_enabled(&self, domain: &DomainName) -> bool {
        fs::symlink_metadata(self.link_path(domain))
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// True when anything at all occupies the link path.
    pub fn occupied(&self, domain: &DomainName) -> bool {
        fs::symlink_metadata(self.link_path(domain)).is_ok()
    }

    /// Exact path the domain's symlink points at, if it is a symlink.
    pub fn link_target(&self, domain: &DomainName) -> Option<PathBuf> {
        fs::read_link(self.link_path(domain)).ok()
    }

    pub fn link(&self, domain: &DomainName, target: &Path) -> Result<(), ExecError> {
        self.runner.run(
            &Cmd::new("ln")
                .arg("-s")
                .path(target)
                .path(&self.link_path(domain))
                .describe(format!("Enabling site {}", domain))
                .elevated(),
        )?;
        Ok(())
    }

    pub fn unlink(&self, domain: &DomainName) -> Result<(), ExecError> {
        self.runner.run(
            &Cmd::new("rm")
                .arg("-f")
                .path(&self.link_path(domain))
                .describe(format!("Removing link for {}", domain))
                .elevated(),
        )?;
        Ok(())
    }
}
