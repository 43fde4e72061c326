use std::fs;
use std::path::{Path, PathBuf};

use super::Toolkit;
use super::list_sites::ListSites;

pub struct SystemStatus {
    pub nginx_installed: bool,
    /// `systemctl is-active` output, e.g. `active`
    pub nginx_state: String,
    pub sites_total: usize,
    pub sites_enabled: usize,
    pub sites_ssl: usize,
    pub mirrored_sites: usize,
    pub mirrored_main: usize,
    pub mirrored_modules: usize,
    pub directories: Vec<(&'static str, PathBuf)>,
}

/// Use case: one-screen overview of the host.
pub struct ShowStatus<'a> {
    kit: Toolkit<'a>,
}

impl<'a> ShowStatus<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(&self) -> SystemStatus {
        let nginx = self.kit.nginx();
        let sites = ListSites::new(self.kit).execute();
        let paths = self.kit.paths;

        SystemStatus {
            nginx_installed: nginx.is_installed(),
            nginx_state: nginx.active_state(),
            sites_total: sites.len(),
            sites_enabled: sites.iter().filter(|s| s.enabled).count(),
            sites_ssl: sites.iter().filter(|s| s.record.is_ssl_enabled()).count(),
            mirrored_sites: count_conf(&paths.mirror_sites_dir),
            mirrored_main: count_conf(&paths.mirror_main_dir),
            mirrored_modules: count_conf(&paths.mirror_modules_dir),
            directories: vec![
                ("Project", paths.project_dir.clone()),
                ("Templates", paths.templates_dir.clone()),
                ("Backups", paths.backups_dir.clone()),
                ("Sites available", paths.sites_available.clone()),
                ("Sites enabled", paths.sites_enabled.clone()),
                ("Web root", paths.web_root_base.clone()),
                ("Certificates", paths.ssl_dir.clone()),
            ],
        }
    }
}

/// Number of `*.conf` files directly inside `dir`.
pub(super) fn count_conf(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "conf"))
                .count()
        })
        .unwrap_or(0)
}
