use std::path::{Path, PathBuf};

use crate::domain::DomainName;

/// All resolved paths needed by sitekeep components.
/// Loaded once from config, then passed to components via DI.
#[derive(Debug, Clone)]
pub struct SitekeepPaths {
    // Project tree (owned by the tool, written without privileges)
    pub project_dir: PathBuf,
    pub registry_file: PathBuf,
    pub mirror_sites_dir: PathBuf,
    pub mirror_main_dir: PathBuf,
    pub mirror_modules_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub backups_dir: PathBuf,
    pub log_file: PathBuf,

    // Live system locations (written only through the privileged runner)
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub main_config: PathBuf,
    pub conf_d: PathBuf,
    pub web_root_base: PathBuf,
    pub ssl_dir: PathBuf,
}

impl SitekeepPaths {
    pub fn live_site_config(&self, domain: &DomainName) -> PathBuf {
        self.sites_available.join(domain.as_str())
    }

    pub fn mirror_site_config(&self, domain: &DomainName) -> PathBuf {
        self.mirror_sites_dir.join(format!("{}.conf", domain))
    }

    pub fn enabled_link(&self, domain: &DomainName) -> PathBuf {
        self.sites_enabled.join(domain.as_str())
    }

    pub fn default_root(&self, domain: &DomainName) -> PathBuf {
        self.web_root_base.join(domain.as_str())
    }

    pub fn site_ssl_dir(&self, domain: &DomainName) -> PathBuf {
        self.ssl_dir.join(domain.as_str())
    }

    /// Where the ACME client installs the chain for a domain.
    pub fn default_cert_path(&self, domain: &DomainName) -> PathBuf {
        self.site_ssl_dir(domain).join("fullchain.pem")
    }

    pub fn default_key_path(&self, domain: &DomainName) -> PathBuf {
        self.site_ssl_dir(domain).join("key.pem")
    }

    pub fn mirror_main_config(&self) -> PathBuf {
        self.mirror_main_dir.join("nginx.conf")
    }

    pub fn live_module_config(&self, module: &str) -> PathBuf {
        self.conf_d.join(format!("{}.conf", module))
    }

    pub fn mirror_module_config(&self, module: &str) -> PathBuf {
        self.mirror_modules_dir.join(format!("{}.conf", module))
    }

    /// Snapshot directory for a category of live config (`sites`, `main`, `modules`).
    pub fn backup_dir(&self, category: &str) -> PathBuf {
        self.backups_dir.join("configs").join(category)
    }

    /// Create the project tree on first start.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [
            &self.project_dir,
            &self.mirror_sites_dir,
            &self.mirror_main_dir,
            &self.mirror_modules_dir,
            &self.backups_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        for sub in ["sites", "main", "modules"] {
            std::fs::create_dir_all(self.templates_dir.join(sub))?;
        }
        if let Some(parent) = self.log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn is_within_project(&self, path: &Path) -> bool {
        path.starts_with(&self.project_dir)
    }
}
