use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths::SitekeepPaths;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Tool settings, stored as TOML in the project directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub nginx: NginxConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub privilege: PrivilegeConfig,
    #[serde(default)]
    pub acme: AcmeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub main_config: PathBuf,
    pub conf_d: PathBuf,
    pub web_root_base: PathBuf,
    pub ssl_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            main_config: PathBuf::from("/etc/nginx/nginx.conf"),
            conf_d: PathBuf::from("/etc/nginx/conf.d"),
            web_root_base: PathBuf::from("/var/www"),
            ssl_dir: PathBuf::from("/etc/nginx/ssl"),
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NginxConfig {
    pub binary: String,
    pub service: String,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            binary: "nginx".into(),
            service: "nginx".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub user: String,
    pub group: String,
    pub php_fpm_socket: String,
}

impl WebConfig {
    pub fn owner(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            user: "www-data".into(),
            group: "www-data".into(),
            php_fpm_socket: "unix:/run/php/php-fpm.sock".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// Prefix prepended to elevated commands. Empty when running as root.
    pub escalation: Vec<String>,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            escalation: vec!["sudo".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub server: String,
}

impl Default for AcmeConfig {
    fn default() -> Self {
        Self {
            home: None,
            email: None,
            server: "letsencrypt".into(),
        }
    }
}

impl Config {
    /// Resolve every path the components need, rooted at the project directory.
    pub fn resolve_paths(&self, project_dir: &Path) -> SitekeepPaths {
        let configs = project_dir.join("configs");
        SitekeepPaths {
            project_dir: project_dir.to_path_buf(),
            registry_file: project_dir.join("sites.json"),
            mirror_sites_dir: configs.join("sites"),
            mirror_main_dir: configs.join("main"),
            mirror_modules_dir: configs.join("modules"),
            templates_dir: self
                .paths
                .templates_dir
                .clone()
                .unwrap_or_else(|| project_dir.join("templates")),
            backups_dir: project_dir.join("backups"),
            log_file: project_dir.join("logs").join("sitekeep.log"),
            sites_available: self.paths.sites_available.clone(),
            sites_enabled: self.paths.sites_enabled.clone(),
            main_config: self.paths.main_config.clone(),
            conf_d: self.paths.conf_d.clone(),
            web_root_base: self.paths.web_root_base.clone(),
            ssl_dir: self.paths.ssl_dir.clone(),
        }
    }

    /// Home directory of acme.sh, falling back to `~/.acme.sh`.
    pub fn acme_home(&self) -> Option<PathBuf> {
        self.acme
            .home
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".acme.sh")))
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("sitekeep.toml"));

        let config = store.load().unwrap();
        assert_eq!(config.nginx.service, "nginx");
        assert_eq!(config.web.owner(), "www-data:www-data");
        assert_eq!(config.privilege.escalation, vec!["sudo".to_string()]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitekeep.toml");
        fs::write(
            &path,
            "[paths]\nweb_root_base = \"/srv/www\"\n\n[privilege]\nescalation = []\n",
        )
        .unwrap();

        let config = ConfigStore::new(path).load().unwrap();
        assert_eq!(config.paths.web_root_base, PathBuf::from("/srv/www"));
        assert_eq!(
            config.paths.sites_enabled,
            PathBuf::from("/etc/nginx/sites-enabled")
        );
        assert!(config.privilege.escalation.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("sitekeep.toml"));

        let mut config = Config::default();
        config.web.user = "nginx".into();
        config.acme.email = Some("ops@example.com".into());
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.web.user, "nginx");
        assert_eq!(loaded.acme.email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitekeep.toml");
        fs::write(&path, "[paths\n").unwrap();

        assert!(matches!(
            ConfigStore::new(path).load(),
            Err(ConfigError::ParseError(_))
        ));
    }
}
