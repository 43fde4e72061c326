//! acme.sh driver. Issuance itself is the external client's business; this
//! only sequences its commands.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::config::Config;
use super::exec::{Cmd, ExecError, Runner};
use crate::domain::DomainName;

const INSTALL_SCRIPT: &str = "curl https://get.acme.sh | sh";

#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("acme.sh is not installed at {0}")]
    NotInstalled(PathBuf),

    #[error("Cannot locate the acme.sh home directory")]
    NoHome,

    #[error("An account email is required to install acme.sh")]
    EmailRequired,

    #[error(transparent)]
    Exec(#[from] ExecError),
}

pub struct AcmeClient<'a> {
    runner: Runner<'a>,
    home: PathBuf,
    server: &'a str,
    reload_cmd: String,
}

impl<'a> AcmeClient<'a> {
    pub fn new(runner: Runner<'a>, config: &'a Config) -> Result<Self, AcmeError> {
        let home = config.acme_home().ok_or(AcmeError::NoHome)?;
        let reload_cmd = config
            .privilege
            .escalation
            .iter()
            .map(String::as_str)
            .chain(["systemctl", "reload", config.nginx.service.as_str()])
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            runner,
            home,
            server: &config.acme.server,
            reload_cmd,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn is_installed(&self) -> bool {
        self.script().is_file()
    }

    fn script(&self) -> PathBuf {
        self.home.join("acme.sh")
    }

    fn acme(&self) -> Cmd {
        Cmd::new(self.script().to_string_lossy().into_owned())
    }

    /// Install acme.sh, register the account and set up renewal.
    pub fn install(&self, email: &str) -> Result<(), AcmeError> {
        self.runner.run(
            &Cmd::new("bash")
                .args(["-c", INSTALL_SCRIPT])
                .describe("Installing acme.sh"),
        )?;
        self.runner.run(
            &self
                .acme()
                .args(["--register-account", "-m", email])
                .describe("Registering ACME account"),
        )?;
        self.runner.run(
            &self
                .acme()
                .args(["--set-default-ca", "--server", self.server])
                .describe("Setting default CA"),
        )?;
        self.runner.run(
            &self
                .acme()
                .args(["--upgrade", "--auto-upgrade"])
                .describe("Enabling acme.sh auto-upgrade"),
        )?;
        self.runner.run(
            &self
                .acme()
                .arg("--install-cronjob")
                .describe("Installing renewal cron job"),
        )?;
        info!(home = %self.home.display(), "acme.sh installed");
        Ok(())
    }

    /// Webroot-mode issuance; the challenge files land under `webroot`.
    pub fn issue(&self, domain: &DomainName, webroot: &Path) -> Result<(), AcmeError> {
        self.require_installed()?;
        self.runner.run(
            &self
                .acme()
                .args(["--issue", "-d", domain.as_str(), "--webroot"])
                .path(webroot)
                .describe(format!("Issuing certificate for {}", domain)),
        )?;
        Ok(())
    }

    pub fn install_cert(
        &self,
        domain: &DomainName,
        key_file: &Path,
        fullchain_file: &Path,
    ) -> Result<(), AcmeError> {
        self.require_installed()?;
        self.runner.run(
            &self
                .acme()
                .args(["--install-cert", "-d", domain.as_str(), "--key-file"])
                .path(key_file)
                .arg("--fullchain-file")
                .path(fullchain_file)
                .args(["--reloadcmd", self.reload_cmd.as_str()])
                .describe(format!("Installing certificate for {}", domain)),
        )?;
        Ok(())
    }

    pub fn renew(&self, domain: &DomainName) -> Result<(), AcmeError> {
        self.require_installed()?;
        self.runner.run(
            &self
                .acme()
                .args(["--renew", "-d", domain.as_str()])
                .describe(format!("Renewing certificate for {}", domain)),
        )?;
        Ok(())
    }

    fn require_installed(&self) -> Result<(), AcmeError> {
        if self.is_installed() {
            Ok(())
        } else {
            Err(AcmeError::NotInstalled(self.home.clone()))
        }
    }
}
