use thiserror::Error;
use tracing::{info, warn};

use crate::infrastructure::config::NginxConfig;
use crate::infrastructure::exec::{Cmd, ExecError, Runner};

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Configuration test failed, reload refused")]
    Validation(SyntaxCheck),

    #[error("Service reload failed: {0}")]
    Service(#[from] ExecError),
}

/// Outcome of `nginx -t`. Only the exit status decides `passed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheck {
    pub passed: bool,
    pub detail: String,
}

/// The managed daemon: syntax gate plus service transitions.
pub struct NginxService<'a> {
    runner: Runner<'a>,
    binary: &'a str,
    service: &'a str,
}

impl<'a> NginxService<'a> {
    pub fn new(runner: Runner<'a>, config: &'a NginxConfig) -> Self {
        Self {
            runner,
            binary: &config.binary,
            service: &config.service,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.runner
            .run(&Cmd::new("which").arg(self.binary).allow_failure())
            .map(|o| o.success())
            .unwrap_or(false)
    }

    /// Run the server's own syntax checker.
    pub fn test_config(&self) -> SyntaxCheck {
        let cmd = Cmd::new(self.binary)
            .arg("-t")
            .describe("Testing nginx configuration")
            .elevated()
            .allow_failure();

        match self.runner.run(&cmd) {
            Ok(output) => {
                // nginx -t reports on stderr, success included
                let detail = if output.stderr.trim().is_empty() {
                    output.stdout.trim().to_string()
                } else {
                    output.stderr.trim().to_string()
                };
                if output.success() {
                    info!("Configuration test passed");
                } else {
                    warn!(status = output.status, "Configuration test failed");
                }
                SyntaxCheck {
                    passed: output.success(),
                    detail,
                }
            }
            Err(e) => {
                warn!(error = %e, "Configuration test could not run");
                SyntaxCheck {
                    passed: false,
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Reload the daemon, but only after the configuration passes the test.
    pub fn reload(&self) -> Result<(), ReloadError> {
        let check = self.test_config();
        if !check.passed {
            return Err(ReloadError::Validation(check));
        }

        self.systemctl("reload", "Reloading nginx")?;
        info!(service = self.service, "Service reloaded");
        Ok(())
    }

    pub fn start(&self) -> Result<(), ExecError> {
        self.systemctl("start", "Starting nginx")
    }

    pub fn stop(&self) -> Result<(), ExecError> {
        self.systemctl("stop", "Stopping nginx")
    }

    pub fn restart(&self) -> Result<(), ExecError> {
        self.systemctl("restart", "Restarting nginx")
    }

    /// Output of `systemctl status`, whatever its exit status.
    pub fn status(&self) -> Result<String, ExecError> {
        let output = self.runner.run(
            &Cmd::new("systemctl")
                .args(["status", self.service, "--no-pager"])
                .allow_failure(),
        )?;
        Ok(output.stdout)
    }

    /// `active`, `inactive`, `failed`, ... or `unknown` when systemctl is unavailable.
    pub fn active_state(&self) -> String {
        self.runner
            .run(
                &Cmd::new("systemctl")
                    .args(["is-active", self.service])
                    .allow_failure(),
            )
            .map(|o| o.stdout.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn systemctl(&self, action: &str, description: &str) -> Result<(), ExecError> {
        self.runner.run(
            &Cmd::new("systemctl")
                .args([action, self.service])
                .describe(description)
                .elevated(),
        )?;
        Ok(())
    }
}
