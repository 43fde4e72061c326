//! The write → validate → rollback primitive shared by every operation that
//! changes a live config file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{LifecycleError, Rollback};
use crate::domain::DomainName;
use crate::infrastructure::backup::BackupManager;
use crate::infrastructure::exec::{Cmd, ExecError, Runner};
use crate::infrastructure::nginx::NginxService;
use crate::infrastructure::paths::SitekeepPaths;

/// A config artifact's two homes plus where its snapshots go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTarget {
    pub live: PathBuf,
    pub mirror: PathBuf,
    pub backup_dir: PathBuf,
}

impl ConfigTarget {
    pub fn site(paths: &SitekeepPaths, domain: &DomainName) -> Self {
        Self {
            live: paths.live_site_config(domain),
            mirror: paths.mirror_site_config(domain),
            backup_dir: paths.backup_dir("sites"),
        }
    }

    pub fn main(paths: &SitekeepPaths) -> Self {
        Self {
            live: paths.main_config.clone(),
            mirror: paths.mirror_main_config(),
            backup_dir: paths.backup_dir("main"),
        }
    }

    pub fn module(paths: &SitekeepPaths, name: &str) -> Self {
        Self {
            live: paths.live_module_config(name),
            mirror: paths.mirror_module_config(name),
            backup_dir: paths.backup_dir("modules"),
        }
    }
}

/// A change that has landed in both places and can still be undone.
#[derive(Debug)]
pub struct PendingWrite {
    target: ConfigTarget,
    backup: Option<PathBuf>,
    live_existed: bool,
    previous_mirror: Option<String>,
}

impl PendingWrite {
    pub fn target(&self) -> &ConfigTarget {
        &self.target
    }

    /// Snapshot of the live file taken before the change, if one exists.
    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }
}

pub struct ConfigWriter<'a> {
    runner: Runner<'a>,
    backups: BackupManager<'a>,
    nginx: NginxService<'a>,
}

impl<'a> ConfigWriter<'a> {
    pub fn new(runner: Runner<'a>, nginx: NginxService<'a>) -> Self {
        Self {
            runner,
            backups: BackupManager::new(runner),
            nginx,
        }
    }

    /// Snapshot the live file, then write `content` to the mirror and the
    /// live path. A failed live write is undone before returning.
    pub fn write(
        &self,
        target: ConfigTarget,
        content: &str,
    ) -> Result<PendingWrite, LifecycleError> {
        let pending = self.prepare(target);

        if let Some(dir) = pending.target.mirror.parent() {
            fs::create_dir_all(dir).map_err(|e| LifecycleError::io(dir, e))?;
        }
        fs::write(&pending.target.mirror, content)
            .map_err(|e| LifecycleError::io(&pending.target.mirror, e))?;

        if let Err(e) = self.write_live(&pending.target.live, content) {
            let rollback = self.rollback(&pending);
            warn!(live = %pending.target.live.display(), %rollback, "Live write failed");
            return Err(e.into());
        }

        info!(
            live = %pending.target.live.display(),
            mirror = %pending.target.mirror.display(),
            "Configuration written"
        );
        Ok(pending)
    }

    /// [`write`](Self::write), then gate on the syntax check. On failure the
    /// change is rolled back and `ValidationFailed` returned.
    pub fn apply(
        &self,
        target: ConfigTarget,
        content: &str,
    ) -> Result<PendingWrite, LifecycleError> {
        let pending = self.write(target, content)?;
        self.validate(pending)
    }

    /// Snapshot the live file, then remove it and its mirror, gated on the
    /// syntax check like [`apply`](Self::apply).
    pub fn remove(&self, target: ConfigTarget) -> Result<PendingWrite, LifecycleError> {
        let pending = self.prepare(target);

        self.runner.run(
            &Cmd::new("rm")
                .arg("-f")
                .path(&pending.target.live)
                .describe(format!("Removing {}", pending.target.live.display()))
                .elevated(),
        )?;
        remove_if_present(&pending.target.mirror)
            .map_err(|e| LifecycleError::io(&pending.target.mirror, e))?;

        self.validate(pending)
    }

    /// Put the live file and its mirror back the way they were.
    ///
    /// The mirror is only reverted when the live file was, so the two never
    /// disagree.
    pub fn rollback(&self, pending: &PendingWrite) -> Rollback {
        let live = &pending.target.live;
        let outcome = match (&pending.backup, pending.live_existed) {
            (Some(backup), _) => match self.backups.restore(Some(backup), live) {
                Ok(true) => Rollback::Restored,
                Ok(false) => Rollback::NotPossible,
                Err(e) => Rollback::Failed(e.to_string()),
            },
            (None, false) => match self.runner.run(
                &Cmd::new("rm")
                    .arg("-f")
                    .path(live)
                    .describe(format!("Rolling back: removing {}", live.display()))
                    .elevated(),
            ) {
                Ok(_) => Rollback::Removed,
                Err(e) => Rollback::Failed(e.to_string()),
            },
            (None, true) => Rollback::NotPossible,
        };

        if matches!(outcome, Rollback::Restored | Rollback::Removed) {
            let mirror = &pending.target.mirror;
            let reverted = match &pending.previous_mirror {
                Some(previous) => fs::write(mirror, previous),
                None => remove_if_present(mirror),
            };
            if let Err(e) = reverted {
                warn!(mirror = %mirror.display(), error = %e, "Could not revert project mirror");
            }
        }

        warn!(live = %live.display(), rollback = %outcome, "Rolled back");
        outcome
    }

    fn prepare(&self, target: ConfigTarget) -> PendingWrite {
        let live_existed = target.live.exists();
        let backup = self.backups.snapshot(&target.live, &target.backup_dir);
        if live_existed && backup.is_none() {
            warn!(live = %target.live.display(), "Proceeding without a snapshot");
        }
        let previous_mirror = fs::read_to_string(&target.mirror).ok();

        PendingWrite {
            target,
            backup,
            live_existed,
            previous_mirror,
        }
    }

    fn validate(&self, pending: PendingWrite) -> Result<PendingWrite, LifecycleError> {
        let check = self.nginx.test_config();
        if check.passed {
            return Ok(pending);
        }

        let rollback = self.rollback(&pending);
        Err(LifecycleError::ValidationFailed {
            detail: check.detail,
            rollback,
        })
    }

    fn write_live(&self, live: &Path, content: &str) -> Result<(), ExecError> {
        if let Some(dir) = live.parent().filter(|d| !d.exists()) {
            self.runner.run(
                &Cmd::new("mkdir")
                    .arg("-p")
                    .path(dir)
                    .describe(format!("Creating {}", dir.display()))
                    .elevated(),
            )?;
        }
        self.runner.write_privileged(live, content)
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::NginxConfig;
    use crate::infrastructure::exec::{CommandExecutor, CommandOutput};
    use std::cell::Cell;

    /// Applies cp/rm/mkdir/tee with std::fs; `nginx -t` answers with `nginx_status`.
    struct Sandbox {
        nginx_status: Cell<i32>,
        tee_status: i32,
    }

    impl Sandbox {
        fn new(nginx_status: i32) -> Self {
            Self {
                nginx_status: Cell::new(nginx_status),
                tee_status: 0,
            }
        }
    }

    impl CommandExecutor for Sandbox {
        fn spawn(&self, argv: &[String], stdin: Option<&str>) -> io::Result<CommandOutput> {
            let status = match argv[0].as_str() {
                "cp" => fs::copy(&argv[1], &argv[2]).map(|_| 0)?,
                "rm" => {
                    let _ = fs::remove_file(&argv[2]);
                    0
                }
                "mkdir" => fs::create_dir_all(&argv[2]).map(|_| 0)?,
                "tee" if self.tee_status == 0 => {
                    fs::write(&argv[1], stdin.unwrap_or_default())?;
                    0
                }
                "tee" => self.tee_status,
                "nginx" => self.nginx_status.get(),
                _ => 0,
            };
            Ok(CommandOutput {
                status,
                stdout: String::new(),
                stderr: if status == 0 { String::new() } else { "emerg".into() },
            })
        }
    }

    fn target(dir: &Path) -> ConfigTarget {
        ConfigTarget {
            live: dir.join("live").join("example.com"),
            mirror: dir.join("mirror").join("example.com.conf"),
            backup_dir: dir.join("backups"),
        }
    }

    fn writer<'a>(exec: &'a Sandbox, config: &'a NginxConfig) -> ConfigWriter<'a> {
        let runner = Runner::new(exec, &[]);
        ConfigWriter::new(runner, NginxService::new(runner, config))
    }

    #[test]
    fn test_apply_writes_both_copies() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Sandbox::new(0);
        let config = NginxConfig::default();
        let target = target(dir.path());

        let pending = writer(&exec, &config).apply(target.clone(), "server {}\n").unwrap();

        assert_eq!(fs::read_to_string(&target.live).unwrap(), "server {}\n");
        assert_eq!(fs::read_to_string(&target.mirror).unwrap(), "server {}\n");
        assert_eq!(pending.backup(), None);
    }

    #[test]
    fn test_failed_validation_restores_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Sandbox::new(0);
        let config = NginxConfig::default();
        let target = target(dir.path());
        let writer = writer(&exec, &config);
        writer.apply(target.clone(), "good\n").unwrap();

        exec.nginx_status.set(1);
        let err = writer.apply(target.clone(), "bad\n").unwrap_err();

        match err {
            LifecycleError::ValidationFailed { rollback, detail } => {
                assert_eq!(rollback, Rollback::Restored);
                assert_eq!(detail, "emerg");
            }
            other => panic!("unexpected: {other}"),
        }
        assert_eq!(fs::read_to_string(&target.live).unwrap(), "good\n");
        assert_eq!(fs::read_to_string(&target.mirror).unwrap(), "good\n");
        assert_eq!(fs::read_dir(&target.backup_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_validation_of_new_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Sandbox::new(1);
        let config = NginxConfig::default();
        let target = target(dir.path());

        let err = writer(&exec, &config).apply(target.clone(), "bad\n").unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::ValidationFailed { rollback: Rollback::Removed, .. }
        ));
        assert!(!target.live.exists());
        assert!(!target.mirror.exists());
    }

    #[test]
    fn test_failed_live_write_reverts_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Sandbox {
            nginx_status: Cell::new(0),
            tee_status: 1,
        };
        let config = NginxConfig::default();
        let target = target(dir.path());

        let err = writer(&exec, &config).write(target.clone(), "text\n").unwrap_err();

        assert!(matches!(err, LifecycleError::Exec(ExecError::WriteFailed { .. })));
        assert!(!target.mirror.exists());
    }

    #[test]
    fn test_remove_restores_on_failed_validation() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Sandbox::new(0);
        let config = NginxConfig::default();
        let target = target(dir.path());
        let writer = writer(&exec, &config);
        writer.apply(target.clone(), "gzip on;\n").unwrap();

        exec.nginx_status.set(1);
        assert!(writer.remove(target.clone()).is_err());
        assert_eq!(fs::read_to_string(&target.live).unwrap(), "gzip on;\n");
        assert_eq!(fs::read_to_string(&target.mirror).unwrap(), "gzip on;\n");

        exec.nginx_status.set(0);
        writer.remove(target.clone()).unwrap();
        assert!(!target.live.exists());
        assert!(!target.mirror.exists());
    }
}
