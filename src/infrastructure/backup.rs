use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{info, warn};

use super::clock;
use super::exec::{Cmd, ExecError, Runner};

/// Timestamped snapshots of live config files.
///
/// Snapshots are best-effort: when one cannot be taken the caller gets `None`
/// and must treat the coming write as non-restorable.
pub struct BackupManager<'a> {
    runner: Runner<'a>,
}

impl<'a> BackupManager<'a> {
    pub fn new(runner: Runner<'a>) -> Self {
        Self { runner }
    }

    /// Copy `live` into `backup_dir` as `<name>.backup.<YYYYMMDD_HHMMSS>`.
    /// Returns `None` when there is nothing to protect or the copy failed.
    pub fn snapshot(&self, live: &Path, backup_dir: &Path) -> Option<PathBuf> {
        self.snapshot_at(live, backup_dir, clock::now())
    }

    pub fn snapshot_at(
        &self,
        live: &Path,
        backup_dir: &Path,
        at: OffsetDateTime,
    ) -> Option<PathBuf> {
        if !live.exists() {
            return None;
        }

        if let Err(e) = fs::create_dir_all(backup_dir) {
            warn!(dir = %backup_dir.display(), error = %e, "Cannot create backup directory");
            return None;
        }

        let name = live
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        let stamped = format!("{}.backup.{}", name, clock::backup_stamp(at));
        let target = unused_path(backup_dir, &stamped);

        let copy = Cmd::new("cp")
            .path(live)
            .path(&target)
            .describe(format!("Backing up {}", name))
            .elevated();

        match self.runner.run(&copy) {
            Ok(_) => {
                info!(live = %live.display(), backup = %target.display(), "Snapshot taken");
                Some(target)
            }
            Err(e) => {
                warn!(
                    live = %live.display(),
                    error = %e,
                    "Snapshot failed; rollback will not be possible"
                );
                None
            }
        }
    }

    /// Copy a snapshot back over the live file. Returns `false` when there
    /// was no snapshot to restore.
    pub fn restore(&self, backup: Option<&Path>, live: &Path) -> Result<bool, ExecError> {
        let Some(backup) = backup.filter(|b| b.exists()) else {
            return Ok(false);
        };

        self.runner.run(
            &Cmd::new("cp")
                .path(backup)
                .path(live)
                .describe(format!("Rolling back {}", live.display()))
                .elevated(),
        )?;
        info!(live = %live.display(), backup = %backup.display(), "Restored snapshot");
        Ok(true)
    }
}

/// First of `name`, `name.1`, `name.2`, ... that does not exist yet, so a
/// snapshot never overwrites an earlier one taken in the same second.
pub(crate) fn unused_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{}.{}", name, n)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::exec::{CommandExecutor, CommandOutput};
    use std::io;
    use time::macros::datetime;

    /// Performs `cp` with std::fs, fails everything else.
    struct CopyOnly {
        fail: bool,
    }

    impl CommandExecutor for CopyOnly {
        fn spawn(&self, argv: &[String], _stdin: Option<&str>) -> io::Result<CommandOutput> {
            if self.fail || argv[0] != "cp" {
                return Ok(CommandOutput {
                    status: 1,
                    ..Default::default()
                });
            }
            fs::copy(&argv[1], &argv[2])?;
            Ok(CommandOutput::default())
        }
    }

    #[test]
    fn test_snapshot_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let exec = CopyOnly { fail: false };
        let manager = BackupManager::new(Runner::new(&exec, &[]));

        let backup = manager.snapshot(&dir.path().join("absent"), &dir.path().join("backups"));
        assert!(backup.is_none());
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_snapshot_names_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("example.com");
        fs::write(&live, "v1").unwrap();
        let exec = CopyOnly { fail: false };
        let manager = BackupManager::new(Runner::new(&exec, &[]));
        let at = datetime!(2024-06-01 10:20:30 UTC);
        let backups = dir.path().join("backups");

        let first = manager.snapshot_at(&live, &backups, at).unwrap();
        assert_eq!(first, backups.join("example.com.backup.20240601_102030"));

        fs::write(&live, "v2").unwrap();
        let second = manager.snapshot_at(&live, &backups, at).unwrap();
        assert_eq!(second, backups.join("example.com.backup.20240601_102030.1"));

        assert_eq!(fs::read_to_string(&first).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&second).unwrap(), "v2");
    }

    #[test]
    fn test_failed_copy_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("nginx.conf");
        fs::write(&live, "events {}").unwrap();
        let exec = CopyOnly { fail: true };
        let manager = BackupManager::new(Runner::new(&exec, &[]));

        assert!(manager.snapshot(&live, &dir.path().join("b")).is_none());
    }

    #[test]
    fn test_restore_copies_back() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("site");
        fs::write(&live, "good").unwrap();
        let exec = CopyOnly { fail: false };
        let manager = BackupManager::new(Runner::new(&exec, &[]));

        let backup = manager.snapshot(&live, &dir.path().join("b")).unwrap();
        fs::write(&live, "broken").unwrap();

        assert!(manager.restore(Some(&backup), &live).unwrap());
        assert_eq!(fs::read_to_string(&live).unwrap(), "good");

        assert!(!manager.restore(None, &live).unwrap());
        assert!(!manager.restore(Some(&dir.path().join("gone")), &live).unwrap());
    }
}
