use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::info;

use crate::infrastructure::{backup, clock};

use super::{LifecycleError, Toolkit};

pub struct ArchiveResult {
    pub dir: PathBuf,
    pub files: usize,
}

/// Use case: copy the registry and every project mirror into
/// `backups/<stamp>/`.
pub struct ArchiveProject<'a> {
    kit: Toolkit<'a>,
}

impl<'a> ArchiveProject<'a> {
    pub fn new(kit: Toolkit<'a>) -> Self {
        Self { kit }
    }

    pub fn execute(&self) -> Result<ArchiveResult, LifecycleError> {
        self.execute_at(clock::now())
    }

    /// Archive under the stamp of `at`; a second archive within the same
    /// second gets a `.N` suffix.
    pub fn execute_at(&self, at: OffsetDateTime) -> Result<ArchiveResult, LifecycleError> {
        let paths = self.kit.paths;
        let dir = backup::unused_path(&paths.backups_dir, &clock::backup_stamp(at));
        let mut files = 0;

        fs::create_dir_all(&dir).map_err(|e| LifecycleError::io(&dir, e))?;
        if paths.registry_file.is_file() {
            let dest = dir.join("sites.json");
            fs::copy(&paths.registry_file, &dest).map_err(|e| LifecycleError::io(&dest, e))?;
            files += 1;
        }

        for (category, source) in [
            ("sites", &paths.mirror_sites_dir),
            ("main", &paths.mirror_main_dir),
            ("modules", &paths.mirror_modules_dir),
        ] {
            files += copy_confs(source, &dir.join(category))?;
        }

        info!(dir = %dir.display(), files, "Project archived");
        Ok(ArchiveResult { dir, files })
    }
}

fn copy_confs(source: &Path, dest: &Path) -> Result<usize, LifecycleError> {
    let Ok(entries) = fs::read_dir(source) else {
        return Ok(0);
    };
    fs::create_dir_all(dest).map_err(|e| LifecycleError::io(dest, e))?;

    let mut copied = 0;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "conf") {
            let target = dest.join(entry.file_name());
            fs::copy(&path, &target).map_err(|e| LifecycleError::io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_confs_skips_non_conf() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("example.com.conf"), "server {}").unwrap();
        fs::write(source.join("README"), "").unwrap();

        let dest = dir.path().join("out");
        assert_eq!(copy_confs(&source, &dest).unwrap(), 1);
        assert!(dest.join("example.com.conf").is_file());
        assert_eq!(copy_confs(&dir.path().join("none"), &dest).unwrap(), 0);
    }
}
