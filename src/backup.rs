//! Copy-based backup and restore for .gjf files.
//!
//! Before a file is overwritten with edited content, a timestamped copy is
//! placed in the backup directory:
//!
//! ```text
//! backups/benzene_20260829_142501.gjf.bak
//! ```
//!
//! Backups are plain file copies; restoring one to a fresh path yields
//! content byte-identical to the source at backup time. The subsystem also
//! lists backups per original file, resolves the most recent one, and can
//! prune old copies down to the N most recent.

use chrono::Local;
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from backup operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The file to back up or restore does not exist
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    /// I/O error during copy or directory access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for backup operation results
type Result<T> = std::result::Result<T, BackupError>;

/// Summary of the backup directory contents.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    /// The backup directory
    pub backup_dir: PathBuf,
    /// Total number of backup files
    pub total_backups: usize,
    /// Number of backups per original file stem
    pub backups_by_file: HashMap<String, usize>,
    /// Combined size of all backups in bytes
    pub disk_usage_bytes: u64,
}

/// Copy-based backup store rooted at one directory.
pub struct BackupSystem {
    backup_dir: PathBuf,
}

impl BackupSystem {
    /// Opens (creating if needed) a backup store at `backup_dir`.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir)?;
        Ok(Self { backup_dir })
    }

    /// Returns the backup directory.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copies a .gjf file into the store under a timestamped name.
    ///
    /// The backup is named `<stem>_<YYYYMMDD_HHMMSS>.gjf.bak`. Two backups
    /// of the same file within the same second share a name and the later
    /// one wins; callers that need every revision should not save more
    /// than once per second.
    pub fn create_backup(&self, gjf_path: &Path) -> Result<PathBuf> {
        if !gjf_path.exists() {
            return Err(BackupError::NotFound(gjf_path.to_path_buf()));
        }

        let stem = gjf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup_path = self
            .backup_dir
            .join(format!("{}_{}.gjf.bak", stem, timestamp));

        fs::copy(gjf_path, &backup_path)?;
        info!(
            "Created backup {} for {}",
            backup_path.display(),
            gjf_path.display()
        );

        Ok(backup_path)
    }

    /// Lists backup files, optionally restricted to names containing
    /// `original_name`. Sorted by file name, which orders same-stem
    /// backups chronologically thanks to the timestamp suffix.
    pub fn backup_files(&self, original_name: Option<&str>) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Cannot read backup directory {}: {}",
                    self.backup_dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                match name {
                    Some(name) => {
                        name.ends_with(".gjf.bak")
                            && original_name.map_or(true, |orig| name.contains(orig))
                    }
                    None => false,
                }
            })
            .collect();

        backups.sort();
        backups
    }

    /// Returns the most recent backup for a given original file name.
    pub fn latest_backup(&self, original_name: &str) -> Option<PathBuf> {
        self.backup_files(Some(original_name)).pop()
    }

    /// Restores a backup to `target_path`.
    ///
    /// Returns `Ok(false)` without touching anything when the target
    /// already exists and `overwrite` is not set.
    pub fn restore_backup(
        &self,
        backup_path: &Path,
        target_path: &Path,
        overwrite: bool,
    ) -> Result<bool> {
        if !backup_path.exists() {
            return Err(BackupError::NotFound(backup_path.to_path_buf()));
        }

        if target_path.exists() && !overwrite {
            return Ok(false);
        }

        fs::copy(backup_path, target_path)?;
        info!(
            "Restored {} to {}",
            backup_path.display(),
            target_path.display()
        );
        Ok(true)
    }

    /// Deletes old backups, keeping only the `keep_last_n` most recently
    /// modified. Returns the removed paths.
    pub fn cleanup_old_backups(&self, keep_last_n: usize) -> Vec<PathBuf> {
        let all_backups = self.backup_files(None);
        if all_backups.len() <= keep_last_n {
            return Vec::new();
        }

        let mut by_mtime: Vec<PathBuf> = all_backups;
        by_mtime.sort_by_key(|path| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        let cutoff = by_mtime.len() - keep_last_n;
        let mut removed = Vec::new();

        for backup in by_mtime.into_iter().take(cutoff) {
            match fs::remove_file(&backup) {
                Ok(()) => removed.push(backup),
                Err(e) => warn!("Failed to remove backup {}: {}", backup.display(), e),
            }
        }

        if !removed.is_empty() {
            info!("Removed {} old backups", removed.len());
        }

        removed
    }

    /// Summarizes the backup directory: totals, per-file counts and disk
    /// usage.
    pub fn backup_info(&self) -> BackupInfo {
        let all_backups = self.backup_files(None);

        let mut backups_by_file: HashMap<String, usize> = HashMap::new();
        let mut disk_usage_bytes = 0u64;

        for backup in &all_backups {
            if let Ok(meta) = fs::metadata(backup) {
                disk_usage_bytes += meta.len();
            }

            // Strip ".gjf.bak" and the "_YYYYMMDD_HHMMSS" suffix to get
            // back the original stem; fall back to the whole name when the
            // pattern does not fit.
            let name = backup
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = name.strip_suffix(".gjf.bak").unwrap_or(&name);
            let original = match stem.char_indices().rev().nth(15) {
                Some((idx, '_')) => &stem[..idx],
                _ => stem,
            };

            *backups_by_file.entry(original.to_string()).or_insert(0) += 1;
        }

        BackupInfo {
            backup_dir: self.backup_dir.clone(),
            total_backups: all_backups.len(),
            backups_by_file,
            disk_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> BackupSystem {
        BackupSystem::new(dir.path().join("backups")).unwrap()
    }

    #[test]
    fn test_backup_of_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);
        let err = system
            .create_backup(&dir.path().join("missing.gjf"))
            .unwrap_err();
        assert!(matches!(err, BackupError::NotFound(_)));
    }

    #[test]
    fn test_backup_and_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);

        let original = dir.path().join("job.gjf");
        fs::write(&original, "#p opt freq\n\ntitle\n").unwrap();

        let backup = system.create_backup(&original).unwrap();
        assert!(backup.exists());

        let restored = dir.path().join("restored.gjf");
        assert!(system.restore_backup(&backup, &restored, false).unwrap());
        assert_eq!(
            fs::read(&restored).unwrap(),
            fs::read(&original).unwrap()
        );
    }

    #[test]
    fn test_restore_refuses_existing_target() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);

        let original = dir.path().join("job.gjf");
        fs::write(&original, "#p opt\n").unwrap();
        let backup = system.create_backup(&original).unwrap();

        fs::write(&original, "#p td=(nstates=5)\n").unwrap();
        assert!(!system.restore_backup(&backup, &original, false).unwrap());
        assert_eq!(fs::read_to_string(&original).unwrap(), "#p td=(nstates=5)\n");

        assert!(system.restore_backup(&backup, &original, true).unwrap());
        assert_eq!(fs::read_to_string(&original).unwrap(), "#p opt\n");
    }

    #[test]
    fn test_listing_filters_by_original_name() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);

        for name in [
            "benzene_20260101_010101.gjf.bak",
            "benzene_20260102_010101.gjf.bak",
            "phenol_20260101_010101.gjf.bak",
            "notes.txt",
        ] {
            fs::write(system.backup_dir().join(name), "x").unwrap();
        }

        assert_eq!(system.backup_files(None).len(), 3);
        assert_eq!(system.backup_files(Some("benzene")).len(), 2);

        let latest = system.latest_backup("benzene").unwrap();
        assert!(latest
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("20260102"));
    }

    #[test]
    fn test_cleanup_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);

        for i in 0..5 {
            let path = system
                .backup_dir()
                .join(format!("job_2026010{}_010101.gjf.bak", i));
            fs::write(&path, "x").unwrap();
        }

        let removed = system.cleanup_old_backups(2);
        assert_eq!(removed.len(), 3);
        assert_eq!(system.backup_files(None).len(), 2);

        assert!(system.cleanup_old_backups(10).is_empty());
    }

    #[test]
    fn test_backup_info_groups_by_original() {
        let dir = TempDir::new().unwrap();
        let system = store(&dir);

        for name in [
            "benzene_20260101_010101.gjf.bak",
            "benzene_20260102_010101.gjf.bak",
            "phenol_20260101_010101.gjf.bak",
        ] {
            fs::write(system.backup_dir().join(name), "abcd").unwrap();
        }

        let info = system.backup_info();
        assert_eq!(info.total_backups, 3);
        assert_eq!(info.backups_by_file.get("benzene"), Some(&2));
        assert_eq!(info.backups_by_file.get("phenol"), Some(&1));
        assert_eq!(info.disk_usage_bytes, 12);
    }
}
