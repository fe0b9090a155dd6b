use crate::error_helpers;
use crate::rules::RuleHit;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_MAX_BACKUPS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub target: PathBuf,
    pub files: Vec<FileBackup>,
    #[serde(default)]
    pub hits: Vec<RuleHit>,
    /// Directory the metadata was read from
    #[serde(skip)]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
}

pub struct BackupManager {
    backups_dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    pub fn new() -> Result<Self> {
        let backups_dir = crate::config::config_dir()?.join("backups");
        Self::with_directory(backups_dir)
    }

    /// Create a BackupManager with a custom backup directory
    pub fn with_directory(dir: impl Into<PathBuf>) -> Result<Self> {
        let backups_dir = dir.into();

        fs::create_dir_all(&backups_dir)
            .map_err(|e| anyhow::anyhow!(error_helpers::dir_create_error(&backups_dir, &e)))?;

        Ok(Self {
            backups_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
        })
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Copy `target` into a fresh backup directory and record the run
    ///
    /// Pruning old backups afterwards is best effort: a failure there is logged
    /// and the new backup id is still returned.
    pub fn create_backup(&self, target: &Path, hits: &[RuleHit]) -> Result<String> {
        // Millisecond timestamp first so ids sort chronologically
        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S%3f"),
            Uuid::new_v4().to_string().split_at(8).0
        );
        let backup_dir = self.backups_dir.join(&id);

        if !target.is_file() {
            anyhow::bail!("Cannot back up {}: not a file", target.display());
        }

        fs::create_dir_all(&backup_dir)
            .map_err(|e| anyhow::anyhow!(error_helpers::dir_create_error(&backup_dir, &e)))?;

        let file_name = target
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", target.display()))?;
        let backup_path = backup_dir.join(file_name);

        fs::copy(target, &backup_path)
            .with_context(|| format!("Failed to backup file: {}", target.display()))?;

        let original_path = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());

        let metadata = BackupMetadata {
            id: id.clone(),
            timestamp: Utc::now(),
            target: target.to_path_buf(),
            files: vec![FileBackup {
                original_path,
                backup_path,
            }],
            hits: hits.to_vec(),
            dir: backup_dir.clone(),
        };

        let metadata_path = backup_dir.join("operation.json");
        let metadata_json =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;

        fs::write(&metadata_path, metadata_json)
            .with_context(|| format!("Failed to write metadata: {}", metadata_path.display()))?;

        tracing::info!(id = %id, dir = %backup_dir.display(), "backup created");

        match self.prune_backups(self.max_backups) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "old backups pruned"),
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "failed to prune old backups"),
        }

        Ok(id)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backups_dir).with_context(|| {
            format!(
                "Failed to read backups directory: {}",
                self.backups_dir.display()
            )
        })? {
            let entry = entry?;
            let metadata_path = entry.path().join("operation.json");

            if !metadata_path.exists() {
                continue;
            }

            let metadata_json = fs::read_to_string(&metadata_path)?;
            match serde_json::from_str::<BackupMetadata>(&metadata_json) {
                Ok(mut metadata) => {
                    metadata.dir = entry.path();
                    backups.push(metadata);
                }
                Err(e) => {
                    tracing::warn!(path = %metadata_path.display(), error = %e, "unreadable backup metadata");
                }
            }
        }

        // Equal timestamps fall back to id order
        backups.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(backups)
    }

    /// Remove all but the `keep_count` most recent backups
    pub fn prune_backups(&self, keep_count: usize) -> Result<usize> {
        let backups = self.list_backups()?;

        if backups.len() <= keep_count {
            return Ok(0);
        }

        let to_remove = backups.len() - keep_count;
        for backup in backups.iter().take(to_remove) {
            fs::remove_dir_all(&backup.dir)
                .with_context(|| format!("Failed to remove backup: {}", backup.dir.display()))?;
        }

        Ok(to_remove)
    }
}
