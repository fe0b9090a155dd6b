use crate::backup_manager::BackupManager;
use crate::error_helpers;
use crate::rules::{PatchOutcome, RuleSet};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Default target, relative to the project root the tool is run from
pub const DEFAULT_TARGET: &str = "src/components/pricing/RateCardManager.tsx";

pub struct Patcher {
    rules: RuleSet,
}

impl Patcher {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Run the rules over the file content without touching the file
    pub fn preview(&self, file_path: &Path) -> Result<PatchOutcome> {
        let content = read_target(file_path)?;
        let outcome = self.rules.apply(&content);
        tracing::info!(
            path = %file_path.display(),
            matches = outcome.total_matches(),
            "previewed"
        );
        Ok(outcome)
    }

    /// Run the rules and overwrite the file if anything changed
    pub fn apply_to_file(&self, file_path: &Path) -> Result<PatchOutcome> {
        let (outcome, _) = self.apply_with_backup(file_path, None)?;
        Ok(outcome)
    }

    /// Like `apply_to_file`, copying the file into `backups` first
    ///
    /// No backup is taken when the rules change nothing. Returns the backup id
    /// alongside the outcome.
    pub fn apply_with_backup(
        &self,
        file_path: &Path,
        backups: Option<&BackupManager>,
    ) -> Result<(PatchOutcome, Option<String>)> {
        let content = read_target(file_path)?;
        let outcome = self.rules.apply(&content);
        let mut backup_id = None;

        if outcome.changed() {
            if let Some(manager) = backups {
                backup_id = Some(manager.create_backup(file_path, &outcome.hits)?);
            }
            write_atomic(file_path, &outcome.patched)?;
            tracing::info!(
                path = %file_path.display(),
                matches = outcome.total_matches(),
                "file rewritten"
            );
        } else {
            tracing::info!(path = %file_path.display(), "nothing to change, file left untouched");
        }

        Ok((outcome, backup_id))
    }
}

fn read_target(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(e) if error_helpers::is_not_found(&e) => Err(anyhow::anyhow!(
            error_helpers::not_found_error(file_path, "reading the migration target")
        )),
        Err(e) if error_helpers::is_permission_denied(&e) => Err(anyhow::anyhow!(
            error_helpers::permission_error(file_path, "reading")
        )),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(anyhow::anyhow!(
            error_helpers::encoding_error(file_path)
        )),
        Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", file_path.display())),
    }
}

/// Write through a temp file in the same directory, then rename over the target
fn write_atomic(file_path: &Path, content: &str) -> Result<()> {
    let parent_dir = match file_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let original_permissions = fs::metadata(file_path).map(|m| m.permissions()).ok();

    let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| {
        if error_helpers::is_permission_denied(&e) {
            anyhow::anyhow!(error_helpers::permission_error(parent_dir, "writing to"))
        } else {
            anyhow::Error::new(e)
                .context(format!("Failed to create temp file in {}", parent_dir.display()))
        }
    })?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temp file for {}", file_path.display()))?;
    temp_file.flush()?;

    if let Some(perms) = original_permissions {
        fs::set_permissions(temp_file.path(), perms).with_context(|| {
            format!("Failed to copy permissions of {}", file_path.display())
        })?;
    }

    temp_file
        .persist(file_path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace file: {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patcher() -> Patcher {
        Patcher::new(RuleSet::builtin().unwrap())
    }

    #[test]
    fn test_preview_does_not_modify_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "<h3>{template.name}</h3>\n").unwrap();

        let outcome = patcher().preview(&path).unwrap();

        assert!(outcome.changed());
        assert_eq!(outcome.patched, "<h3>{template.template_name}</h3>\n");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<h3>{template.name}</h3>\n"
        );
    }

    #[test]
    fn test_apply_writes_patched_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(
            &path,
            "R{template.default_rate.toFixed(2)}\n{template.matter_types.map(m => m)}\n",
        )
        .unwrap();

        let outcome = patcher().apply_to_file(&path).unwrap();

        assert_eq!(outcome.total_matches(), 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "R{template.default_hourly_rate.toFixed(2)}\n{template.matter_types?.map(m => m)}\n"
        );
    }

    #[test]
    fn test_apply_twice_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "{template.category} {template.description}\n").unwrap();

        let first = patcher().apply_to_file(&path).unwrap();
        let after_first = fs::read_to_string(&path).unwrap();
        let second = patcher().apply_to_file(&path).unwrap();

        assert!(first.changed());
        assert!(!second.changed());
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn test_unchanged_file_keeps_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "{template.template_name} {template.matter_types?.map(m => m)}\n").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        // coarse filesystem timestamps would hide a rewrite otherwise
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let outcome = patcher().apply_to_file(&path).unwrap();

        assert!(!outcome.changed());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_apply_with_backup_copies_original() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "{template.name}\n").unwrap();
        let manager = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();

        let (outcome, backup_id) = patcher().apply_with_backup(&path, Some(&manager)).unwrap();

        assert!(outcome.changed());
        let backup_id = backup_id.unwrap();
        let copy = manager.backups_dir().join(&backup_id).join("RateCardManager.tsx");
        assert_eq!(fs::read_to_string(copy).unwrap(), "{template.name}\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "{template.template_name}\n");
    }

    #[test]
    fn test_apply_with_backup_skips_backup_when_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "{template.template_name}\n").unwrap();
        let manager = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();

        let (outcome, backup_id) = patcher().apply_with_backup(&path, Some(&manager)).unwrap();

        assert!(!outcome.changed());
        assert_eq!(backup_id, None);
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_reports_actionable_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.tsx");

        let err = patcher().apply_to_file(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("File not found"));
        assert!(msg.contains("missing.tsx"));
    }

    #[test]
    fn test_invalid_utf8_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("binary.tsx");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let err = patcher().apply_to_file(&path).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
        assert_eq!(fs::read(&path).unwrap(), vec![0xff, 0xfe, 0x00, 0x41]);
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("RateCardManager.tsx");
        fs::write(&path, "{template.name}").unwrap();

        patcher().apply_to_file(&path).unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
