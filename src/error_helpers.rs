//! Error helper functions for creating actionable error messages

use std::io;
use std::path::Path;

/// Check if an IO error is a permission denied error
pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

/// Check if an IO error is a "not found" error
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Message for a target that cannot be read or written
pub fn permission_error(path: &Path, operation: &str) -> String {
    let parent_dir = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Ensure the directory is writable (the file is replaced via a temp file): chmod u+w '{}'\n\
         3. Run from a checkout you own",
        operation,
        path.display(),
        path.display(),
        parent_dir
    )
}

/// Message for a missing migration target
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Run from the project root so the default path resolves\n\
         2. Pass the file explicitly: ratecard-patch path/to/RateCardManager.tsx\n\
         3. Set [target] path in the config file (ratecard-patch config --path)",
        path.display(),
        context
    )
}

/// Message for a target that is not valid UTF-8
pub fn encoding_error(path: &Path) -> String {
    format!(
        "File is not valid UTF-8: '{}'\n\n\
         The file was not modified. Convert it to UTF-8 and run again.",
        path.display()
    )
}

/// Message for a backup directory that cannot be created
pub fn dir_create_error(path: &Path, underlying_err: &io::Error) -> String {
    let base = format!("Failed to create directory: '{}'", path.display());
    let parent = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    if is_permission_denied(underlying_err) {
        format!(
            "{}\n\n\
             Cause: Permission denied\n\n\
             Possible fixes:\n\
             1. Check write permissions on '{}'\n\
             2. Use --backup-dir to pick another location\n\
             3. Skip the backup with --no-backup",
            base, parent
        )
    } else {
        format!("{}\n\nUnderlying error: {}", base, underlying_err)
    }
}
