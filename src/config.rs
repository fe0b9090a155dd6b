/// Configuration management for ratecard-patch
///
/// The configuration lives in ~/.ratecard-patch/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_CONTEXT_LINES: usize = 10;
const MAX_BACKUPS_LIMIT: usize = 500;

/// ratecard-patch configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// File to patch when none is given on the command line
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Copy the target aside before overwriting it
    #[serde(default = "default_backup_enabled")]
    pub enabled: bool,

    /// Number of backups kept before the oldest are pruned
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Custom backup directory
    #[serde(default)]
    pub backup_dir: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backups: 20,
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Context lines around each diff hunk
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { context_lines: 2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule names to skip
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write a debug log under ~/.ratecard-patch/
    #[serde(default)]
    pub debug: bool,
}

// Default functions for serde
fn default_backup_enabled() -> bool { true }
fn default_max_backups() -> usize { 20 }
fn default_context_lines() -> usize { 2 }

/// ~/.ratecard-patch, created on demand
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".ratecard-patch");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn get_default_config_content() -> &'static str {
    r#"# ratecard-patch configuration
#
# Command-line flags override everything here.

[target]
# File to patch when none is passed on the command line.
# Relative paths resolve against the current directory.
#path = "src/components/pricing/RateCardManager.tsx"

[backup]
# Copy the target into ~/.ratecard-patch/backups/ before overwriting it
enabled = true

# Oldest backups beyond this count are removed (1-500)
max_backups = 20

# Custom backup directory (optional)
#backup_dir = "/mnt/backups/ratecard-patch"

[output]
# Lines of context around each change in the diff (max 10)
context_lines = 2

[rules]
# Rule names to skip, see 'ratecard-patch rules'
disabled = []

[logging]
# Write a debug log to ~/.ratecard-patch/ratecard-patch.log
debug = false
"#
}

/// Write the commented default configuration to `path`
pub fn save_default_config_to(path: &Path) -> Result<()> {
    fs::write(path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", path.display()))
}

/// Load configuration from `path`
///
/// A missing file is created with defaults. A malformed file is replaced with
/// defaults, and the defaults are returned.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        save_default_config_to(path)?;
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed config, restoring defaults");
            eprintln!(
                "Warning: {} was malformed and has been reset to defaults",
                path.display()
            );
            save_default_config_to(path)?;
            return Ok(Config::default());
        }
    };

    validate_config(&config)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    Ok(config)
}

/// Load the user configuration from ~/.ratecard-patch/config.toml
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file_path()?)
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if config.backup.max_backups == 0 || config.backup.max_backups > MAX_BACKUPS_LIMIT {
        anyhow::bail!(
            "Invalid max_backups: {} (must be 1-{})",
            config.backup.max_backups,
            MAX_BACKUPS_LIMIT
        );
    }

    if config.output.context_lines > MAX_CONTEXT_LINES {
        anyhow::bail!(
            "Invalid context_lines: {} (max {})",
            config.output.context_lines,
            MAX_CONTEXT_LINES
        );
    }

    if let Some(path) = &config.target.path {
        if path.trim().is_empty() {
            anyhow::bail!("Invalid target path: must not be empty");
        }
    }

    for name in &config.rules.disabled {
        if !crate::rules::builtin_rules().iter().any(|r| r.name == name) {
            anyhow::bail!("Unknown rule in [rules] disabled: '{}'", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backup.enabled);
        assert_eq!(config.backup.max_backups, 20);
        assert_eq!(config.backup.backup_dir, None);
        assert_eq!(config.output.context_lines, 2);
        assert!(config.rules.disabled.is_empty());
        assert!(!config.logging.debug);
        assert_eq!(config.target.path, None);
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config: Config = toml::from_str(get_default_config_content()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_config_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_context() {
        let mut config = Config::default();
        config.output.context_lines = 11;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_max_backups() {
        let mut config = Config::default();
        config.backup.max_backups = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_unknown_rule() {
        let mut config = Config::default();
        config.rules.disabled = vec!["rename-nothing".to_string()];
        assert!(validate_config(&config).is_err());

        config.rules.disabled = vec!["rename-name".to_string()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_config_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = load_config_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[target]\npath = \"web/RateCardManager.tsx\"\n").unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.target.path.as_deref(), Some("web/RateCardManager.tsx"));
        assert_eq!(config.backup.max_backups, 20);
        assert_eq!(config.output.context_lines, 2);
    }

    #[test]
    fn test_load_config_resets_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[backup\nenabled = ").unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), get_default_config_content());
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[output]\ncontext_lines = 50\n").unwrap();

        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[backup]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[rules]"));
    }
}
