//! ratecard-patch: one-shot migration of the rate card manager component
//!
//! This library exposes the rule table and the patcher for the binary and
//! for the property-based tests. The binary is at src/main.rs.

pub mod backup_manager;
pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod error_helpers;
pub mod logger;
pub mod patcher;
pub mod rules;

pub use backup_manager::{BackupManager, BackupMetadata, FileBackup};
pub use patcher::{DEFAULT_TARGET, Patcher};
pub use rules::{PatchOutcome, Rule, RuleHit, RuleKind, RuleSet, builtin_rules};
