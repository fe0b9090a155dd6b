use anyhow::{Context, Result};
use ratecard_patch::cli::{Args, PatchArgs, parse_args};
use ratecard_patch::config::{self, Config};
use ratecard_patch::diff_formatter::DiffFormatter;
use ratecard_patch::{
    BackupManager, DEFAULT_TARGET, PatchOutcome, Patcher, RuleSet, builtin_rules, logger,
};
use std::fs;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = config::load_config()?;

    if let Some(log_path) = logger::init_debug_logging(config.logging.debug)? {
        tracing::debug!(path = %log_path.display(), "debug logging enabled");
    }

    match args {
        Args::Patch(patch_args) => run_patch(&patch_args, &config)?,
        Args::Rules => {
            print!("{}", DiffFormatter::format_rules(builtin_rules()));
        }
        Args::History { backup_dir } => show_history(backup_dir, &config)?,
        Args::Config { path_only } => show_config(path_only)?,
    }

    Ok(())
}

fn run_patch(args: &PatchArgs, config: &Config) -> Result<()> {
    let target = PathBuf::from(
        args.file
            .clone()
            .or_else(|| config.target.path.clone())
            .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
    );
    let context = args.context.unwrap_or(config.output.context_lines);
    tracing::info!(target = %target.display(), dry_run = args.dry_run, "patch requested");

    let patcher = Patcher::new(RuleSet::without(&config.rules.disabled)?);
    let preview = patcher.preview(&target)?;

    if args.dry_run {
        print!("{}", DiffFormatter::format_dry_run_header(&target));
        print!("{}", DiffFormatter::format_diff(&target, &preview, context));
        println!();
        print!("{}", DiffFormatter::format_report(&preview));
        return check_strict(args, &preview);
    }

    check_strict(args, &preview)?;

    if !preview.changed() {
        print!("{}", DiffFormatter::format_report(&preview));
        println!("\nNothing to change. {} was left untouched.", target.display());
        return Ok(());
    }

    let backups = if args.no_backup || !config.backup.enabled {
        tracing::warn!(target = %target.display(), "overwriting without backup");
        None
    } else {
        Some(
            backup_manager(args.backup_dir.clone(), config)?
                .with_max_backups(config.backup.max_backups),
        )
    };

    let (outcome, backup_id) = patcher.apply_with_backup(&target, backups.as_ref())?;

    print!("{}", DiffFormatter::format_diff(&target, &outcome, context));
    println!();
    print!("{}", DiffFormatter::format_report(&outcome));

    if let Some(id) = backup_id {
        println!("\nBackup ID: {}", id);
    }

    Ok(())
}

fn check_strict(args: &PatchArgs, outcome: &PatchOutcome) -> Result<()> {
    if !args.strict {
        return Ok(());
    }

    outcome
        .ensure_all_fired()
        .context("--strict: the file was not modified")
}

fn backup_manager(cli_dir: Option<String>, config: &Config) -> Result<BackupManager> {
    match cli_dir.or_else(|| config.backup.backup_dir.clone()) {
        Some(dir) => BackupManager::with_directory(dir),
        None => BackupManager::new(),
    }
}

fn show_history(backup_dir: Option<String>, config: &Config) -> Result<()> {
    let manager = backup_manager(backup_dir, config)?;
    let backups = manager.list_backups()?;

    print!("{}", DiffFormatter::format_history(backups));
    Ok(())
}

fn show_config(path_only: bool) -> Result<()> {
    let config_path = config::config_file_path()?;

    if path_only {
        println!("{}", config_path.display());
        return Ok(());
    }

    // load_config() has already created the file if it was missing
    let content = fs::read_to_string(&config_path)?;
    println!("# {}\n", config_path.display());
    print!("{}", content);
    Ok(())
}
