use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ratecard-patch")]
#[command(about = "Migrate the rate card manager component to the new template fields")]
#[command(long_about = "ratecard-patch rewrites the rate card manager React component in place.

It applies a fixed list of eight regex substitutions, in order:
  1-4  rename template.name, template.description, template.category and
       template.default_rate to their new column names
  5    make template.matter_types.map null-safe (template.matter_types?.map)
  6-8  remove the Matter Type and Estimated Hours (Min/Max) form fields

The field removals only match the component's exact original layout. Each run
reports how many replacements every rule made, so a rule that no longer matches
is visible. Re-running over an already migrated file changes nothing.

With no FILE, the path from the config file is used, and failing that
src/components/pricing/RateCardManager.tsx in the current directory.

EXAMPLES:
  ratecard-patch                          Patch the default file
  ratecard-patch --dry-run                Show the diff, write nothing
  ratecard-patch web/RateCardManager.tsx  Patch a specific file
  ratecard-patch --strict                 Fail if any rule matched nothing
  ratecard-patch rules                    List the rules")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// File to patch
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Preview changes without applying them
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Number of context lines to show around changes
    #[arg(short = 'n', long, value_name = "NUM")]
    context: Option<usize>,

    /// Show only changed lines (same as --context=0)
    #[arg(long = "no-context", conflicts_with = "context")]
    no_context: bool,

    /// Do not copy the file aside before overwriting it
    #[arg(long = "no-backup")]
    no_backup: bool,

    /// Custom backup directory
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<String>,

    /// Exit with an error when any rule matched nothing
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rules in the order they are applied
    Rules,

    /// Show stored backups
    #[command(long_about = "List the backups taken before each run, most recent first.

Backups are plain copies under ~/.ratecard-patch/backups/<ID>/. Copy one back
by hand to undo a run.")]
    History {
        /// Custom backup directory
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<String>,
    },

    /// Show the configuration file
    Config {
        /// Print the configuration file content (the default)
        #[arg(long = "show", conflicts_with = "path")]
        show: bool,

        /// Print only the path of the configuration file
        #[arg(long = "path")]
        path: bool,
    },
}

pub fn parse_args() -> Result<Args> {
    let cli = Cli::parse();
    Ok(resolve(cli))
}

fn resolve(cli: Cli) -> Args {
    match cli.command {
        Some(Commands::Rules) => Args::Rules,
        Some(Commands::History { backup_dir }) => Args::History {
            backup_dir: backup_dir.or(cli.backup_dir),
        },
        Some(Commands::Config { show, path }) => Args::Config {
            path_only: path && !show,
        },
        None => {
            // None means "use the configured default"
            let context = if cli.no_context { Some(0) } else { cli.context };

            Args::Patch(PatchArgs {
                file: cli.file,
                dry_run: cli.dry_run,
                context,
                no_backup: cli.no_backup,
                backup_dir: cli.backup_dir,
                strict: cli.strict,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchArgs {
    pub file: Option<String>,
    pub dry_run: bool,
    pub context: Option<usize>,
    pub no_backup: bool,
    pub backup_dir: Option<String>,
    pub strict: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Args {
    Patch(PatchArgs),
    Rules,
    History { backup_dir: Option<String> },
    Config { path_only: bool },
}
