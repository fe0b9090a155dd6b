use crate::backup_manager::BackupMetadata;
use crate::rules::{PatchOutcome, Rule, RuleKind};
use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;
use std::path::Path;

pub struct DiffFormatter;

impl DiffFormatter {
    /// Auto-detect if we should use colors
    fn should_use_color() -> bool {
        // https://no-color.org/
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    /// Line diff of the outcome with `context_size` unchanged lines around each hunk
    pub fn format_diff(path: &Path, outcome: &PatchOutcome, context_size: usize) -> String {
        Self::render_diff(path, outcome, context_size, Self::should_use_color())
    }

    fn render_diff(path: &Path, outcome: &PatchOutcome, context_size: usize, use_color: bool) -> String {
        let mut output = String::new();
        let header = path.display().to_string();

        if use_color {
            output.push_str(&format!("{}\n", header.bold().cyan()));
        } else {
            output.push_str(&format!("{}\n", header));
        }

        if !outcome.changed() {
            output.push_str("No changes.\n");
            return output;
        }

        let diff = TextDiff::from_lines(outcome.original.as_str(), outcome.patched.as_str());
        let mut removed = 0usize;
        let mut added = 0usize;

        for (group_idx, group) in diff.grouped_ops(context_size).iter().enumerate() {
            if group_idx > 0 {
                if use_color {
                    output.push_str(&format!("{}\n", "...".dimmed()));
                } else {
                    output.push_str("...\n");
                }
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let content = change.value().trim_end_matches(['\n', '\r']);
                    let (indicator, line_num) = match change.tag() {
                        ChangeTag::Equal => ("=", change.old_index()),
                        ChangeTag::Delete => {
                            removed += 1;
                            ("-", change.old_index())
                        }
                        ChangeTag::Insert => {
                            added += 1;
                            ("+", change.new_index())
                        }
                    };
                    let line_num = line_num.map(|i| i + 1).unwrap_or(0);

                    if use_color {
                        let line = match change.tag() {
                            ChangeTag::Equal => format!("L{}: {} {}\n", line_num, indicator.dimmed(), content.dimmed()),
                            ChangeTag::Delete => format!("L{}: {} {}\n", line_num, indicator.red().bold(), content.red()),
                            ChangeTag::Insert => format!("L{}: {} {}\n", line_num, indicator.green().bold(), content.green().bold()),
                        };
                        output.push_str(&line);
                    } else {
                        output.push_str(&format!("L{}: {} {}\n", line_num, indicator, content));
                    }
                }
            }
        }

        if use_color {
            output.push_str(&format!(
                "\nLines: {} {}, {} {}\n",
                removed.to_string().bold(),
                "removed".red(),
                added.to_string().bold(),
                "added".green()
            ));
        } else {
            output.push_str(&format!("\nLines: {} removed, {} added\n", removed, added));
        }

        output
    }

    /// One status line per rule, then a summary
    pub fn format_report(outcome: &PatchOutcome) -> String {
        Self::render_report(outcome, Self::should_use_color())
    }

    fn render_report(outcome: &PatchOutcome, use_color: bool) -> String {
        let mut output = String::new();

        for hit in &outcome.hits {
            let line = if hit.fired() {
                let noun = if hit.matches == 1 { "replacement" } else { "replacements" };
                if use_color {
                    format!("{} {}: {} {}\n", "✓".green().bold(), hit.rule, hit.matches, noun)
                } else {
                    format!("✓ {}: {} {}\n", hit.rule, hit.matches, noun)
                }
            } else if use_color {
                format!("{} {}: {}\n", "·".dimmed(), hit.rule.dimmed(), "no match".dimmed())
            } else {
                format!("· {}: no match\n", hit.rule)
            };
            output.push_str(&line);
        }

        let fired = outcome.hits.iter().filter(|h| h.fired()).count();
        let total = outcome.total_matches();
        let summary = format!(
            "\nTotal: {} replacement{} from {} of {} rules\n",
            total,
            if total == 1 { "" } else { "s" },
            fired,
            outcome.hits.len()
        );
        if use_color {
            output.push_str(&summary.bold().to_string());
        } else {
            output.push_str(&summary);
        }

        let missed_blocks: Vec<&str> = outcome
            .missed()
            .filter(|h| h.kind == Some(RuleKind::RemoveBlock))
            .map(|h| h.rule.as_str())
            .collect();

        if !missed_blocks.is_empty() {
            let note = format!(
                "Note: {} field block{} did not match the expected layout and must be removed by hand: {}\n",
                missed_blocks.len(),
                if missed_blocks.len() == 1 { "" } else { "s" },
                missed_blocks.join(", ")
            );
            if use_color {
                output.push_str(&note.yellow().to_string());
            } else {
                output.push_str(&note);
            }
        }

        output
    }

    /// Table for the `rules` subcommand
    pub fn format_rules<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> String {
        let use_color = Self::should_use_color();
        let mut output = String::new();

        for (idx, rule) in rules.into_iter().enumerate() {
            if use_color {
                output.push_str(&format!(
                    "{}. {} [{}]\n   {}\n",
                    idx + 1,
                    rule.name.yellow(),
                    rule.kind.label().cyan(),
                    rule.summary
                ));
            } else {
                output.push_str(&format!(
                    "{}. {} [{}]\n   {}\n",
                    idx + 1,
                    rule.name,
                    rule.kind.label(),
                    rule.summary
                ));
            }
        }

        output
    }

    /// Listing for the `history` subcommand, most recent first
    pub fn format_history(backups: Vec<BackupMetadata>) -> String {
        Self::render_history(backups, Self::should_use_color())
    }

    fn render_history(backups: Vec<BackupMetadata>, use_color: bool) -> String {
        let mut output = String::new();

        if backups.is_empty() {
            output.push_str("No backup history found.\n");
            return output;
        }

        if use_color {
            output.push_str(&"Backup History:\n\n".bold().white().to_string());
        } else {
            output.push_str("Backup History:\n\n");
        }

        for backup in backups.into_iter().rev() {
            let matches: usize = backup.hits.iter().map(|h| h.matches).sum();
            if use_color {
                output.push_str(&format!("ID: {}\n", backup.id.yellow()));
            } else {
                output.push_str(&format!("ID: {}\n", backup.id));
            }
            output.push_str(&format!("  Time: {}\n", backup.timestamp.format("%Y-%m-%d %H:%M:%S")));
            output.push_str(&format!("  Target: {}\n", backup.target.display()));
            output.push_str(&format!("  Replacements: {}\n", matches));
            for file in &backup.files {
                output.push_str(&format!("  Copy: {}\n", file.backup_path.display()));
            }
            output.push('\n');
        }

        output
    }

    /// Header printed before a dry-run diff
    pub fn format_dry_run_header(path: &Path) -> String {
        if Self::should_use_color() {
            format!("{} {}\n\n", "🔍 Dry run:".bold().cyan(), path.display().to_string().white().bold())
        } else {
            format!("Dry run: {}\n\n", path.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleHit, RuleSet};
    use chrono::Utc;
    use std::path::PathBuf;

    fn outcome_for(text: &str) -> PatchOutcome {
        RuleSet::builtin().unwrap().apply(text)
    }

    #[test]
    fn test_render_diff_marks_changed_lines() {
        let outcome = outcome_for("one\n{template.name}\nthree\n");
        let out = DiffFormatter::render_diff(Path::new("a.tsx"), &outcome, 1, false);

        assert!(out.starts_with("a.tsx\n"));
        assert!(out.contains("L1: = one\n"));
        assert!(out.contains("L2: - {template.name}\n"));
        assert!(out.contains("L2: + {template.template_name}\n"));
        assert!(out.contains("L3: = three\n"));
        assert!(out.contains("Lines: 1 removed, 1 added"));
    }

    #[test]
    fn test_render_diff_zero_context_hides_unchanged() {
        let outcome = outcome_for("one\n{template.name}\nthree\n");
        let out = DiffFormatter::render_diff(Path::new("a.tsx"), &outcome, 0, false);

        assert!(!out.contains("one"));
        assert!(!out.contains("three"));
    }

    #[test]
    fn test_render_diff_separates_distant_hunks() {
        let mut text = String::from("{template.name}\n");
        for i in 0..20 {
            text.push_str(&format!("line {}\n", i));
        }
        text.push_str("{template.category}\n");

        let out = DiffFormatter::render_diff(Path::new("a.tsx"), &outcome_for(&text), 1, false);
        assert!(out.contains("...\n"));
        assert!(!out.contains("line 10"));
    }

    #[test]
    fn test_render_diff_no_changes() {
        let out = DiffFormatter::render_diff(Path::new("a.tsx"), &outcome_for("plain\n"), 2, false);
        assert!(out.contains("No changes."));
    }

    #[test]
    fn test_render_report_lists_every_rule() {
        let out = DiffFormatter::render_report(&outcome_for("{template.name} {template.name}"), false);

        assert!(out.contains("✓ rename-name: 2 replacements\n"));
        assert!(out.contains("· rename-description: no match\n"));
        assert!(out.contains("Total: 2 replacements from 1 of 8 rules"));
        assert!(out.contains("3 field blocks did not match"));
        assert!(out.contains("remove-matter-type-field"));
    }

    #[test]
    fn test_render_history_most_recent_first() {
        let make = |id: &str| BackupMetadata {
            id: id.to_string(),
            timestamp: Utc::now(),
            target: PathBuf::from("RateCardManager.tsx"),
            files: vec![],
            hits: vec![RuleHit { rule: "rename-name".to_string(), matches: 3, kind: None }],
            dir: PathBuf::new(),
        };

        let out = DiffFormatter::render_history(vec![make("first"), make("second")], false);

        let first = out.find("ID: first").unwrap();
        let second = out.find("ID: second").unwrap();
        assert!(second < first);
        assert!(out.contains("Replacements: 3"));
    }

    #[test]
    fn test_render_history_empty() {
        let out = DiffFormatter::render_history(vec![], false);
        assert_eq!(out, "No backup history found.\n");
    }
}
