//! The fixed rule table for the rate card template migration
//!
//! Rules run in table order, each one over the output of the previous one.
//! The first five rewrite property accesses and are safe to re-run. The last three
//! delete whole form field blocks and only match one exact multi-line layout.

use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Renames a `template.<prop>` access
    Rename,
    /// Inserts `?.` before a method call
    OptionalChain,
    /// Deletes a `<div>` wrapping a labelled `<input>`
    RemoveBlock,
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Rename => "rename",
            RuleKind::OptionalChain => "optional-chain",
            RuleKind::RemoveBlock => "remove-block",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub kind: RuleKind,
    pub pattern: &'static str,
    pub replacement: &'static str,
    pub summary: &'static str,
}

// Layout of a field block: `<div>`, the label on its own line, an `<input`
// whose attributes each sit on a line starting with a letter, then `/>` and `</div>`.
macro_rules! field_block {
    ($label:literal) => {
        concat!(
            r#"\n[ \t]*<div>\n"#,
            r#"[ \t]*<label className="[^"\n]*">\n"#,
            r#"[ \t]*"#,
            $label,
            r#"\n"#,
            r#"[ \t]*</label>\n"#,
            r#"[ \t]*<input\n"#,
            r#"(?:[ \t]+[A-Za-z][^\n]*\n)*"#,
            r#"[ \t]*/>\n"#,
            r#"[ \t]*</div>"#,
        )
    };
}

static BUILTIN_RULES: [Rule; 8] = [
    Rule {
        name: "rename-name",
        kind: RuleKind::Rename,
        pattern: r"\btemplate\.name\b",
        replacement: "template.template_name",
        summary: "template.name -> template.template_name",
    },
    Rule {
        name: "rename-description",
        kind: RuleKind::Rename,
        pattern: r"\btemplate\.description\b",
        replacement: "template.template_description",
        summary: "template.description -> template.template_description",
    },
    Rule {
        name: "rename-category",
        kind: RuleKind::Rename,
        pattern: r"\btemplate\.category\b",
        replacement: "template.service_category",
        summary: "template.category -> template.service_category",
    },
    Rule {
        name: "rename-default-rate",
        kind: RuleKind::Rename,
        pattern: r"\btemplate\.default_rate\b",
        replacement: "template.default_hourly_rate",
        summary: "template.default_rate -> template.default_hourly_rate",
    },
    Rule {
        name: "optional-matter-types",
        kind: RuleKind::OptionalChain,
        pattern: r"template\.matter_types\.map",
        replacement: "template.matter_types?.map",
        summary: "template.matter_types.map -> template.matter_types?.map",
    },
    Rule {
        name: "remove-matter-type-field",
        kind: RuleKind::RemoveBlock,
        pattern: field_block!(r"Matter Type \(Optional\)"),
        replacement: "",
        summary: "remove the \"Matter Type (Optional)\" input",
    },
    Rule {
        name: "remove-estimated-hours-min-field",
        kind: RuleKind::RemoveBlock,
        pattern: field_block!(r"Estimated Hours \(Min\)"),
        replacement: "",
        summary: "remove the \"Estimated Hours (Min)\" input",
    },
    Rule {
        name: "remove-estimated-hours-max-field",
        kind: RuleKind::RemoveBlock,
        pattern: field_block!(r"Estimated Hours \(Max\)"),
        replacement: "",
        summary: "remove the \"Estimated Hours (Max)\" input",
    },
];

/// The built-in rules in application order
pub fn builtin_rules() -> &'static [Rule] {
    &BUILTIN_RULES
}

/// How many matches one rule replaced in a single run
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuleHit {
    pub rule: String,
    pub matches: usize,
    #[serde(skip)]
    pub kind: Option<RuleKind>,
}

impl RuleHit {
    pub fn fired(&self) -> bool {
        self.matches > 0
    }
}

/// Result of running a rule set over one buffer
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub original: String,
    pub patched: String,
    pub hits: Vec<RuleHit>,
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    pub fn total_matches(&self) -> usize {
        self.hits.iter().map(|h| h.matches).sum()
    }

    /// Rules that matched nothing
    pub fn missed(&self) -> impl Iterator<Item = &RuleHit> {
        self.hits.iter().filter(|h| !h.fired())
    }

    /// Error naming every rule that matched nothing
    pub fn ensure_all_fired(&self) -> Result<()> {
        let missed: Vec<&str> = self.missed().map(|h| h.rule.as_str()).collect();
        if !missed.is_empty() {
            anyhow::bail!(
                "{} rule(s) matched nothing: {}",
                missed.len(),
                missed.join(", ")
            );
        }
        Ok(())
    }
}

struct CompiledRule {
    rule: Rule,
    regex: Regex,
}

/// Compiled, ordered rules
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every built-in rule
    pub fn builtin() -> Result<Self> {
        Self::without(&[])
    }

    /// Compile the built-in rules, skipping the named ones
    ///
    /// Unknown names are rejected so a typo in the config does not silently
    /// leave a rule enabled.
    pub fn without(disabled: &[String]) -> Result<Self> {
        for name in disabled {
            if !BUILTIN_RULES.iter().any(|r| r.name == name) {
                anyhow::bail!(
                    "Unknown rule '{}'. Run 'ratecard-patch rules' to list rule names",
                    name
                );
            }
        }

        let mut rules = Vec::new();
        for rule in BUILTIN_RULES.iter() {
            if disabled.iter().any(|d| d == rule.name) {
                tracing::debug!(rule = rule.name, "rule disabled by config");
                continue;
            }
            let regex = Regex::new(rule.pattern)
                .with_context(|| format!("Failed to compile rule '{}'", rule.name))?;
            rules.push(CompiledRule { rule: *rule, regex });
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Run every rule over `text`, in order, replacing all matches
    pub fn apply(&self, text: &str) -> PatchOutcome {
        let mut current = text.to_string();
        let mut hits = Vec::with_capacity(self.rules.len());

        for compiled in &self.rules {
            let matches = compiled.regex.find_iter(&current).count();
            if matches > 0 {
                current = compiled
                    .regex
                    .replace_all(&current, compiled.rule.replacement)
                    .into_owned();
            }
            tracing::debug!(rule = compiled.rule.name, matches, "rule applied");
            hits.push(RuleHit {
                rule: compiled.rule.name.to_string(),
                matches,
                kind: Some(compiled.rule.kind),
            });
        }

        PatchOutcome {
            original: text.to_string(),
            patched: current,
            hits,
        }
    }
}
