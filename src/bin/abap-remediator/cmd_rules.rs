use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug_span, error, info, warn};

use abap_remediator::config::Policy;
use abap_remediator::rules;

use crate::args::{GlobalArgs, Reportable, RulesArgs, RulesCheckArgs, RulesCommand, RulesListArgs};

pub fn run(_global_args: &GlobalArgs, args: &RulesArgs) -> Result<()> {
    match &args.command {
        RulesCommand::List(args) => cmd_rules_list(args),
        RulesCommand::Check(args) => cmd_rules_check(args),
    }
}

// -------------------------------------------------------------------------------------------------
// `rules list`
// -------------------------------------------------------------------------------------------------
#[derive(Serialize)]
struct RuleEntry {
    id: String,
    name: String,
    output_field: String,
    note: String,
}

struct RulesReporter(Vec<RuleEntry>);

fn cmd_rules_list(args: &RulesListArgs) -> Result<()> {
    let policy = match &args.policy {
        Some(path) => Policy::from_yaml_file(path)?,
        None => Policy::from_default()?,
    };
    let entries = rules::from_policy(&policy)?
        .iter()
        .map(|rule| RuleEntry {
            id: rule.id().to_string(),
            name: rule.name().to_string(),
            output_field: rule.output_field().to_string(),
            note: rule.note().to_string(),
        })
        .collect();
    RulesReporter(entries).report(&args.output_args)
}

impl Reportable for RulesReporter {
    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
        use prettytable::row;

        let f = FormatBuilder::new()
            .column_separator(' ')
            .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
            .padding(1, 1)
            .build();
        let mut table: prettytable::Table = self
            .0
            .iter()
            .map(|e| row![l -> &e.id, l -> &e.name, l -> &e.output_field])
            .collect();
        table.set_format(f);
        table.set_titles(row![lb -> "Id", lb -> "Name", lb -> "Output Field"]);
        table.print(&mut writer)?;
        Ok(())
    }

    fn json_format<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.0)?;
        Ok(())
    }

    fn jsonl_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for entry in &self.0 {
            serde_json::to_writer(&mut writer, entry)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// `rules check`
// -------------------------------------------------------------------------------------------------
fn cmd_rules_check(args: &RulesCheckArgs) -> Result<()> {
    let _span = debug_span!("cmd_rules_check").entered();

    let policy = Policy::from_yaml_file(&args.policy)?;

    let mut num_errors = 0;
    let mut num_warnings = 0;

    if policy.obsolete_transactions.is_empty() {
        error!("Policy has no obsolete transactions");
        num_errors += 1;
    }
    if policy.draft_tables.is_empty() {
        error!("Policy has no draft tables");
        num_errors += 1;
    }
    if !is_identifier(&policy.successor_transaction) {
        error!("Successor transaction {:?} is not a valid transaction code", policy.successor_transaction);
        num_errors += 1;
    }

    for (field, entries) in [
        ("obsolete transaction", &policy.obsolete_transactions),
        ("draft table", &policy.draft_tables),
    ] {
        for entry in entries {
            if !is_identifier(entry) {
                error!("{field} entry {entry:?} is not a valid identifier");
                num_errors += 1;
            } else if entry.chars().any(|c| c.is_ascii_lowercase()) {
                warn!("{field} entry {entry:?} is not uppercase; matching is case-insensitive, but policy entries are conventionally uppercase");
                num_warnings += 1;
            }
        }
        let mut seen: Vec<String> = Vec::new();
        for entry in entries {
            let upper = entry.to_ascii_uppercase();
            if seen.contains(&upper) {
                warn!("{field} entry {entry:?} is listed more than once");
                num_warnings += 1;
            } else {
                seen.push(upper);
            }
        }
    }

    let _rules = rules::from_policy(&policy).context("Compiling rules from policy failed")?;

    if num_warnings == 0 && num_errors == 0 {
        info!("Policy {}: no issues detected", args.policy.display());
    } else {
        info!(
            "Policy {}: {} errors and {} warnings",
            args.policy.display(),
            num_errors,
            num_warnings
        );
    }

    if num_errors != 0 {
        bail!("{num_errors} errors detected");
    }
    if num_warnings != 0 && args.warnings_as_errors {
        bail!("{num_warnings} warnings detected; warnings are being treated as errors");
    }

    Ok(())
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
