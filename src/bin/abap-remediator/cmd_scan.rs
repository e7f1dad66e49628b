use anyhow::{bail, Context, Result};
use indenter::indented;
use lazy_static::lazy_static;
use rayon::prelude::*;
use std::fmt::{Display, Formatter, Write};
use std::path::Path;
use tracing::{debug, info};

use abap_remediator::config::Policy;
use abap_remediator::location::{LocationMapping, OffsetSpan};
use abap_remediator::match_type::NONE_SENTINEL;
use abap_remediator::progress::Progress;
use abap_remediator::remediator::{remediate_unit, RemediatedUnit};
use abap_remediator::rules::{self, Rule};
use abap_remediator::source_unit::SourceUnit;

use crate::args::{GlobalArgs, Reportable, ScanArgs};

pub fn run(global_args: &GlobalArgs, args: &ScanArgs) -> Result<()> {
    let policy = match &args.policy {
        Some(path) => Policy::from_yaml_file(path)?,
        None => Policy::from_default()?,
    };

    let mut rules = rules::from_policy(&policy)?;
    if !args.rule.is_empty() {
        for id in &args.rule {
            if !rules.iter().any(|r| r.id() == id) {
                bail!("No rule with id {id:?}");
            }
        }
        rules.retain(|r| args.rule.iter().any(|id| id == r.id()));
    }
    debug!("Running {} rules", rules.len());

    let units = read_units(&args.input)?;
    info!("Loaded {} source units from {}", units.len(), args.input.display());

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.num_jobs)
        .build_global()
        .context("Failed to initialize the scanning thread pool")?;

    let mut progress =
        Progress::new_bar(units.len() as u64, "Scanning units", global_args.use_progress());
    let results: Vec<RemediatedUnit> = units
        .par_iter()
        .map_init(
            || progress.clone(),
            |progress, unit| {
                let result = remediate_unit(unit, &rules, args.apply);
                progress.inc(1);
                result
            },
        )
        .collect();
    progress.finish();

    let num_findings: usize = results.iter().map(RemediatedUnit::num_findings).sum();
    info!("{num_findings} findings in {} units", results.len());

    ScanReporter { rules, results }.report(&args.output_args)
}

fn read_units(input: &Path) -> Result<Vec<SourceUnit>> {
    if input == Path::new("-") {
        serde_json::from_reader(std::io::stdin().lock())
            .context("Failed to read source units from stdin")
    } else {
        let infile = std::fs::File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        serde_json::from_reader(std::io::BufReader::new(infile))
            .with_context(|| format!("Failed to read source units from {}", input.display()))
    }
}

// -------------------------------------------------------------------------------------------------
// reporting
// -------------------------------------------------------------------------------------------------
struct ScanReporter {
    rules: Vec<Box<dyn Rule>>,
    results: Vec<RemediatedUnit>,
}

impl Reportable for ScanReporter {
    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        let num_affected = self.results.iter().filter(|r| r.num_findings() > 0).count();
        if num_affected == 0 {
            writeln!(writer, "No findings.")?;
            return Ok(());
        }

        for result in self.results.iter().filter(|r| r.num_findings() > 0) {
            writeln!(writer, "{}", UnitFindings(result))?;
        }

        let table = summary_table(&self.rules, &self.results);
        table.print(&mut writer)?;
        Ok(())
    }

    fn json_format<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut ser = serde_json::Serializer::pretty(writer);
        use serde::Serializer;
        ser.collect_seq(&self.results)?;
        Ok(())
    }

    fn jsonl_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for result in &self.results {
            serde_json::to_writer(&mut writer, result)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

lazy_static! {
    static ref STYLE_UNIT_HEADING: console::Style = console::Style::new().bold().bright().white();
    static ref STYLE_RULE: console::Style = console::Style::new().bright().bold().blue();
    static ref STYLE_HEADING: console::Style = console::Style::new().bold();
    static ref STYLE_MATCH: console::Style = console::Style::new().yellow();
}

/// The human-format rendering of one unit's findings.
struct UnitFindings<'a>(&'a RemediatedUnit);

impl Display for UnitFindings<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let unit = &self.0.unit;
        writeln!(
            f,
            "{} {}",
            STYLE_UNIT_HEADING.apply_to(unit.display_name()),
            format_args!("({} findings)", self.0.num_findings()),
        )?;

        let mapping = LocationMapping::new(&unit.code);
        let code_len = unit.code.len();
        let mut f = indented(f).with_str("    ");
        for (field, records) in &self.0.findings {
            for record in records {
                // Spans index the input code; with --apply, the echoed code may be shorter
                let span = OffsetSpan::new(
                    record.start_char_in_unit.min(code_len.saturating_sub(1)),
                    record.end_char_in_unit.min(code_len),
                );
                writeln!(
                    f,
                    "{} {} {}",
                    STYLE_RULE.apply_to(field),
                    describe_target(record),
                    mapping.get_source_span(&span),
                )?;
                match &record.suggested_statement {
                    Some(suggested) => {
                        writeln!(
                            f,
                            "{} {}",
                            STYLE_HEADING.apply_to("Suggested:"),
                            STYLE_MATCH.apply_to(suggested),
                        )?;
                    }
                    None => {
                        writeln!(f, "{}", STYLE_HEADING.apply_to("Already remediated"))?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn describe_target(record: &abap_remediator::match_type::FindingRecord) -> String {
    match &record.obsolete_txn {
        Some(txn) => txn.clone(),
        None if record.table != NONE_SENTINEL => {
            format!("{} ({} {})", record.table, record.target_type, record.target_name)
        }
        None => record.table.clone(),
    }
}

fn summary_table(rules: &[Box<dyn Rule>], results: &[RemediatedUnit]) -> prettytable::Table {
    use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
    use prettytable::row;

    let f = FormatBuilder::new()
        .column_separator(' ')
        .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
        .padding(1, 1)
        .build();

    let mut table: prettytable::Table = rules
        .iter()
        .map(|rule| {
            let field = rule.output_field();
            let total: usize = results
                .iter()
                .filter_map(|r| r.findings.get(field))
                .map(Vec::len)
                .sum();
            let affected = results
                .iter()
                .filter(|r| r.findings.get(field).is_some_and(|fs| !fs.is_empty()))
                .count();
            row![l -> rule.name(), r -> total, r -> affected]
        })
        .collect();
    table.set_format(f);
    table.set_titles(row![lb -> "Rule", cb -> "Findings", cb -> "Affected Units"]);
    table
}
