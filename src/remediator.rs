use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::location::OffsetSpan;
use crate::match_type::FindingRecord;
use crate::replacement::apply_span_replacements;
use crate::rules::Rule;
use crate::source_unit::SourceUnit;

// -------------------------------------------------------------------------------------------------
// RemediatedUnit
// -------------------------------------------------------------------------------------------------
/// One output unit: the input unit's fields echoed unchanged, plus one findings array per rule
/// under the rule's output field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediatedUnit {
    #[serde(flatten)]
    pub unit: SourceUnit,

    #[serde(flatten)]
    pub findings: BTreeMap<String, Vec<FindingRecord>>,
}

impl RemediatedUnit {
    pub fn num_findings(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }
}

// -------------------------------------------------------------------------------------------------
// remediation
// -------------------------------------------------------------------------------------------------
/// Run the given rules over one unit's code.
///
/// With `apply` set, the output unit's `code` is rewritten with all suggested replacements; a
/// replacement conflict is scoped to this unit (its code is left unpatched, with a warning) and
/// never aborts processing of sibling units.
pub fn remediate_unit(unit: &SourceUnit, rules: &[Box<dyn Rule>], apply: bool) -> RemediatedUnit {
    let code = &unit.code;
    let mut findings: BTreeMap<String, Vec<FindingRecord>> = BTreeMap::new();
    let mut replacements: Vec<(OffsetSpan, String)> = Vec::new();

    for rule in rules {
        let occurrences = rule.scan(code);
        if apply {
            replacements.extend(occurrences.iter().filter_map(|occurrence| {
                let suggestion = occurrence.suggestion.clone()?;
                Some((occurrence.span, suggestion))
            }));
        }
        let records = occurrences.iter().map(|o| rule.record(o)).collect();
        findings.insert(rule.output_field().to_string(), records);
    }

    let mut unit = unit.clone();
    if apply && !replacements.is_empty() {
        match apply_span_replacements(code, &replacements) {
            Ok(patched) => unit.code = patched,
            Err(e) => {
                warn!("Leaving {} unpatched: {e}", unit.display_name());
            }
        }
    }

    RemediatedUnit { unit, findings }
}

/// Run the given rules over an ordered sequence of units.
///
/// Units are processed independently; output order equals input order.
pub fn remediate_units(
    units: &[SourceUnit],
    rules: &[Box<dyn Rule>],
    apply: bool,
) -> Vec<RemediatedUnit> {
    units
        .iter()
        .map(|unit| remediate_unit(unit, rules, apply))
        .collect()
}
