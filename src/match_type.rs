use serde::{Deserialize, Serialize};

use crate::location::OffsetSpan;

// -------------------------------------------------------------------------------------------------
// CallVerb
// -------------------------------------------------------------------------------------------------
/// The statement verb that opened an obsolete transaction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallVerb {
    CallTransaction,
    Submit,
}

// -------------------------------------------------------------------------------------------------
// SelectTarget
// -------------------------------------------------------------------------------------------------
/// The destination clause of a SELECT statement: a table-shaped destination
/// (`INTO TABLE <dest>`) or a single-record destination (`INTO <dest>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectTarget {
    Itab(String),
    Wa(String),
}

impl SelectTarget {
    /// The wire name for this destination kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectTarget::Itab(_) => "itab",
            SelectTarget::Wa(_) => "wa",
        }
    }

    /// The captured destination identifier, with original casing.
    pub fn name(&self) -> &str {
        match self {
            SelectTarget::Itab(name) | SelectTarget::Wa(name) => name,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// OccurrenceKind
// -------------------------------------------------------------------------------------------------
/// The construct a rule detected, with its captured sub-fields.
///
/// Each rule produces one variant; the variant's fields take the place of
/// loosely-coupled regex capture groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccurrenceKind {
    /// A `CALL TRANSACTION`/`SUBMIT` statement referencing an obsolete transaction code
    ObsoleteCall { verb: CallVerb, txn: String },

    /// A SELECT statement on a watch-listed table with an explicit destination clause
    QualifyingSelect { table: String, target: SelectTarget },
}

// -------------------------------------------------------------------------------------------------
// MatchOccurrence
// -------------------------------------------------------------------------------------------------
/// The result of applying one rule to one unit's code.
///
/// Invariant: `code[span.start..span.end] == text` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOccurrence {
    /// The full matched statement text
    pub text: String,

    /// The location of the matched text within the unit's code
    pub span: OffsetSpan,

    /// What was detected, with captured sub-fields
    pub kind: OccurrenceKind,

    /// The corrected statement text; `None` when the rule determined no change is needed
    pub suggestion: Option<String>,
}

// -------------------------------------------------------------------------------------------------
// FindingRecord
// -------------------------------------------------------------------------------------------------
/// Sentinel value for record fields that do not apply to the producing rule.
pub const NONE_SENTINEL: &str = "None";

/// The externally visible shape of one finding, attached to a unit's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingRecord {
    /// The target table name, or `"None"` for rules that are not table-scoped
    pub table: String,

    /// The destination kind (`itab`/`wa`), or `"None"`
    pub target_type: String,

    /// The destination identifier, or `"None"`
    pub target_name: String,

    /// Reserved for future field-level analysis; currently always empty
    pub used_fields: Vec<String>,

    /// Reserved; currently always false
    pub ambiguous: bool,

    /// The detected obsolete transaction code, for the transaction rule only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsolete_txn: Option<String>,

    /// Start character offset of the occurrence within the unit's code
    pub start_char_in_unit: usize,

    /// End character offset (half-open) of the occurrence within the unit's code
    pub end_char_in_unit: usize,

    /// The suggested statement text, or null when no change is needed
    pub suggested_statement: Option<String>,

    /// Reserved; currently always null
    pub suggested_fields: Option<Vec<String>>,

    /// Human-readable rationale and citation for the producing rule
    pub note: String,
}

impl FindingRecord {
    /// Assemble the wire record for one occurrence.
    pub fn from_occurrence(occurrence: &MatchOccurrence, note: &str) -> Self {
        let (table, target_type, target_name, obsolete_txn) = match &occurrence.kind {
            OccurrenceKind::ObsoleteCall { txn, .. } => (
                NONE_SENTINEL.to_string(),
                NONE_SENTINEL.to_string(),
                NONE_SENTINEL.to_string(),
                Some(txn.clone()),
            ),
            OccurrenceKind::QualifyingSelect { table, target } => (
                table.clone(),
                target.kind().to_string(),
                target.name().to_string(),
                None,
            ),
        };

        FindingRecord {
            table,
            target_type,
            target_name,
            used_fields: Vec::new(),
            ambiguous: false,
            obsolete_txn,
            start_char_in_unit: occurrence.span.start,
            end_char_in_unit: occurrence.span.end,
            suggested_statement: occurrence.suggestion.clone(),
            suggested_fields: None,
            note: note.to_string(),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn obsolete_call_record_uses_sentinels() {
        let occurrence = MatchOccurrence {
            text: "CALL TRANSACTION 'MB01'.".to_string(),
            span: OffsetSpan::new(0, 24),
            kind: OccurrenceKind::ObsoleteCall {
                verb: CallVerb::CallTransaction,
                txn: "MB01".to_string(),
            },
            suggestion: Some("CALL TRANSACTION 'MIGO'.".to_string()),
        };
        let record = FindingRecord::from_occurrence(&occurrence, "note text");
        assert_eq!(record.table, "None");
        assert_eq!(record.target_type, "None");
        assert_eq!(record.target_name, "None");
        assert_eq!(record.obsolete_txn.as_deref(), Some("MB01"));
        assert_eq!(record.start_char_in_unit, 0);
        assert_eq!(record.end_char_in_unit, 24);
        assert!(!record.ambiguous);
        assert!(record.used_fields.is_empty());
        assert_eq!(record.suggested_fields, None);
    }

    #[test]
    fn select_record_omits_obsolete_txn_field() {
        let occurrence = MatchOccurrence {
            text: "SELECT * FROM VBRK INTO TABLE lt.".to_string(),
            span: OffsetSpan::new(5, 38),
            kind: OccurrenceKind::QualifyingSelect {
                table: "VBRK".to_string(),
                target: SelectTarget::Itab("lt".to_string()),
            },
            suggestion: None,
        };
        let record = FindingRecord::from_occurrence(&occurrence, "note text");
        assert_eq!(record.table, "VBRK");
        assert_eq!(record.target_type, "itab");
        assert_eq!(record.target_name, "lt");

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("obsolete_txn").is_none());
        assert_eq!(json["suggested_statement"], serde_json::Value::Null);
    }
}
