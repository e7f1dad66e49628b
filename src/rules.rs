use anyhow::Result;

use crate::config::Policy;
use crate::match_type::{FindingRecord, MatchOccurrence};

pub mod obsolete_txn;
pub mod select_draft;

pub use obsolete_txn::ObsoleteTxnRule;
pub use select_draft::SelectDraftRule;

// -------------------------------------------------------------------------------------------------
// Rule
// -------------------------------------------------------------------------------------------------
/// One remediation policy: how to detect a target construct, which matches are in scope, and how
/// to derive a suggested replacement statement.
///
/// Rules hold only read-only data and are shared across scanning threads.
pub trait Rule: Send + Sync {
    /// A short stable identifier for the rule
    fn id(&self) -> &str;

    /// The human-readable name of the rule
    fn name(&self) -> &str;

    /// The rationale/citation text attached to each of this rule's findings
    fn note(&self) -> &str;

    /// The name of the findings array this rule contributes to each output unit
    fn output_field(&self) -> &str;

    /// Scan the given code, producing in-scope occurrences in left-to-right span order.
    ///
    /// Empty code yields zero occurrences, never an error.
    fn scan(&self, code: &str) -> Vec<MatchOccurrence>;

    /// Assemble the wire record for one of this rule's occurrences.
    fn record(&self, occurrence: &MatchOccurrence) -> FindingRecord {
        FindingRecord::from_occurrence(occurrence, self.note())
    }
}

/// Build all shipped rules from the given policy.
pub fn from_policy(policy: &Policy) -> Result<Vec<Box<dyn Rule>>> {
    Ok(vec![
        Box::new(ObsoleteTxnRule::new(policy)),
        Box::new(SelectDraftRule::new(policy)?),
    ])
}
