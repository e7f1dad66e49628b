use crate::config::Policy;
use crate::location::OffsetSpan;
use crate::match_type::{CallVerb, MatchOccurrence, OccurrenceKind};
use crate::rules::Rule;
use crate::scanner::{statements, strip_quotes, Statement};

// -------------------------------------------------------------------------------------------------
// ObsoleteTxnRule
// -------------------------------------------------------------------------------------------------
/// Detects `CALL TRANSACTION`/`SUBMIT` statements referencing an obsolete transaction code and
/// suggests the canonical successor statement (SAP Note 1804812).
///
/// The transaction code may be quote-delimited or bare, in any casing. Every occurrence is
/// reported; this rule has no scope filter.
pub struct ObsoleteTxnRule {
    codes: Vec<String>,
    submit_suggestion: String,
    call_suggestion: String,
    note: String,
}

impl ObsoleteTxnRule {
    pub fn new(policy: &Policy) -> Self {
        let codes = policy
            .obsolete_transactions
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .collect();
        ObsoleteTxnRule {
            codes,
            submit_suggestion: format!("SUBMIT {}.", policy.successor_transaction),
            call_suggestion: format!("CALL TRANSACTION '{}'.", policy.successor_transaction),
            note: format!(
                "Replace obsolete MB transaction with {} per SAP Note 1804812.",
                policy.successor_transaction
            ),
        }
    }

    fn is_obsolete(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    fn match_statement(&self, stmt: &Statement<'_>, code: &str) -> Option<MatchOccurrence> {
        let tokens = &stmt.tokens;
        let (verb, txn_idx) = if tokens.first()?.is_keyword("SUBMIT") {
            (CallVerb::Submit, 1)
        } else if tokens.len() >= 2
            && tokens[0].is_keyword("CALL")
            && tokens[1].is_keyword("TRANSACTION")
        {
            (CallVerb::CallTransaction, 2)
        } else {
            return None;
        };

        let txn_token = tokens.get(txn_idx)?;
        let txn = strip_quotes(txn_token.text);
        if !self.is_obsolete(txn) {
            return None;
        }

        // The occurrence covers the verb and the code; the terminator is included only when the
        // code token closes the statement.
        let end = if txn_idx + 1 == tokens.len() && stmt.terminated {
            stmt.span.end
        } else {
            txn_token.span.end
        };
        let span = OffsetSpan::new(stmt.span.start, end);

        let suggestion = match verb {
            CallVerb::Submit => self.submit_suggestion.clone(),
            CallVerb::CallTransaction => self.call_suggestion.clone(),
        };

        Some(MatchOccurrence {
            text: code[span.start..span.end].to_string(),
            span,
            kind: OccurrenceKind::ObsoleteCall {
                verb,
                txn: txn.to_string(),
            },
            suggestion: Some(suggestion),
        })
    }
}

impl Rule for ObsoleteTxnRule {
    fn id(&self) -> &str {
        "obsolete-mb-txn"
    }

    fn name(&self) -> &str {
        "Obsolete MB transaction usage"
    }

    fn note(&self) -> &str {
        &self.note
    }

    fn output_field(&self) -> &str {
        "mb_txn_usage"
    }

    fn scan(&self, code: &str) -> Vec<MatchOccurrence> {
        statements(code)
            .filter_map(|stmt| self.match_statement(&stmt, code))
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn rule() -> ObsoleteTxnRule {
        ObsoleteTxnRule::new(&Policy::from_default().unwrap())
    }

    #[test]
    fn call_transaction_occurrence() {
        let code = "CALL TRANSACTION 'MB01'.";
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        let occ = &occurrences[0];
        assert_eq!(occ.text, code);
        assert_eq!(&code[occ.span.start..occ.span.end], occ.text);
        assert_eq!(
            occ.kind,
            OccurrenceKind::ObsoleteCall {
                verb: CallVerb::CallTransaction,
                txn: "MB01".to_string(),
            }
        );
        assert_eq!(occ.suggestion.as_deref(), Some("CALL TRANSACTION 'MIGO'."));
    }

    #[test]
    fn submit_occurrence() {
        let occurrences = rule().scan("SUBMIT MB11.");
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].suggestion.as_deref(), Some("SUBMIT MIGO."));
        assert_eq!(
            occurrences[0].kind,
            OccurrenceKind::ObsoleteCall {
                verb: CallVerb::Submit,
                txn: "MB11".to_string(),
            }
        );
    }

    #[test]
    fn casing_is_ignored_but_preserved() {
        let occurrences = rule().scan("call transaction 'mb1a'.");
        assert_eq!(occurrences.len(), 1);
        match &occurrences[0].kind {
            OccurrenceKind::ObsoleteCall { txn, .. } => assert_eq!(txn, "mb1a"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn multiline_statement_matches() {
        let code = "CALL\n  TRANSACTION\n  'MB31'.";
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].text, code);
    }

    #[test]
    fn trailing_clause_excludes_terminator_from_span() {
        let code = "CALL TRANSACTION 'MB01' AND SKIP FIRST SCREEN.";
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].text, "CALL TRANSACTION 'MB01'");
    }

    #[test]
    fn unterminated_trailing_statement_matches() {
        let occurrences = rule().scan("SUBMIT MB11");
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].text, "SUBMIT MB11");
    }

    #[test]
    fn non_obsolete_code_does_not_match() {
        let r = rule();
        assert_eq!(r.scan("CALL TRANSACTION 'MIGO'.").len(), 0);
        assert_eq!(r.scan("SUBMIT ZREPORT.").len(), 0);
        assert_eq!(r.scan("").len(), 0);
    }

    #[test]
    fn multiple_statements_in_order() {
        let code = indoc! {"
            WRITE 'hello'.
            SUBMIT MB11.
            PERFORM post_goods.
            CALL TRANSACTION 'MB31'.
        "};
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences[0].span.start < occurrences[1].span.start);
        assert_eq!(occurrences[0].text, "SUBMIT MB11.");
        assert_eq!(occurrences[1].text, "CALL TRANSACTION 'MB31'.");
    }

    #[test]
    fn suggestions_are_idempotent() {
        let r = rule();
        for occ in r.scan("SUBMIT MB11. CALL TRANSACTION 'MB01'.") {
            let suggested = occ.suggestion.unwrap();
            assert_eq!(r.scan(&suggested).len(), 0, "rescan of {suggested:?}");
        }
    }
}
