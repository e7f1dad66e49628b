use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::config::Policy;
use crate::match_type::{MatchOccurrence, OccurrenceKind, SelectTarget};
use crate::rules::Rule;
use crate::scanner::{statements, Statement, Token};

lazy_static! {
    static ref WHITESPACE_RUN: Regex =
        Regex::new(r"\s+").expect("whitespace-collapsing regex should compile");
}

// -------------------------------------------------------------------------------------------------
// SelectDraftRule
// -------------------------------------------------------------------------------------------------
/// Detects SELECT statements on watch-listed tables and suggests a statement carrying a
/// `<TABLE>-DRAFT = SPACE` filter (SAP Note 2768887).
///
/// Only statements with an explicit destination clause (`INTO TABLE <dest>` or `INTO <dest>`)
/// match at all; only tables on the watch-list are reported. The filter insertion is idempotent
/// and preserves any existing predicate.
pub struct SelectDraftRule {
    tables: Vec<String>,
    /// Per-table pattern detecting an already-present draft filter
    filter_present: HashMap<String, Regex>,
    note: String,
}

impl SelectDraftRule {
    pub fn new(policy: &Policy) -> Result<Self> {
        let tables: Vec<String> = policy
            .draft_tables
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect();
        let mut filter_present = HashMap::new();
        for table in &tables {
            let pattern = format!(r"(?i)\b{}-DRAFT\s*=", regex::escape(table));
            filter_present.insert(table.clone(), Regex::new(&pattern)?);
        }
        Ok(SelectDraftRule {
            tables,
            filter_present,
            note: "Add <TABLE>-DRAFT = SPACE filter to billing table SELECT per SAP Note 2768887."
                .to_string(),
        })
    }

    /// Compute the corrected statement text, or `None` when the statement already carries the
    /// draft filter.
    fn ensure_draft_filter(&self, stmt: &Statement<'_>, table: &str) -> Option<String> {
        if self.filter_present[table].is_match(stmt.text) {
            return None;
        }

        let base = stmt.span.start;
        let text = stmt.text;
        let patched = if let Some((_, where_token)) = stmt.find_keyword("WHERE") {
            // Conjoin with the existing predicate, right after the WHERE keyword
            let at = where_token.span.end - base;
            format!("{} {table}-DRAFT = SPACE AND{}", &text[..at], &text[at..])
        } else if let Some((_, into_token)) = stmt.find_keyword("INTO") {
            let at = into_token.span.start - base;
            format!("{} WHERE {table}-DRAFT = SPACE {}", &text[..at], &text[at..])
        } else {
            // Unreachable for statements produced by the matcher, which requires a destination
            // clause; handled anyway so the synthesizer is total over its inputs
            format!("{} WHERE {table}-DRAFT = SPACE.", text.trim_end_matches('.'))
        };

        Some(WHITESPACE_RUN.replace_all(&patched, " ").trim().to_string())
    }
}

impl Rule for SelectDraftRule {
    fn id(&self) -> &str {
        "draft-aware-select"
    }

    fn name(&self) -> &str {
        "SELECT on draft-enabled billing table"
    }

    fn note(&self) -> &str {
        &self.note
    }

    fn output_field(&self) -> &str {
        "selects"
    }

    fn scan(&self, code: &str) -> Vec<MatchOccurrence> {
        statements(code)
            .filter_map(|stmt| {
                let (table_token, target) = parse_statement(&stmt)?;
                let table = table_token.text.to_ascii_uppercase();
                if !self.tables.contains(&table) {
                    // scope filter: out-of-scope tables are not reported at all
                    return None;
                }
                let suggestion = self.ensure_draft_filter(&stmt, &table);
                Some(MatchOccurrence {
                    text: stmt.text.to_string(),
                    span: stmt.span,
                    kind: OccurrenceKind::QualifyingSelect {
                        table: table_token.text.to_string(),
                        target,
                    },
                    suggestion,
                })
            })
            .collect()
    }
}

/// Recognize a SELECT statement shape: `SELECT [SINGLE] <fields> FROM <table> ... INTO [TABLE]
/// <dest> ... .`, returning the table token and the destination.
///
/// A statement without a destination clause does not match at all.
fn parse_statement<'a>(stmt: &Statement<'a>) -> Option<(Token<'a>, SelectTarget)> {
    if !stmt.terminated {
        return None;
    }
    let tokens = &stmt.tokens;
    if !tokens.first()?.is_keyword("SELECT") {
        return None;
    }

    let mut idx = 1;
    if tokens.get(idx)?.is_keyword("SINGLE") {
        idx += 1;
    }

    // field list: identifiers, commas, `*` -- anything that is not the FROM keyword
    let fields_start = idx;
    while let Some(token) = tokens.get(idx) {
        if token.is_keyword("FROM") {
            break;
        }
        if !is_field_token(token.text) {
            return None;
        }
        idx += 1;
    }
    tokens.get(idx)?; // ran off the end without a FROM clause
    if idx == fields_start {
        return None;
    }

    let table_token = tokens.get(idx + 1)?;
    if !is_identifier(table_token.text) {
        return None;
    }

    let into_idx = (idx + 2..tokens.len()).find(|&j| tokens[j].is_keyword("INTO"))?;
    let target = if tokens
        .get(into_idx + 1)
        .is_some_and(|t| t.is_keyword("TABLE"))
    {
        let dest = tokens.get(into_idx + 2)?;
        if !is_destination(dest.text) {
            return None;
        }
        SelectTarget::Itab(dest.text.to_string())
    } else {
        let dest = tokens.get(into_idx + 1)?;
        if !is_destination(dest.text) {
            return None;
        }
        SelectTarget::Wa(dest.text.to_string())
    };

    Some((*table_token, target))
}

fn is_field_token(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | ',' | '*'))
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// A bare identifier, an inline declaration (`@DATA(...)`), or a dereferenced attribute
/// (`obj->attr`).
fn is_destination(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '(' | ')' | '-' | '>'))
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn rule() -> SelectDraftRule {
        SelectDraftRule::new(&Policy::from_default().unwrap()).unwrap()
    }

    #[test]
    fn into_table_destination_is_itab() {
        let code = "SELECT * FROM VBRK INTO TABLE @DATA(lt_vbrk).";
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        let occ = &occurrences[0];
        assert_eq!(occ.text, code);
        assert_eq!(&code[occ.span.start..occ.span.end], occ.text);
        assert_eq!(
            occ.kind,
            OccurrenceKind::QualifyingSelect {
                table: "VBRK".to_string(),
                target: SelectTarget::Itab("@DATA(lt_vbrk)".to_string()),
            }
        );
        assert_eq!(
            occ.suggestion.as_deref(),
            Some("SELECT * FROM VBRK WHERE VBRK-DRAFT = SPACE INTO TABLE @DATA(lt_vbrk).")
        );
    }

    #[test]
    fn condition_is_conjoined_after_existing_where() {
        let occurrences = rule().scan("SELECT a, b FROM VBRP WHERE id = 1 INTO @ls_vbrp.");
        assert_eq!(occurrences.len(), 1);
        assert_eq!(
            occurrences[0].suggestion.as_deref(),
            Some("SELECT a, b FROM VBRP WHERE VBRP-DRAFT = SPACE AND id = 1 INTO @ls_vbrp.")
        );
        assert_eq!(
            occurrences[0].kind,
            OccurrenceKind::QualifyingSelect {
                table: "VBRP".to_string(),
                target: SelectTarget::Wa("@ls_vbrp".to_string()),
            }
        );
    }

    #[test]
    fn existing_draft_filter_yields_no_suggestion() {
        let code = "SELECT * FROM VBRK WHERE vbrk-draft = space INTO TABLE lt_vbrk.";
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].suggestion, None);
    }

    #[test]
    fn suggested_statement_is_idempotent() {
        let r = rule();
        let occurrences = r.scan("SELECT * FROM VBRK INTO TABLE @DATA(lt_vbrk).");
        let suggested = occurrences[0].suggestion.clone().unwrap();
        let rescanned = r.scan(&suggested);
        assert_eq!(rescanned.len(), 1);
        assert_eq!(rescanned[0].suggestion, None);
    }

    #[test]
    fn out_of_scope_table_is_filtered() {
        let r = rule();
        assert_eq!(r.scan("SELECT * FROM MARA INTO TABLE lt_mara.").len(), 0);
        assert_eq!(r.scan("SELECT * FROM mara INTO ls_mara.").len(), 0);
    }

    #[test]
    fn missing_destination_clause_does_not_match() {
        let r = rule();
        assert_eq!(r.scan("SELECT * FROM VBRK.").len(), 0);
        assert_eq!(r.scan("SELECT * FROM VBRK WHERE id = 1.").len(), 0);
        assert_eq!(r.scan("SELECT * FROM VBRK INTO.").len(), 0);
    }

    #[test]
    fn unterminated_select_does_not_match() {
        assert_eq!(rule().scan("SELECT * FROM VBRK INTO TABLE lt_vbrk").len(), 0);
    }

    #[test]
    fn select_single_matches() {
        let occurrences = rule().scan("SELECT SINGLE * FROM vbrk INTO @DATA(ls_vbrk).");
        assert_eq!(occurrences.len(), 1);
        match &occurrences[0].kind {
            OccurrenceKind::QualifyingSelect { table, target } => {
                assert_eq!(table, "vbrk");
                assert_eq!(target, &SelectTarget::Wa("@DATA(ls_vbrk)".to_string()));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert_eq!(
            occurrences[0].suggestion.as_deref(),
            Some("SELECT SINGLE * FROM vbrk WHERE VBRK-DRAFT = SPACE INTO @DATA(ls_vbrk).")
        );
    }

    #[test]
    fn multiline_statement_is_normalized_in_suggestion() {
        let code = indoc! {"
            SELECT vbeln, posnr
              FROM vbrp
              WHERE vbeln = @lv_vbeln
              INTO TABLE @DATA(lt_items).
        "};
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(
            occurrences[0].suggestion.as_deref(),
            Some(
                "SELECT vbeln, posnr FROM vbrp WHERE VBRP-DRAFT = SPACE AND \
                 vbeln = @lv_vbeln INTO TABLE @DATA(lt_items)."
            )
        );
    }

    #[test]
    fn dereferenced_attribute_destination() {
        let occurrences = rule().scan("SELECT * FROM VBRK INTO lo_buffer->rows.");
        assert_eq!(occurrences.len(), 1);
        match &occurrences[0].kind {
            OccurrenceKind::QualifyingSelect { target, .. } => {
                assert_eq!(target, &SelectTarget::Wa("lo_buffer->rows".to_string()));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn surrounding_statements_do_not_confuse_matching() {
        let code = indoc! {"
            DATA lt_vbrk TYPE TABLE OF vbrk.
            SELECT * FROM vbrk INTO TABLE lt_vbrk.
            LOOP AT lt_vbrk INTO DATA(ls).
            ENDLOOP.
        "};
        let occurrences = rule().scan(code);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].text, "SELECT * FROM vbrk INTO TABLE lt_vbrk.");
    }
}
