use crate::location::OffsetSpan;

// -------------------------------------------------------------------------------------------------
// Token
// -------------------------------------------------------------------------------------------------
/// One whitespace-delimited token within a statement window.
///
/// The token text preserves its original casing; keyword comparison is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The token text, sliced out of the unit's code
    pub text: &'a str,

    /// The location of the token within the unit's code
    pub span: OffsetSpan,
}

impl<'a> Token<'a> {
    /// Does this token equal the given keyword, ignoring ASCII case?
    #[inline]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.text.eq_ignore_ascii_case(keyword)
    }
}

// -------------------------------------------------------------------------------------------------
// Statement
// -------------------------------------------------------------------------------------------------
/// One period-terminated statement window within a unit's code.
///
/// `text` is exactly `code[span.start..span.end]`, including the terminator when present.
/// `tokens` excludes the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement<'a> {
    /// The full window text
    pub text: &'a str,

    /// The location of the window within the unit's code
    pub span: OffsetSpan,

    /// Whether the window ends with a literal `.` terminator
    pub terminated: bool,

    /// The whitespace-delimited tokens of the window, without the terminator
    pub tokens: Vec<Token<'a>>,
}

impl<'a> Statement<'a> {
    /// Find the first token matching the given keyword, ignoring ASCII case.
    pub fn find_keyword(&self, keyword: &str) -> Option<(usize, &Token<'a>)> {
        self.tokens
            .iter()
            .enumerate()
            .find(|(_, t)| t.is_keyword(keyword))
    }
}

/// Iterate the statement windows of the given code, left to right.
///
/// A statement is terminated by a literal period character. Periods inside quoted literals
/// (`'...'` or `` `...` ``) do not terminate. A trailing window without a terminator is still
/// yielded, since some statement shapes treat the terminator as optional.
pub fn statements(code: &str) -> Statements<'_> {
    Statements { code, pos: 0 }
}

/// Iterator over the statement windows of a unit's code. See [`statements`].
pub struct Statements<'a> {
    code: &'a str,
    pos: usize,
}

impl<'a> Iterator for Statements<'a> {
    type Item = Statement<'a>;

    fn next(&mut self) -> Option<Statement<'a>> {
        let code = self.code;
        let rest = &code[self.pos..];
        let start = self.pos + (rest.len() - rest.trim_start().len());
        if start >= code.len() {
            return None;
        }

        let mut quote: Option<char> = None;
        let mut end = code.len();
        let mut terminated = false;
        for (idx, c) in code[start..].char_indices() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '`' => quote = Some(c),
                    '.' => {
                        end = start + idx + 1;
                        terminated = true;
                        break;
                    }
                    _ => {}
                },
            }
        }
        self.pos = end;

        let (text, end) = if terminated {
            (&code[start..end], end)
        } else {
            let trimmed = code[start..end].trim_end();
            (trimmed, start + trimmed.len())
        };

        let body = if terminated {
            &text[..text.len() - 1]
        } else {
            text
        };

        Some(Statement {
            text,
            span: OffsetSpan::new(start, end),
            terminated,
            tokens: tokenize(body, start),
        })
    }
}

fn tokenize(body: &str, base: usize) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut run_start: Option<usize> = None;
    for (idx, c) in body.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = run_start.take() {
                tokens.push(Token {
                    text: &body[s..idx],
                    span: OffsetSpan::new(base + s, base + idx),
                });
            }
        } else if run_start.is_none() {
            run_start = Some(idx);
        }
    }
    if let Some(s) = run_start {
        tokens.push(Token {
            text: &body[s..],
            span: OffsetSpan::new(base + s, base + body.len()),
        });
    }
    tokens
}

/// Strip one matching pair of quote delimiters (`'` or `"`) from the given token text.
pub fn strip_quotes(text: &str) -> &str {
    for q in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token_texts<'a>(stmt: &'a Statement<'a>) -> Vec<&'a str> {
        stmt.tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_terminator() {
        let code = "SUBMIT MB11. CALL TRANSACTION 'MB01'.";
        let stmts: Vec<_> = statements(code).collect();
        assert_eq!(stmts.len(), 2);

        assert_eq!(stmts[0].text, "SUBMIT MB11.");
        assert_eq!(stmts[0].span, OffsetSpan::new(0, 12));
        assert!(stmts[0].terminated);
        assert_eq!(token_texts(&stmts[0]), vec!["SUBMIT", "MB11"]);

        assert_eq!(stmts[1].text, "CALL TRANSACTION 'MB01'.");
        assert_eq!(token_texts(&stmts[1]), vec!["CALL", "TRANSACTION", "'MB01'"]);
        assert_eq!(&code[stmts[1].span.start..stmts[1].span.end], stmts[1].text);
    }

    #[test]
    fn elastic_whitespace_spans_lines() {
        let code = "SELECT *\n  FROM vbrk\n  INTO TABLE lt_vbrk.";
        let stmts: Vec<_> = statements(code).collect();
        assert_eq!(stmts.len(), 1);
        assert_eq!(
            token_texts(&stmts[0]),
            vec!["SELECT", "*", "FROM", "vbrk", "INTO", "TABLE", "lt_vbrk"]
        );
    }

    #[test]
    fn quoted_period_does_not_terminate() {
        let code = "WRITE 'version 1.5'. SUBMIT MB11.";
        let stmts: Vec<_> = statements(code).collect();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "WRITE 'version 1.5'.");
        assert_eq!(stmts[1].text, "SUBMIT MB11.");
    }

    #[test]
    fn trailing_window_without_terminator() {
        let code = "SUBMIT MB11.  CALL TRANSACTION 'MB01'  ";
        let stmts: Vec<_> = statements(code).collect();
        assert_eq!(stmts.len(), 2);
        assert!(!stmts[1].terminated);
        assert_eq!(stmts[1].text, "CALL TRANSACTION 'MB01'");
        assert_eq!(&code[stmts[1].span.start..stmts[1].span.end], stmts[1].text);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(statements("").count(), 0);
        assert_eq!(statements("   \n\t ").count(), 0);
    }

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        let code = "select * from VBRK where id = 1 into ls.";
        let stmts: Vec<_> = statements(code).collect();
        let (idx, tok) = stmts[0].find_keyword("WHERE").unwrap();
        assert_eq!(idx, 4);
        assert_eq!(tok.text, "where");
    }

    #[test]
    fn strips_quote_delimiters() {
        assert_eq!(strip_quotes("'MB01'"), "MB01");
        assert_eq!(strip_quotes("\"MB01\""), "MB01");
        assert_eq!(strip_quotes("MB01"), "MB01");
        assert_eq!(strip_quotes("'"), "'");
    }
}
