use anyhow::{bail, Result};

use crate::location::OffsetSpan;

// -------------------------------------------------------------------------------------------------
// apply_span_replacements
// -------------------------------------------------------------------------------------------------
/// Apply a batch of non-overlapping span replacements to the given text.
///
/// Edits are spliced rightmost-first so that lower offsets remain valid while splicing; no
/// offset-delta bookkeeping is needed. Spans must have been produced over this same text:
/// out-of-bounds spans, spans not on character boundaries, and overlapping spans are conflict
/// errors rather than silent corruption.
pub fn apply_span_replacements(
    source: &str,
    replacements: &[(OffsetSpan, String)],
) -> Result<String> {
    let mut ordered: Vec<&(OffsetSpan, String)> = replacements.iter().collect();
    ordered.sort_by_key(|(span, _)| (span.start, span.end));

    for window in ordered.windows(2) {
        let (a, _) = window[0];
        let (b, _) = window[1];
        if a.overlaps(b) {
            bail!(
                "Replacement span conflict: [{}, {}) overlaps [{}, {})",
                a.start,
                a.end,
                b.start,
                b.end
            );
        }
    }

    for (span, _) in &ordered {
        if span.end < span.start {
            bail!("Invalid replacement span: [{}, {})", span.start, span.end);
        }
        if span.end > source.len()
            || !source.is_char_boundary(span.start)
            || !source.is_char_boundary(span.end)
        {
            bail!(
                "Replacement span [{}, {}) is not within the source text (length {})",
                span.start,
                span.end,
                source.len()
            );
        }
    }

    let mut out = source.to_string();
    for (span, replacement) in ordered.into_iter().rev() {
        out.replace_range(span.start..span.end, replacement);
    }
    Ok(out)
}
