use core::ops::Range;
use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// OffsetSpan
// -------------------------------------------------------------------------------------------------
/// A span defined by two byte offsets.
/// This is a half-open interval.
/// A valid span will have an end value greater than or equal to the start value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OffsetSpan {
    pub start: usize,
    pub end: usize,
}

impl OffsetSpan {
    /// Create a new `OffsetSpan` at the given start and end.
    /// This is a half-open interval: `[start, end)`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        OffsetSpan { start, end }
    }

    /// Create a new `OffsetSpan` from the given `Range<usize>`.
    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        OffsetSpan {
            start: range.start,
            end: range.end,
        }
    }

    /// Return the length in bytes of this `OffsetSpan`.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Is the given span empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Does this `OffsetSpan` entirely contain the other?
    #[inline]
    pub fn fully_contains(&self, other: &OffsetSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Does this `OffsetSpan` share any offset with the other?
    #[inline]
    pub fn overlaps(&self, other: &OffsetSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// -------------------------------------------------------------------------------------------------
// SourcePoint
// -------------------------------------------------------------------------------------------------
/// A point defined by line and column offsets.
/// Lines are indexed from 1; columns are indexed from 0.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
pub struct SourcePoint {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for SourcePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// -------------------------------------------------------------------------------------------------
// SourceSpan
// -------------------------------------------------------------------------------------------------
/// A span defined by two source points.
/// This is a closed interval.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourcePoint,
    pub end: SourcePoint,
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// -------------------------------------------------------------------------------------------------
// LocationMapping
// -------------------------------------------------------------------------------------------------
/// A translation table from byte offsets to source offsets
pub struct LocationMapping {
    offset_to_source: Vec<SourcePoint>,
}

impl LocationMapping {
    /// Create a new location mapping from the given input.
    pub fn new(input: &str) -> Self {
        let mut column = 0;
        let mut line = 1;
        let offset_to_source = input
            .bytes()
            .map(|b| {
                match b {
                    b'\r' => {
                        column = 0;
                    }
                    b'\n' => {
                        line += 1;
                        column = 0;
                    }
                    _ => {
                        column += 1;
                    }
                }
                SourcePoint { line, column }
            })
            .collect();
        LocationMapping { offset_to_source }
    }

    /// Get the `SourceSpan` corresponding to the given `OffsetSpan`.
    /// Panics if the given `OffsetSpan` is not valid for this `LocationMapping`.
    pub fn get_source_span(&self, span: &OffsetSpan) -> SourceSpan {
        let start = self.offset_to_source[span.start];
        let end_idx = span.end.saturating_sub(1);
        let end = self.offset_to_source[end_idx];
        SourceSpan { start, end }
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
    fn span_queries() {
        let s = OffsetSpan::new(3, 10);
        assert_eq!(s.len(), 7);
        assert!(!s.is_empty());
        assert!(s.fully_contains(&OffsetSpan::new(3, 10)));
        assert!(s.fully_contains(&OffsetSpan::new(5, 9)));
        assert!(!s.fully_contains(&OffsetSpan::new(2, 9)));

        assert!(s.overlaps(&OffsetSpan::new(9, 20)));
        assert!(!s.overlaps(&OffsetSpan::new(10, 20)));
        assert!(!s.overlaps(&OffsetSpan::new(0, 3)));
    }

    #[test]
    fn mapping_multiline() {
        let mapping = LocationMapping::new("SELECT *\n  FROM vbrk.\n");
        let span = mapping.get_source_span(&OffsetSpan::new(0, 21));
        assert_eq!(span.start, SourcePoint { line: 1, column: 1 });
        assert_eq!(span.end, SourcePoint { line: 2, column: 12 });
    }
}
