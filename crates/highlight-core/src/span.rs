//! Highlight result containers.
//!
//! A [`DocumentHighlight`] is an ordered sequence of [`LineHighlight`]s, one
//! per document line; a [`LineHighlight`] is an ordered sequence of
//! [`TokenSpan`]s covering only the matched portions of the line. Spans are
//! merged on insertion when they are column-adjacent and share a style, so
//! consumers never see two mergeable neighbors.
//!
//! The containers serialize through serde with stable field names
//! (`lines`, `spans`, `range`, `start`/`end`, `line`/`column`/`index`,
//! `style_id`, `state`, `goto_state`, `matched_text`, `inline_style`);
//! optional fields are omitted when unset.

use serde::{Deserialize, Serialize};

/// A point in a document, in character units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Character offset within the line.
    pub column: u32,
    /// Character offset from the start of the document.
    pub index: u32,
}

impl Position {
    /// Create a position from its three coordinates.
    pub fn new(line: u32, column: u32, index: u32) -> Self {
        Self {
            line,
            column,
            index,
        }
    }
}

/// A half-open range `[start, end)` in document order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Inclusive start of the range.
    pub start: Position,
    /// Exclusive end of the range.
    pub end: Position,
}

/// One styled token on a line.
///
/// `state` is the lexer state that was active when the span was produced;
/// `goto_state` is the state the producing rule transitions to, or `-1`
/// when the rule keeps the current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSpan {
    /// The covered character range (single line).
    pub range: Range,
    /// Style id, `-1` when no style is assigned.
    pub style_id: i32,
    /// Lexer state active when the span was produced.
    pub state: i32,
    /// Transition state of the producing rule, `-1` for none.
    pub goto_state: i32,
    /// The matched text, set on whole-match spans only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub matched_text: Option<String>,
    /// Resolved inline style string, set when the engine is configured for it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_style: Option<String>,
}

impl Default for TokenSpan {
    fn default() -> Self {
        Self {
            range: Range::default(),
            style_id: -1,
            state: 0,
            goto_state: -1,
            matched_text: None,
            inline_style: None,
        }
    }
}

// Equality is structural over range, style and states; `matched_text` and
// `inline_style` are derived data and excluded.
impl PartialEq for TokenSpan {
    fn eq(&self, other: &Self) -> bool {
        self.range == other.range
            && self.style_id == other.style_id
            && self.state == other.state
            && self.goto_state == other.goto_state
    }
}

impl Eq for TokenSpan {}

/// The spans of a single line, ordered by start column.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHighlight {
    /// Spans in column order; adjacent same-style spans are pre-merged.
    pub spans: Vec<TokenSpan>,
}

impl LineHighlight {
    /// Append a span, extending the previous span instead when it ends where
    /// the new one starts and carries the same style.
    ///
    /// Merging keeps the first span's `state`, `goto_state` and
    /// `matched_text`; only the end column and end index grow.
    pub fn push_or_merge_span(&mut self, span: TokenSpan) {
        if let Some(last) = self.spans.last_mut()
            && last.range.end.column == span.range.start.column
            && last.style_id == span.style_id
        {
            last.range.end.column = span.range.end.column;
            last.range.end.index = span.range.end.index;
            return;
        }
        self.spans.push(span);
    }
}

/// The highlight of a whole document, one [`LineHighlight`] per line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHighlight {
    /// Per-line highlights, index equals line number.
    pub lines: Vec<LineHighlight>,
}

impl DocumentHighlight {
    /// Append the highlight of the next line.
    pub fn add_line(&mut self, line: LineHighlight) {
        self.lines.push(line);
    }

    /// Total number of spans across all lines.
    pub fn span_count(&self) -> usize {
        self.lines.iter().map(|line| line.spans.len()).sum()
    }

    /// Drop all lines.
    pub fn reset(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start_column: u32, end_column: u32, style_id: i32) -> TokenSpan {
        let mut span = TokenSpan {
            style_id,
            ..TokenSpan::default()
        };
        span.range.start.column = start_column;
        span.range.start.index = start_column;
        span.range.end.column = end_column;
        span.range.end.index = end_column;
        span
    }

    #[test]
    fn test_adjacent_same_style_spans_merge() {
        let mut line = LineHighlight::default();
        line.push_or_merge_span(span(0, 2, 7));
        line.push_or_merge_span(span(2, 5, 7));

        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].range.start.column, 0);
        assert_eq!(line.spans[0].range.end.column, 5);
        assert_eq!(line.spans[0].range.end.index, 5);
    }

    #[test]
    fn test_merge_keeps_first_span_states() {
        let mut line = LineHighlight::default();
        let mut first = span(0, 2, 7);
        first.goto_state = 3;
        first.matched_text = Some("ab".to_string());
        let mut second = span(2, 4, 7);
        second.goto_state = 9;
        line.push_or_merge_span(first);
        line.push_or_merge_span(second);

        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].goto_state, 3);
        assert_eq!(line.spans[0].matched_text.as_deref(), Some("ab"));
    }

    #[test]
    fn test_different_style_or_gap_appends() {
        let mut line = LineHighlight::default();
        line.push_or_merge_span(span(0, 2, 7));
        line.push_or_merge_span(span(2, 4, 8));
        line.push_or_merge_span(span(5, 6, 8));

        assert_eq!(line.spans.len(), 3);
    }

    #[test]
    fn test_span_equality_ignores_matched_text() {
        let mut a = span(0, 2, 7);
        a.matched_text = Some("ab".to_string());
        let b = span(0, 2, 7);

        assert_eq!(a, b);
        assert_ne!(a, span(0, 2, 8));
    }

    #[test]
    fn test_serialization_omits_unset_optionals() {
        let json = serde_json::to_string(&span(0, 2, 7)).unwrap();
        assert!(!json.contains("matched_text"));
        assert!(!json.contains("inline_style"));
        assert!(json.contains("\"style_id\":7"));
        assert!(json.contains("\"goto_state\":-1"));
    }

    #[test]
    fn test_document_round_trip() {
        let mut line = LineHighlight::default();
        let mut s = span(0, 2, 7);
        s.matched_text = Some("if".to_string());
        line.push_or_merge_span(s);
        let mut highlight = DocumentHighlight::default();
        highlight.add_line(line);
        highlight.add_line(LineHighlight::default());

        let json = serde_json::to_string(&highlight).unwrap();
        let back: DocumentHighlight = serde_json::from_str(&json).unwrap();
        assert_eq!(back, highlight);
        assert_eq!(back.span_count(), 1);
        assert_eq!(back.lines[0].spans[0].matched_text.as_deref(), Some("if"));
    }
}
