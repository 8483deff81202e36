//! Document line buffer.
//!
//! A [`Document`] stores text as explicit lines with their original
//! terminators and provides the character-indexed view the analyzers
//! consume: line text never includes the terminator, while document-wide
//! character indices count it (two characters for CRLF, one for LF or bare
//! CR). Patch coordinates outside the document are clamped rather than
//! rejected.

use crate::line_ending::LineEnding;
use crate::span::{Position, Range};
use crate::utf8;

/// One line of a document plus the terminator that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLine {
    /// Line text without the terminator.
    pub text: String,
    /// The terminator that followed the line.
    pub ending: LineEnding,
}

/// An in-memory document addressed by line/column character coordinates.
///
/// A document always has at least one line: empty text is a single empty
/// line, and text ending in a terminator has a trailing empty line after it.
#[derive(Debug, Clone)]
pub struct Document {
    uri: String,
    lines: Vec<DocumentLine>,
}

impl Document {
    /// Create a document from its URI and full text.
    pub fn new(uri: impl Into<String>, text: &str) -> Self {
        Self {
            uri: uri.into(),
            lines: split_lines(text),
        }
    }

    /// The document URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Number of lines, including the trailing empty line after a final
    /// terminator.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The line at `line`.
    pub fn line(&self, line: usize) -> &DocumentLine {
        &self.lines[line]
    }

    /// Character count of the line at `line`, terminator excluded.
    pub fn line_char_count(&self, line: usize) -> usize {
        utf8::char_count(&self.lines[line].text)
    }

    /// Character index of the first character of `line`.
    pub fn char_index_of_line(&self, line: usize) -> usize {
        self.lines[..line.min(self.lines.len())]
            .iter()
            .map(|l| utf8::char_count(&l.text) + l.ending.width())
            .sum()
    }

    /// Total character count, terminators included.
    pub fn total_chars(&self) -> usize {
        self.char_index_of_line(self.lines.len())
    }

    /// Position of the character at `index`, clamped into the document.
    ///
    /// Indices pointing into a terminator resolve to the end of that line.
    pub fn char_index_to_position(&self, index: usize) -> Position {
        let mut line_start = 0usize;
        for (line_num, line) in self.lines.iter().enumerate() {
            let chars = utf8::char_count(&line.text);
            let width = chars + line.ending.width();
            if index < line_start + width || line_num + 1 == self.lines.len() {
                let column = index.saturating_sub(line_start).min(chars);
                return Position::new(line_num as u32, column as u32, (line_start + column) as u32);
            }
            line_start += width;
        }
        Position::default()
    }

    /// Replace `range` with `new_text`, returning the signed change in line
    /// count. Out-of-range coordinates are clamped to the document.
    pub fn patch(&mut self, range: Range, new_text: &str) -> i32 {
        let old_line_count = self.lines.len() as i32;

        let start_line = (range.start.line as usize).min(self.lines.len() - 1);
        let end_line = (range.end.line as usize)
            .min(self.lines.len() - 1)
            .max(start_line);
        let start_column = (range.start.column as usize).min(self.line_char_count(start_line));
        let end_column = (range.end.column as usize).min(self.line_char_count(end_line));

        let prefix = utf8::substr_chars(&self.lines[start_line].text, 0, start_column);
        let end_text = &self.lines[end_line].text;
        let end_chars = utf8::char_count(end_text);
        let suffix = utf8::substr_chars(end_text, end_column, end_chars - end_column);
        let tail_ending = self.lines[end_line].ending;

        let mut replacement = split_lines(&format!("{prefix}{new_text}{suffix}"));
        if let Some(last) = replacement.last_mut() {
            last.ending = tail_ending;
        }

        self.lines.splice(start_line..=end_line, replacement);
        self.lines.len() as i32 - old_line_count
    }
}

/// Split `text` into lines, recognizing LF, CRLF and bare CR terminators.
/// The text after the final terminator is always a line, possibly empty.
fn split_lines(text: &str) -> Vec<DocumentLine> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut line_start = 0usize;
    let mut pos = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                lines.push(DocumentLine {
                    text: text[line_start..pos].to_string(),
                    ending: LineEnding::Lf,
                });
                pos += 1;
                line_start = pos;
            }
            b'\r' => {
                let crlf = bytes.get(pos + 1) == Some(&b'\n');
                lines.push(DocumentLine {
                    text: text[line_start..pos].to_string(),
                    ending: if crlf { LineEnding::Crlf } else { LineEnding::Cr },
                });
                pos += if crlf { 2 } else { 1 };
                line_start = pos;
            }
            _ => pos += 1,
        }
    }
    lines.push(DocumentLine {
        text: text[line_start..].to_string(),
        ending: LineEnding::None,
    });
    lines
}
