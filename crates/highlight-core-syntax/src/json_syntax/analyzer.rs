use crate::json_syntax::compiler::SyntaxRule;
use crate::json_syntax::engine::HighlightConfig;
use crate::json_syntax::tokenizer::{LineTokenizer, TextLineInfo};
use highlight_core::document::Document;
use highlight_core::span::{DocumentHighlight, LineHighlight, Range};
use std::sync::Arc;
use tracing::debug;

/// Stateless analyzer for raw text snippets.
pub struct TextAnalyzer {
    tokenizer: LineTokenizer,
}

impl TextAnalyzer {
    /// Create an analyzer over a compiled grammar.
    pub fn new(rule: Arc<SyntaxRule>, config: HighlightConfig) -> Self {
        Self {
            tokenizer: LineTokenizer::new(rule, config),
        }
    }

    /// Analyze `text` line by line, threading the lexer state across lines.
    ///
    /// Lines are split on `'\n'` with one trailing `'\r'` stripped; the text
    /// after the final `'\n'` is always tokenized, even when empty, so
    /// `"a\n"` produces two line highlights. A stripped CR still counts one
    /// character in the running start offset.
    pub fn analyze_text(&self, text: &str) -> DocumentHighlight {
        let mut highlight = DocumentHighlight::default();
        let mut info = TextLineInfo {
            line: 0,
            start_state: SyntaxRule::DEFAULT_STATE_ID,
            start_char_offset: 0,
        };

        for segment in text.split('\n') {
            let (line_text, has_cr) = match segment.strip_suffix('\r') {
                Some(stripped) => (stripped, true),
                None => (segment, false),
            };
            let result = self.tokenizer.tokenize_line(line_text, &info);
            highlight.add_line(result.highlight);
            info.line += 1;
            info.start_state = result.end_state;
            info.start_char_offset += result.char_count + usize::from(has_cr) + 1;
        }

        highlight
    }
}

/// Stateful per-document analyzer.
///
/// Owns the document, the per-line end-state vector and the current
/// [`DocumentHighlight`]; the two vectors grow and shrink in lockstep with
/// the document's line count. Calls must be serialized per document.
pub struct DocumentAnalyzer {
    document: Document,
    tokenizer: LineTokenizer,
    config: HighlightConfig,
    line_states: Vec<i32>,
    highlight: DocumentHighlight,
}

impl DocumentAnalyzer {
    /// Create an analyzer owning `document`.
    pub fn new(document: Document, rule: Arc<SyntaxRule>, config: HighlightConfig) -> Self {
        Self {
            document,
            tokenizer: LineTokenizer::new(rule, config),
            config,
            line_states: Vec::new(),
            highlight: DocumentHighlight::default(),
        }
    }

    /// The analyzed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// End-of-line states, one per document line (valid after a full pass).
    pub fn line_states(&self) -> &[i32] {
        &self.line_states
    }

    /// The current highlight.
    pub fn highlight(&self) -> &DocumentHighlight {
        &self.highlight
    }

    /// Analyze the whole document from scratch.
    pub fn analyze(&mut self) -> &DocumentHighlight {
        let line_count = self.document.line_count();
        self.line_states.clear();
        self.line_states
            .resize(line_count, SyntaxRule::DEFAULT_STATE_ID);
        self.highlight.reset();

        let mut current_state = SyntaxRule::DEFAULT_STATE_ID;
        let mut line_start_index = 0usize;
        for line in 0..line_count {
            let document_line = self.document.line(line);
            let info = TextLineInfo {
                line,
                start_state: current_state,
                start_char_offset: line_start_index,
            };
            let result = self.tokenizer.tokenize_line(&document_line.text, &info);
            let ending_width = document_line.ending.width();

            self.line_states[line] = result.end_state;
            current_state = result.end_state;
            line_start_index += result.char_count + ending_width;
            self.highlight.add_line(result.highlight);
        }
        &self.highlight
    }

    /// Apply a text patch and re-analyze from the edit start until the line
    /// states and highlights re-stabilize.
    ///
    /// Stability requires both the end-of-line state and the line highlight
    /// to equal their pre-edit values: everything downstream of a line
    /// depends only on its end state and its own text, so once a line past
    /// the edit reproduces both, the remainder of the document is
    /// unaffected. With `show_index` set, the document indices of the
    /// untouched trailing spans are re-based afterwards.
    pub fn analyze_incremental(&mut self, range: Range, new_text: &str) -> &DocumentHighlight {
        let line_change = self.document.patch(range, new_text);

        // Without a prior full pass there is nothing to patch up.
        if self.line_states.is_empty() {
            self.analyze();
            return &self.highlight;
        }

        let change_start_line = (range.start.line as usize).min(self.document.line_count() - 1);
        let range_end_line = (range.end.line as usize).min(self.line_states.len() - 1);
        let change_end_line = (range.end.line as i64 + i64::from(line_change)).max(0) as usize;

        if line_change < 0 {
            let remove_from = (range_end_line as i64 + i64::from(line_change) + 1).max(0) as usize;
            self.line_states.drain(remove_from..=range_end_line);
            self.highlight.lines.drain(remove_from..=range_end_line);
        } else if line_change > 0 {
            let insert_at = range_end_line + 1;
            let inserted = line_change as usize;
            self.line_states.splice(
                insert_at..insert_at,
                std::iter::repeat(SyntaxRule::DEFAULT_STATE_ID).take(inserted),
            );
            self.highlight.lines.splice(
                insert_at..insert_at,
                std::iter::repeat(LineHighlight::default()).take(inserted),
            );
        }

        let mut current_state = if change_start_line > 0 {
            self.line_states[change_start_line - 1]
        } else {
            SyntaxRule::DEFAULT_STATE_ID
        };

        let total_line_count = self.document.line_count();
        let mut line_start_index = self.document.char_index_of_line(change_start_line);
        let mut line = change_start_line;
        let mut stable = false;

        while line < total_line_count && !stable {
            let old_state = self.line_states[line];
            let document_line = self.document.line(line);
            let info = TextLineInfo {
                line,
                start_state: current_state,
                start_char_offset: line_start_index,
            };
            let result = self.tokenizer.tokenize_line(&document_line.text, &info);
            let ending_width = document_line.ending.width();

            self.line_states[line] = result.end_state;
            current_state = result.end_state;

            if line > change_end_line
                && old_state == current_state
                && self.highlight.lines[line] == result.highlight
            {
                stable = true;
                debug!(line, "incremental analysis re-stabilized");
            }

            self.highlight.lines[line] = result.highlight;
            line_start_index += result.char_count + ending_width;
            line += 1;
        }

        if self.config.show_index {
            while line < total_line_count {
                let line_chars = self.document.line_char_count(line);
                let ending_width = self.document.line(line).ending.width();
                for span in &mut self.highlight.lines[line].spans {
                    span.range.start.index =
                        (line_start_index + span.range.start.column as usize) as u32;
                    span.range.end.index =
                        (line_start_index + span.range.end.column as usize) as u32;
                }
                line_start_index += line_chars + ending_width;
                line += 1;
            }
        }

        &self.highlight
    }

    /// Incremental analysis addressed by document character indices.
    ///
    /// `end_index` is clamped to the document's total character count.
    pub fn analyze_incremental_chars(
        &mut self,
        start_index: usize,
        end_index: usize,
        new_text: &str,
    ) -> &DocumentHighlight {
        let start = self.document.char_index_to_position(start_index);
        let end_index = end_index.min(self.document.total_chars());
        let end = self.document.char_index_to_position(end_index);
        self.analyze_incremental(Range { start, end }, new_text)
    }
}
