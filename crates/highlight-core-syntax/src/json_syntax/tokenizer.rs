use crate::json_syntax::compiler::{NO_STATE, NO_STYLE, StateRule, SyntaxRule, TokenRule};
use crate::json_syntax::engine::HighlightConfig;
use highlight_core::span::{LineHighlight, Position, TokenSpan};
use highlight_core::utf8;
use onig::{Regex, Region, SearchOptions};
use std::sync::Arc;

/// Input coordinates for one line tokenization.
#[derive(Debug, Clone, Copy)]
pub struct TextLineInfo {
    /// Zero-based line number.
    pub line: usize,
    /// Lexer state at the start of the line.
    pub start_state: i32,
    /// Character index of the line start within the document.
    pub start_char_offset: usize,
}

/// Output of one line tokenization.
#[derive(Debug, Default)]
pub struct LineAnalyzeResult {
    /// Spans produced for the line.
    pub highlight: LineHighlight,
    /// Lexer state at the end of the line.
    pub end_state: i32,
    /// Character count of the line, terminator excluded.
    pub char_count: usize,
}

#[derive(Debug)]
struct CaptureGroupMatch {
    style: i32,
    start: usize,
    length: usize,
}

/// Everything known about one successful match before emission: position and
/// length in character units, the winning rule's style/transition, matched
/// capture groups, and sub-grammar spans in match-local columns.
#[derive(Debug)]
struct MatchOutcome {
    start: usize,
    length: usize,
    style: i32,
    goto_state: i32,
    matched_text: String,
    capture_groups: Vec<CaptureGroupMatch>,
    sub_spans: Vec<TokenSpan>,
}

/// Tokenizes single lines against a compiled grammar.
///
/// The tokenizer is stateless between lines: callers thread the end state of
/// one line into the next line's [`TextLineInfo`].
pub struct LineTokenizer {
    rule: Arc<SyntaxRule>,
    config: HighlightConfig,
}

impl LineTokenizer {
    /// Create a tokenizer over a compiled grammar.
    pub fn new(rule: Arc<SyntaxRule>, config: HighlightConfig) -> Self {
        Self { rule, config }
    }

    /// The grammar this tokenizer runs.
    pub fn syntax_rule(&self) -> &Arc<SyntaxRule> {
        &self.rule
    }

    /// Tokenize one line, returning its spans and end-of-line state.
    ///
    /// Characters no rule matches produce no span; an unknown state or a
    /// zero-width match advances the cursor by one character, so the loop
    /// always terminates. The state's `line_end_state` is applied after the
    /// last match, except on empty line text.
    pub fn tokenize_line(&self, text: &str, info: &TextLineInfo) -> LineAnalyzeResult {
        let mut result = LineAnalyzeResult {
            end_state: info.start_state,
            ..LineAnalyzeResult::default()
        };
        if text.is_empty() {
            return result;
        }

        let line_char_count = utf8::char_count(text);
        let mut current_char_pos = 0usize;
        let mut current_state = info.start_state;

        while current_char_pos < line_char_count {
            let Some(outcome) = self.match_at(text, current_char_pos, current_state) else {
                current_char_pos += 1;
                continue;
            };
            self.emit(&mut result.highlight, info, current_state, &outcome);
            current_char_pos = outcome.start + outcome.length;
            if outcome.goto_state >= 0 {
                current_state = outcome.goto_state;
            }
        }

        if let Some(state_rule) = self.rule.state_rule(current_state)
            && state_rule.line_end_state >= 0
        {
            current_state = state_rule.line_end_state;
        }
        result.end_state = current_state;
        result.char_count = line_char_count;
        result
    }

    fn match_at(&self, text: &str, start_char_pos: usize, state: i32) -> Option<MatchOutcome> {
        let state_rule = self.rule.state_rule(state)?;
        self.match_against(text, start_char_pos, state_rule)
    }

    fn match_against(
        &self,
        text: &str,
        start_char_pos: usize,
        state_rule: &StateRule,
    ) -> Option<MatchOutcome> {
        let start_byte = utf8::char_to_byte(text, start_char_pos);
        let region = search(&state_rule.regex, text, start_byte)?;
        let (match_start_byte, match_end_byte) = region.pos(0)?;
        if match_end_byte <= match_start_byte {
            return None;
        }

        let match_start_char = utf8::byte_to_char(text, match_start_byte);
        let match_end_char = utf8::byte_to_char(text, match_end_byte);

        let mut outcome = MatchOutcome {
            start: match_start_char,
            length: match_end_char - match_start_char,
            style: NO_STYLE,
            goto_state: NO_STATE,
            matched_text: text[match_start_byte..match_end_byte].to_string(),
            capture_groups: Vec::new(),
            sub_spans: Vec::new(),
        };

        if let Some(token_rule) = resolve_token_rule(
            state_rule,
            &region,
            text,
            match_start_byte,
            match_end_byte,
            &mut outcome,
        ) && let Some(sub_rule) = &token_rule.sub_state_rule
        {
            self.collect_sub_spans(sub_rule, &mut outcome);
        }

        Some(outcome)
    }

    /// Tile the matched text with the sub-grammar's spans, in match-local
    /// columns: gaps before, between and after sub-matches get the parent
    /// rule's default style, so the parent match is fully covered.
    fn collect_sub_spans(&self, sub_rule: &StateRule, outcome: &mut MatchOutcome) {
        let sub_text = std::mem::take(&mut outcome.matched_text);
        let sub_len = utf8::char_count(&sub_text);
        let mut sub_pos = 0usize;

        while sub_pos < sub_len {
            let Some(sub_res) = self.match_against(&sub_text, sub_pos, sub_rule) else {
                break;
            };

            if sub_res.start > sub_pos {
                outcome
                    .sub_spans
                    .push(self.plain_span(sub_pos, sub_res.start, outcome.style));
            }

            if !sub_res.sub_spans.is_empty() {
                // A nested sub-match contributes its spans shifted from
                // its own local columns into ours.
                for mut span in sub_res.sub_spans {
                    span.range.start.column += sub_res.start as u32;
                    span.range.end.column += sub_res.start as u32;
                    outcome.sub_spans.push(span);
                }
            } else if !sub_res.capture_groups.is_empty() {
                for group in &sub_res.capture_groups {
                    outcome.sub_spans.push(self.plain_span(
                        group.start,
                        group.start + group.length,
                        group.style,
                    ));
                }
            } else {
                outcome.sub_spans.push(self.plain_span(
                    sub_res.start,
                    sub_res.start + sub_res.length,
                    sub_res.style,
                ));
            }

            sub_pos = sub_res.start + sub_res.length;
            if sub_res.length == 0 {
                sub_pos += 1;
            }
        }

        if sub_pos < sub_len {
            outcome
                .sub_spans
                .push(self.plain_span(sub_pos, sub_len, outcome.style));
        }

        outcome.matched_text = sub_text;
    }

    /// A span in match-local columns carrying only a style.
    fn plain_span(&self, start_column: usize, end_column: usize, style: i32) -> TokenSpan {
        let mut span = TokenSpan {
            style_id: style,
            ..TokenSpan::default()
        };
        span.range.start.column = start_column as u32;
        span.range.end.column = end_column as u32;
        if self.config.inline_style {
            span.inline_style = self.rule.inline_style(style).map(str::to_string);
        }
        span
    }

    fn emit(
        &self,
        highlight: &mut LineHighlight,
        info: &TextLineInfo,
        state: i32,
        outcome: &MatchOutcome,
    ) {
        if !outcome.sub_spans.is_empty() {
            // Sub-grammar matches replace the match's own span entirely.
            for sub in &outcome.sub_spans {
                let mut span = sub.clone();
                span.range.start.column += outcome.start as u32;
                span.range.end.column += outcome.start as u32;
                span.range.start.line = info.line as u32;
                span.range.end.line = info.line as u32;
                span.range.start.index =
                    (info.start_char_offset + span.range.start.column as usize) as u32;
                span.range.end.index =
                    (info.start_char_offset + span.range.end.column as usize) as u32;
                span.state = state;
                highlight.push_or_merge_span(span);
            }
        } else if outcome.capture_groups.is_empty() {
            let mut span = TokenSpan {
                style_id: outcome.style,
                state,
                goto_state: outcome.goto_state,
                matched_text: Some(outcome.matched_text.clone()),
                ..TokenSpan::default()
            };
            span.range.start = line_position(info, outcome.start);
            span.range.end = line_position(info, outcome.start + outcome.length);
            if self.config.inline_style {
                span.inline_style = self.rule.inline_style(outcome.style).map(str::to_string);
            }
            highlight.push_or_merge_span(span);
        } else {
            for group in &outcome.capture_groups {
                let mut span = TokenSpan {
                    style_id: group.style,
                    state,
                    goto_state: outcome.goto_state,
                    ..TokenSpan::default()
                };
                span.range.start = line_position(info, group.start);
                span.range.end = line_position(info, group.start + group.length);
                if self.config.inline_style {
                    span.inline_style = self.rule.inline_style(group.style).map(str::to_string);
                }
                highlight.push_or_merge_span(span);
            }
        }
    }
}

/// Resolve which token rule produced the match: the first rule whose wrapper
/// group equals the whole-match byte span. Fills the outcome's style,
/// transition and capture groups on success.
fn resolve_token_rule<'r>(
    state_rule: &'r StateRule,
    region: &Region,
    text: &str,
    match_start_byte: usize,
    match_end_byte: usize,
    outcome: &mut MatchOutcome,
) -> Option<&'r TokenRule> {
    for token_rule in &state_rule.token_rules {
        if region.pos(token_rule.group_offset_start) != Some((match_start_byte, match_end_byte)) {
            continue;
        }

        outcome.goto_state = token_rule.goto_state;
        outcome.style = token_rule.group_style_id(0);

        for group in 1..=token_rule.group_count {
            let absolute_group = token_rule.group_offset_start + group;
            let Some((group_start_byte, group_end_byte)) = region.pos(absolute_group) else {
                continue;
            };
            if group_start_byte < match_start_byte || group_end_byte > match_end_byte {
                continue;
            }
            let group_start_char = utf8::byte_to_char(text, group_start_byte);
            let group_end_char = utf8::byte_to_char(text, group_end_byte);
            outcome.capture_groups.push(CaptureGroupMatch {
                style: token_rule.group_style_id(group),
                start: group_start_char,
                length: group_end_char - group_start_char,
            });
        }
        return Some(token_rule);
    }
    None
}

fn line_position(info: &TextLineInfo, column: usize) -> Position {
    Position::new(
        info.line as u32,
        column as u32,
        (info.start_char_offset + column) as u32,
    )
}

/// Forward, unanchored search from `from_byte`. The scratch region is owned
/// by the call and dropped on every exit path.
fn search(regex: &Regex, text: &str, from_byte: usize) -> Option<Region> {
    let mut region = Region::new();
    regex.search_with_options(
        text,
        from_byte,
        text.len(),
        SearchOptions::SEARCH_OPTION_NONE,
        Some(&mut region),
    )?;
    Some(region)
}
