//! Incremental re-analysis must always converge to the same highlight a
//! full pass over the final text produces, for every edit shape: same-line
//! replacements, line insertions, line deletions, and edits that flip the
//! state of everything downstream.

use highlight_core::{Document, LineEnding, Position, Range};
use highlight_core_syntax::{HighlightConfig, HighlightEngine};

const GRAMMAR: &str = r#"{
    "name": "Mixed",
    "fileExtensions": [".mix"],
    "styles": [
        { "name": "comment" },
        { "name": "keyword" },
        { "name": "number" }
    ],
    "states": {
        "default": [
            { "pattern": "/\\*", "style": "comment", "state": "block" },
            { "pattern": "//.*", "style": "comment" },
            { "pattern": "\\b(?:if|else|return)\\b", "style": "keyword" },
            { "pattern": "\\b[0-9]+\\b", "style": "number" }
        ],
        "block": [
            { "pattern": "\\*/", "style": "comment", "state": "default" },
            { "onLineEndState": "block" }
        ]
    }
}"#;

fn engine() -> HighlightEngine {
    let mut engine = HighlightEngine::new(HighlightConfig {
        inline_style: false,
        show_index: true,
    });
    engine.compile_syntax_from_json(GRAMMAR).unwrap();
    engine
}

fn position(line: u32, column: u32) -> Position {
    // The document buffer patches by line/column; the index is unused there.
    Position::new(line, column, 0)
}

fn document_text(document: &Document) -> String {
    let mut out = String::new();
    for line_num in 0..document.line_count() {
        let line = document.line(line_num);
        out.push_str(&line.text);
        out.push_str(match line.ending {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
            LineEnding::None => "",
        });
    }
    out
}

/// Apply `edits` incrementally and verify the result against a fresh full
/// analysis of the final text after every single edit.
fn check_edit_sequence(initial: &str, edits: &[(Range, &str)]) {
    let mut incremental_engine = engine();
    let analyzer = incremental_engine
        .load_document(Document::new("file:///doc.mix", initial))
        .unwrap();
    analyzer.analyze();

    for (edit_range, new_text) in edits {
        let incremental = analyzer.analyze_incremental(*edit_range, new_text).clone();
        let incremental_states = analyzer.line_states().to_vec();
        let patched_text = document_text(analyzer.document());

        let mut full_engine = engine();
        let full_analyzer = full_engine
            .load_document(Document::new("file:///full.mix", &patched_text))
            .unwrap();
        let full = full_analyzer.analyze().clone();

        assert_eq!(
            incremental, full,
            "incremental highlight diverged after patching to {patched_text:?}"
        );
        assert_eq!(incremental_states, full_analyzer.line_states());
        assert_eq!(incremental.lines.len(), analyzer.document().line_count());
    }
}

#[test]
fn test_same_line_replacement() {
    check_edit_sequence(
        "/*\nhi\n*/",
        &[(
            Range {
                start: position(1, 0),
                end: position(1, 2),
            },
            "hi there",
        )],
    );
}

#[test]
fn test_insertion_of_lines() {
    check_edit_sequence(
        "if 1\nreturn 2",
        &[(
            Range {
                start: position(0, 4),
                end: position(0, 4),
            },
            "\nif 3\nif 4",
        )],
    );
}

#[test]
fn test_deletion_of_lines() {
    check_edit_sequence(
        "if 1\n/*\nhidden\n*/\nreturn 2",
        &[(
            Range {
                start: position(1, 0),
                end: position(3, 2),
            },
            "",
        )],
    );
}

#[test]
fn test_edit_cascading_to_document_end() {
    // Opening a block comment at the top changes the state of every
    // following line, so no stability point exists.
    check_edit_sequence(
        "if 1\nif 2\nif 3",
        &[(
            Range {
                start: position(0, 0),
                end: position(0, 0),
            },
            "/* ",
        )],
    );
}

#[test]
fn test_edit_sequence_reopens_and_closes_comment() {
    let open = Range {
        start: position(0, 0),
        end: position(0, 0),
    };
    let close = Range {
        start: position(2, 0),
        end: position(2, 0),
    };
    check_edit_sequence(
        "if 1\nif 2\nif 3",
        &[(open, "/* "), (close, "*/ "), (open, "if 0\n")],
    );
}

#[test]
fn test_crlf_document_edit() {
    check_edit_sequence(
        "if 1\r\nif 22\r\nif 3",
        &[(
            Range {
                start: position(1, 3),
                end: position(1, 5),
            },
            "4567",
        )],
    );
}

#[test]
fn test_delete_trailing_line() {
    check_edit_sequence(
        "if 1\nif 2\nif 3",
        &[(
            Range {
                start: position(1, 4),
                end: position(2, 4),
            },
            "",
        )],
    );
}

#[test]
fn test_index_consistency_after_incremental_edit() {
    let mut incremental_engine = engine();
    let analyzer = incremental_engine
        .load_document(Document::new(
            "file:///idx.mix",
            "if 1\nif 22\nif 333\nif 4444",
        ))
        .unwrap();
    analyzer.analyze();

    // Grow line 0 so every following line's document indices shift.
    analyzer.analyze_incremental(
        Range {
            start: position(0, 4),
            end: position(0, 4),
        },
        "000",
    );

    let document = analyzer.document();
    let highlight = analyzer.highlight();
    for (line_num, line) in highlight.lines.iter().enumerate() {
        let line_start = document.char_index_of_line(line_num);
        for span in &line.spans {
            assert_eq!(
                span.range.start.index as usize,
                line_start + span.range.start.column as usize
            );
            assert_eq!(
                span.range.end.index as usize,
                line_start + span.range.end.column as usize
            );
        }
    }
}

#[test]
fn test_index_range_entry_point_clamps() {
    let mut incremental_engine = engine();
    let analyzer = incremental_engine
        .load_document(Document::new("file:///r.mix", "if 1\nif 2"))
        .unwrap();
    analyzer.analyze();

    // End index far past the document is clamped to total_chars().
    let highlight = analyzer.analyze_incremental_chars(5, 9999, "return 7").clone();

    let mut full_engine = engine();
    let full = full_engine
        .load_document(Document::new("file:///r2.mix", "if 1\nreturn 7"))
        .unwrap()
        .analyze()
        .clone();
    assert_eq!(highlight, full);
}
