#![warn(missing_docs)]
//! Regex-driven state-machine syntax highlighting for `highlight-core`.
//!
//! Grammars are JSON documents describing named lexer states, each an
//! ordered list of regex rules with styles, state transitions and optional
//! sub-grammars. Compiled grammars are immutable and shared; per-document
//! analyzers own their line-state vector and support incremental
//! re-analysis after arbitrary text edits.

pub mod json_syntax;

pub use json_syntax::{
    DocumentAnalyzer, GrammarDefinition, HighlightConfig, HighlightEngine, LineAnalyzeResult,
    LineTokenizer, StateRule, StyleMapping, SyntaxError, SyntaxRule, SyntaxRuleCompiler,
    TextAnalyzer, TextLineInfo, TokenRule,
};
