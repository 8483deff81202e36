//! JSON lexer-grammar support.
//!
//! This module implements a regex-driven state-machine highlighter based on
//! JSON grammar definitions: a compiler producing immutable [`SyntaxRule`]s,
//! a line tokenizer, full/incremental document analyzers and the engine
//! registry tying them together.

mod analyzer;
mod compiler;
mod definition;
mod engine;
mod error;
mod style;
mod tokenizer;

pub use analyzer::{DocumentAnalyzer, TextAnalyzer};
pub use compiler::{
    GrammarProvider, NO_STATE, NO_STYLE, StateRule, SyntaxRule, SyntaxRuleCompiler, TokenRule,
};
pub use definition::{
    GrammarDefinition, GroupStyleList, ReferencedStateDefinition, RuleDefinition, StateDefinition,
    StyleDefinition,
};
pub use engine::{HighlightConfig, HighlightEngine};
pub use error::SyntaxError;
pub use style::StyleMapping;
pub use tokenizer::{LineAnalyzeResult, LineTokenizer, TextLineInfo};
