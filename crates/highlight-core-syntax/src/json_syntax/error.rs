use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by the JSON grammar loader/compiler.
///
/// Tokenization itself never fails: unknown states and zero-width matches
/// are recovered locally by advancing one character.
pub enum SyntaxError {
    #[error("JSON parse error: {0}")]
    /// Grammar JSON parsing failed.
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("missing required field: {0}")]
    /// A required field was missing from a grammar definition.
    MissingField(&'static str),

    #[error("unknown state '{0}'")]
    /// A referenced state name does not exist in the grammar.
    UnknownState(String),

    #[error("unknown style '{0}'")]
    /// A rule references a style that is neither declared nor registered.
    UnknownStyle(String),

    #[error("unknown variable '{0}'")]
    /// A referenced variable name does not exist.
    UnknownVariable(String),

    #[error("circular variable reference '{0}'")]
    /// Variable expansion loop detected.
    CircularVariableReference(String),

    #[error("unknown grammar reference '{0}'")]
    /// A `reference` names a grammar the provider cannot resolve.
    UnknownGrammarReference(String),

    #[error("circular sub-state reference '{0}'")]
    /// Sub-state resolution loop detected.
    CircularSubState(String),

    #[error("capture group {group} out of range for pattern '{pattern}'")]
    /// A `styles` entry addresses a group the pattern does not have.
    GroupOutOfRange {
        /// The out-of-range group number.
        group: u32,
        /// The rule's pattern source.
        pattern: String,
    },

    #[error("regex compile error for pattern '{pattern}': {message}")]
    /// A regex pattern failed to compile.
    RegexCompile {
        /// The regex pattern string.
        pattern: String,
        /// The compiler error message.
        message: String,
    },
}
