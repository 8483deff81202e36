use crate::json_syntax::analyzer::{DocumentAnalyzer, TextAnalyzer};
use crate::json_syntax::compiler::{SyntaxRule, SyntaxRuleCompiler};
use crate::json_syntax::error::SyntaxError;
use crate::json_syntax::style::StyleMapping;
use highlight_core::document::Document;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Highlighting options shared by every analyzer an engine creates.
#[derive(Debug, Default, Clone, Copy)]
pub struct HighlightConfig {
    /// Stamp every emitted span with its resolved inline style string.
    pub inline_style: bool,
    /// Keep trailing-span document indices exact during incremental analysis.
    pub show_index: bool,
}

/// Grammar registry and per-document analyzer cache.
///
/// Grammars compiled through one engine share its [`StyleMapping`], and
/// later grammars may reference earlier ones by name from embedded-language
/// states. Document analyzers are cached by URI; the engine hands out
/// mutable access so callers drive full or incremental analysis themselves.
pub struct HighlightEngine {
    config: HighlightConfig,
    styles: StyleMapping,
    rules: Vec<Arc<SyntaxRule>>,
    analyzers: HashMap<String, DocumentAnalyzer>,
}

impl HighlightEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            config,
            styles: StyleMapping::new(),
            rules: Vec::new(),
            analyzers: HashMap::new(),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> HighlightConfig {
        self.config
    }

    /// Compile a grammar from JSON source and register it.
    pub fn compile_syntax_from_json(
        &mut self,
        json: &str,
    ) -> Result<Arc<SyntaxRule>, SyntaxError> {
        let rules = &self.rules;
        let provider = |name: &str| rules.iter().find(|r| r.name == name).cloned();
        let rule = SyntaxRuleCompiler::new(&mut self.styles, &provider).compile_from_json(json)?;
        debug!(name = %rule.name, states = rule.states.len(), "compiled syntax rule");
        self.rules.push(rule.clone());
        Ok(rule)
    }

    /// Compile a grammar from a JSON file and register it.
    pub fn compile_syntax_from_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<SyntaxRule>, SyntaxError> {
        let rules = &self.rules;
        let provider = |name: &str| rules.iter().find(|r| r.name == name).cloned();
        let rule = SyntaxRuleCompiler::new(&mut self.styles, &provider).compile_from_file(path)?;
        debug!(name = %rule.name, states = rule.states.len(), "compiled syntax rule");
        self.rules.push(rule.clone());
        Ok(rule)
    }

    /// Registered grammar by name.
    pub fn syntax_rule_by_name(&self, name: &str) -> Option<Arc<SyntaxRule>> {
        self.rules.iter().find(|r| r.name == name).cloned()
    }

    /// Registered grammar by file extension; a missing leading `.` is
    /// normalized in.
    pub fn syntax_rule_by_extension(&self, extension: &str) -> Option<Arc<SyntaxRule>> {
        if extension.is_empty() {
            return None;
        }
        let fixed = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{extension}")
        };
        self.rules
            .iter()
            .find(|r| r.file_extensions.contains(&fixed))
            .cloned()
    }

    /// Pin a style name to an id before compiling grammars.
    pub fn register_style_name(&mut self, name: &str, style_id: i32) {
        self.styles.register(name, style_id);
    }

    /// Style name for an id allocated by registration or compilation.
    pub fn style_name(&self, style_id: i32) -> Option<&str> {
        self.styles.style_name(style_id)
    }

    /// Text analyzer for a grammar name, or `None` if unknown.
    pub fn create_analyzer_by_name(&self, name: &str) -> Option<TextAnalyzer> {
        Some(TextAnalyzer::new(
            self.syntax_rule_by_name(name)?,
            self.config,
        ))
    }

    /// Text analyzer for a file extension, or `None` if no grammar matches.
    pub fn create_analyzer_by_extension(&self, extension: &str) -> Option<TextAnalyzer> {
        Some(TextAnalyzer::new(
            self.syntax_rule_by_extension(extension)?,
            self.config,
        ))
    }

    /// Load (or return the cached) document analyzer for `document`'s URI.
    ///
    /// The grammar is resolved from the URI's file extension on first load;
    /// returns `None` — and drops the document — when no grammar matches.
    pub fn load_document(&mut self, document: Document) -> Option<&mut DocumentAnalyzer> {
        let uri = document.uri().to_string();
        if !self.analyzers.contains_key(&uri) {
            let rule = self.syntax_rule_by_extension(&file_extension(&uri)?)?;
            debug!(uri = %uri, grammar = %rule.name, "loaded document");
            self.analyzers
                .insert(uri.clone(), DocumentAnalyzer::new(document, rule, self.config));
        }
        self.analyzers.get_mut(&uri)
    }

    /// Analyzer previously created by [`load_document`](Self::load_document).
    pub fn document_analyzer(&mut self, uri: &str) -> Option<&mut DocumentAnalyzer> {
        self.analyzers.get_mut(uri)
    }

    /// Drop the cached analyzer for `uri`.
    pub fn remove_document(&mut self, uri: &str) {
        self.analyzers.remove(uri);
    }
}

fn file_extension(uri: &str) -> Option<String> {
    let name = uri.rsplit(['/', '\\']).next().unwrap_or(uri);
    let dot = name.rfind('.')?;
    Some(name[dot..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_GRAMMAR: &str = r#"{
        "name": "Demo",
        "fileExtensions": [".demo"],
        "styles": [{ "name": "keyword" }],
        "states": {
            "default": [{ "pattern": "\\bif\\b", "style": "keyword" }]
        }
    }"#;

    #[test]
    fn test_lookup_by_name_and_extension() {
        let mut engine = HighlightEngine::new(HighlightConfig::default());
        engine.compile_syntax_from_json(DEMO_GRAMMAR).unwrap();

        assert!(engine.syntax_rule_by_name("Demo").is_some());
        assert!(engine.syntax_rule_by_name("Nope").is_none());
        assert!(engine.syntax_rule_by_extension(".demo").is_some());
        assert!(engine.syntax_rule_by_extension("demo").is_some());
        assert!(engine.syntax_rule_by_extension("").is_none());
        assert!(engine.syntax_rule_by_extension(".txt").is_none());
    }

    #[test]
    fn test_registered_style_id_is_honored() {
        let mut engine = HighlightEngine::new(HighlightConfig::default());
        engine.register_style_name("keyword", 7);
        engine.compile_syntax_from_json(DEMO_GRAMMAR).unwrap();
        assert_eq!(engine.style_name(7), Some("keyword"));
    }

    #[test]
    fn test_load_document_caches_by_uri() {
        let mut engine = HighlightEngine::new(HighlightConfig::default());
        engine.compile_syntax_from_json(DEMO_GRAMMAR).unwrap();

        let analyzer = engine
            .load_document(Document::new("file:///x.demo", "if a"))
            .expect("grammar matches extension");
        analyzer.analyze();
        assert_eq!(analyzer.highlight().lines.len(), 1);

        // Loading the same URI returns the cached analyzer with its state.
        let analyzer = engine
            .load_document(Document::new("file:///x.demo", "ignored"))
            .unwrap();
        assert_eq!(analyzer.document().line(0).text, "if a");

        engine.remove_document("file:///x.demo");
        assert!(engine.document_analyzer("file:///x.demo").is_none());
    }

    #[test]
    fn test_load_document_without_grammar_is_none() {
        let mut engine = HighlightEngine::new(HighlightConfig::default());
        engine.compile_syntax_from_json(DEMO_GRAMMAR).unwrap();
        assert!(engine.load_document(Document::new("file:///x.txt", "if")).is_none());
        assert!(engine.load_document(Document::new("noextension", "if")).is_none());
    }

    #[test]
    fn test_analyzer_constructors() {
        let mut engine = HighlightEngine::new(HighlightConfig::default());
        engine.compile_syntax_from_json(DEMO_GRAMMAR).unwrap();
        assert!(engine.create_analyzer_by_name("Demo").is_some());
        assert!(engine.create_analyzer_by_name("Nope").is_none());
        assert!(engine.create_analyzer_by_extension("demo").is_some());
    }
}
