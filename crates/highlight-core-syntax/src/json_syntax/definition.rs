use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Raw JSON grammar definition.
///
/// This is the on-disk shape;
/// [`SyntaxRuleCompiler`](crate::json_syntax::SyntaxRuleCompiler) turns it
/// into the runtime [`SyntaxRule`](crate::json_syntax::SyntaxRule).
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarDefinition {
    /// Grammar name, used to resolve `reference` states from other grammars.
    pub name: String,

    #[serde(rename = "fileExtensions", default)]
    /// File extensions associated with this grammar.
    pub file_extensions: Vec<String>,

    #[serde(default)]
    /// Style declarations interned into the engine style mapping.
    pub styles: Vec<StyleDefinition>,

    #[serde(default)]
    /// Regex fragments referenced from patterns as `${name}`.
    pub variables: HashMap<String, String>,

    /// Lexer states keyed by state name; `"default"` is the entry state.
    pub states: HashMap<String, StateDefinition>,
}

/// A style declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct StyleDefinition {
    /// Style name referenced from rules.
    pub name: String,

    #[serde(default)]
    /// Foreground color, passed through to the inline style string.
    pub foreground: Option<String>,

    #[serde(default)]
    /// Background color.
    pub background: Option<String>,

    #[serde(default)]
    /// Free-form render tags (e.g. `bold`, `italic`).
    pub tags: Vec<String>,
}

/// A state body: either a plain rule list or an embedded-language state.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StateDefinition {
    /// An ordered rule list.
    Rules(Vec<RuleDefinition>),
    /// An embedded-language state referencing another grammar.
    Referenced(ReferencedStateDefinition),
}

/// An embedded-language state body.
///
/// The listed rules are tried first; content they do not claim is handed to
/// the referenced grammar's default state as a sub-grammar.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferencedStateDefinition {
    /// Name of the grammar whose default state highlights remaining content.
    pub reference: String,

    #[serde(default)]
    /// Rules tried before the embedded grammar.
    pub rules: Vec<RuleDefinition>,

    #[serde(rename = "onLineEndState", default)]
    /// Forced state transition at end of line.
    pub on_line_end_state: Option<String>,
}

/// A single rule in a state, or a bare `onLineEndState` directive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    /// Regex source; absent only for a bare `onLineEndState` entry.
    pub pattern: Option<String>,

    #[serde(default)]
    /// Style name for the whole match.
    pub style: Option<String>,

    #[serde(default)]
    /// Per-capture-group style names.
    pub styles: Option<GroupStyleList>,

    #[serde(default)]
    /// Goto state entered after the match.
    pub state: Option<String>,

    #[serde(rename = "subState", default)]
    /// Same-grammar state tokenizing the matched text as a sub-grammar.
    pub sub_state: Option<String>,

    #[serde(rename = "onLineEndState", default)]
    /// Forced state transition at end of line.
    pub on_line_end_state: Option<String>,
}

/// Alternating `[group, style, group, style, …]` list from the JSON form.
#[derive(Debug, Clone, Default)]
pub struct GroupStyleList(pub Vec<(u32, String)>);

impl<'de> Deserialize<'de> for GroupStyleList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<Value>::deserialize(deserializer)?;
        if values.len() % 2 != 0 {
            return Err(serde::de::Error::custom(
                "styles list must alternate group numbers and style names",
            ));
        }
        let mut pairs = Vec::with_capacity(values.len() / 2);
        for chunk in values.chunks(2) {
            let group = chunk[0]
                .as_u64()
                .ok_or_else(|| serde::de::Error::custom("expected capture group number"))?;
            let style = chunk[1]
                .as_str()
                .ok_or_else(|| serde::de::Error::custom("expected style name"))?;
            pairs.push((group as u32, style.to_string()));
        }
        Ok(Self(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_list_state() {
        let json = r##"{
            "name": "Demo",
            "fileExtensions": [".demo"],
            "styles": [{ "name": "keyword", "foreground": "#569cd6", "tags": ["bold"] }],
            "states": {
                "default": [
                    { "pattern": "\\bif\\b", "style": "keyword" },
                    { "onLineEndState": "default" }
                ]
            }
        }"##;
        let definition: GrammarDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.name, "Demo");
        let StateDefinition::Rules(rules) = &definition.states["default"] else {
            panic!("expected a rule list");
        };
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].style.as_deref(), Some("keyword"));
        assert_eq!(rules[1].on_line_end_state.as_deref(), Some("default"));
    }

    #[test]
    fn test_referenced_state() {
        let json = r#"{
            "name": "Demo",
            "states": {
                "default": [],
                "embed": {
                    "reference": "CPP",
                    "rules": [{ "pattern": "@end", "style": "keyword", "state": "default" }],
                    "onLineEndState": "embed"
                }
            }
        }"#;
        let definition: GrammarDefinition = serde_json::from_str(json).unwrap();
        let StateDefinition::Referenced(referenced) = &definition.states["embed"] else {
            panic!("expected a referenced state");
        };
        assert_eq!(referenced.reference, "CPP");
        assert_eq!(referenced.rules.len(), 1);
        assert_eq!(referenced.on_line_end_state.as_deref(), Some("embed"));
    }

    #[test]
    fn test_group_style_list() {
        let json = r#"[1, "keyword", 2, "class"]"#;
        let list: GroupStyleList = serde_json::from_str(json).unwrap();
        assert_eq!(
            list.0,
            vec![(1, "keyword".to_string()), (2, "class".to_string())]
        );

        let odd = serde_json::from_str::<GroupStyleList>(r#"[1, "keyword", 2]"#);
        assert!(odd.is_err());
    }
}
