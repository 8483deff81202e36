use crate::json_syntax::definition::{
    GrammarDefinition, ReferencedStateDefinition, RuleDefinition, StateDefinition, StyleDefinition,
};
use crate::json_syntax::error::SyntaxError;
use crate::json_syntax::style::StyleMapping;
use onig::Regex;
use regex::Regex as RustRegex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Sentinel style id for spans with no style assigned.
pub const NO_STYLE: i32 = -1;

/// Sentinel state id meaning "keep the current state".
pub const NO_STATE: i32 = -1;

/// A compiled grammar.
///
/// This is the immutable runtime representation consumed by the tokenizer.
/// It is shared (`Arc`) between the engine registry, analyzers and the
/// embedded-language states of other grammars.
#[derive(Debug)]
pub struct SyntaxRule {
    /// Grammar name.
    pub name: String,
    /// File extensions associated with this grammar.
    pub file_extensions: HashSet<String>,
    /// Compiled states keyed by state id; [`Self::DEFAULT_STATE_ID`] is the
    /// entry state.
    pub states: HashMap<i32, Arc<StateRule>>,
    /// Inline style strings keyed by style id.
    pub inline_styles: HashMap<i32, String>,
}

impl SyntaxRule {
    /// State id every document starts in.
    pub const DEFAULT_STATE_ID: i32 = 0;

    /// Compiled state for `state_id`, if the grammar defines it.
    pub fn state_rule(&self, state_id: i32) -> Option<&Arc<StateRule>> {
        self.states.get(&state_id)
    }

    /// Inline style string for `style_id`, if one was declared.
    pub fn inline_style(&self, style_id: i32) -> Option<&str> {
        self.inline_styles.get(&style_id).map(|s| s.as_str())
    }
}

/// One lexer state: a combined regex plus the token rules of its
/// alternatives.
///
/// The combined regex is `(p₁)|(p₂)|…`, so its top-level alternation
/// corresponds one-to-one with `token_rules` and every rule owns a
/// contiguous range of capture-group indices starting at its wrapper group.
#[derive(Debug)]
pub struct StateRule {
    /// Combined regex over all rule alternatives.
    pub regex: Regex,
    /// Token rules in declaration order.
    pub token_rules: Vec<TokenRule>,
    /// Forced state transition at end of line ([`NO_STATE`] = none).
    pub line_end_state: i32,
}

/// One alternative of a state's combined regex.
#[derive(Debug)]
pub struct TokenRule {
    /// Absolute capture-group index of this rule's whole-match group.
    pub group_offset_start: usize,
    /// Number of capture groups inside the rule's own pattern.
    pub group_count: usize,
    /// Style per group; `[0]` is the rule's default style.
    pub group_styles: Vec<i32>,
    /// State entered after this rule matches ([`NO_STATE`] = stay).
    pub goto_state: i32,
    /// Optional sub-grammar tokenizing the matched text.
    pub sub_state_rule: Option<Arc<StateRule>>,
}

impl TokenRule {
    /// Style id for capture group `group` (0 = whole match).
    pub fn group_style_id(&self, group: usize) -> i32 {
        self.group_styles.get(group).copied().unwrap_or(NO_STYLE)
    }
}

/// Callback resolving named grammar references during compilation.
pub type GrammarProvider<'a> = dyn Fn(&str) -> Option<Arc<SyntaxRule>> + 'a;

/// Compiles raw JSON grammar definitions into [`SyntaxRule`]s.
///
/// The compiler writes style names into a shared [`StyleMapping`] and
/// resolves `reference` states through the provider callback, so grammars
/// compiled through one engine agree on style ids.
pub struct SyntaxRuleCompiler<'a> {
    styles: &'a mut StyleMapping,
    provider: &'a GrammarProvider<'a>,
}

impl<'a> SyntaxRuleCompiler<'a> {
    /// Create a compiler over an engine style mapping and grammar provider.
    pub fn new(styles: &'a mut StyleMapping, provider: &'a GrammarProvider<'a>) -> Self {
        Self { styles, provider }
    }

    /// Compile a grammar from its JSON source.
    pub fn compile_from_json(&mut self, json: &str) -> Result<Arc<SyntaxRule>, SyntaxError> {
        let definition: GrammarDefinition = serde_json::from_str(json)?;
        self.compile(definition)
    }

    /// Compile a grammar from a JSON file.
    pub fn compile_from_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<SyntaxRule>, SyntaxError> {
        let json = std::fs::read_to_string(path)?;
        self.compile_from_json(&json)
    }

    fn compile(&mut self, definition: GrammarDefinition) -> Result<Arc<SyntaxRule>, SyntaxError> {
        if !definition.states.contains_key("default") {
            return Err(SyntaxError::MissingField("states.default"));
        }

        let variables = realize_variables(&definition.variables)?;

        // Intern declared styles before any rule references them.
        let mut inline_styles = HashMap::new();
        for style in &definition.styles {
            let id = self.styles.style_id_for_name(&style.name);
            if let Some(inline) = inline_style_string(style) {
                inline_styles.insert(id, inline);
            }
        }

        let state_ids = assign_state_ids(&definition.states);

        let mut compilation = StateCompilation {
            definition: &definition,
            variables: &variables,
            state_ids: &state_ids,
            styles: &mut *self.styles,
            provider: self.provider,
            compiled: HashMap::new(),
            visiting: HashSet::new(),
        };
        for name in definition.states.keys() {
            compilation.compile_state(name)?;
        }

        let states = compilation
            .compiled
            .into_iter()
            .map(|(name, rule)| (state_ids[&name], rule))
            .collect();

        Ok(Arc::new(SyntaxRule {
            name: definition.name.clone(),
            file_extensions: definition.file_extensions.iter().cloned().collect(),
            states,
            inline_styles,
        }))
    }
}

/// Per-grammar compile pass: resolves sub-states depth-first with
/// memoization, so a state referenced as a sub-grammar is compiled exactly
/// once and shared.
struct StateCompilation<'a, 'b> {
    definition: &'b GrammarDefinition,
    variables: &'b HashMap<String, String>,
    state_ids: &'b HashMap<String, i32>,
    styles: &'b mut StyleMapping,
    provider: &'a GrammarProvider<'a>,
    compiled: HashMap<String, Arc<StateRule>>,
    visiting: HashSet<String>,
}

impl StateCompilation<'_, '_> {
    fn compile_state(&mut self, name: &str) -> Result<Arc<StateRule>, SyntaxError> {
        if let Some(rule) = self.compiled.get(name) {
            return Ok(rule.clone());
        }
        if !self.visiting.insert(name.to_string()) {
            return Err(SyntaxError::CircularSubState(name.to_string()));
        }

        let definition = self.definition;
        let body = definition
            .states
            .get(name)
            .ok_or_else(|| SyntaxError::UnknownState(name.to_string()))?;

        let rule = match body {
            StateDefinition::Rules(rules) => self.compile_rule_list(rules, None)?,
            StateDefinition::Referenced(referenced) => self.compile_referenced(referenced)?,
        };

        self.visiting.remove(name);
        let rule = Arc::new(rule);
        self.compiled.insert(name.to_string(), rule.clone());
        Ok(rule)
    }

    fn compile_rule_list(
        &mut self,
        rules: &[RuleDefinition],
        embedded: Option<Arc<StateRule>>,
    ) -> Result<StateRule, SyntaxError> {
        let mut alternatives = Vec::new();
        let mut token_rules = Vec::new();
        let mut line_end_state = NO_STATE;
        // Wrapper group of the next alternative; group 0 is the whole search.
        let mut group_offset = 1usize;

        for rule in rules {
            let Some(pattern) = &rule.pattern else {
                if let Some(target) = &rule.on_line_end_state {
                    line_end_state = self.state_id(target)?;
                    continue;
                }
                return Err(SyntaxError::MissingField("pattern"));
            };

            let pattern = substitute_variables(pattern, self.variables)?;
            let group_count = count_capture_groups(&pattern);

            let default_style = match &rule.style {
                Some(name) => self.style_id(name)?,
                None => NO_STYLE,
            };
            let mut group_styles = vec![default_style; group_count + 1];
            if let Some(list) = &rule.styles {
                for (group, style_name) in &list.0 {
                    let slot = *group as usize;
                    if slot > group_count {
                        return Err(SyntaxError::GroupOutOfRange {
                            group: *group,
                            pattern: pattern.clone(),
                        });
                    }
                    group_styles[slot] = self.style_id(style_name)?;
                }
            }

            let goto_state = match &rule.state {
                Some(target) => self.state_id(target)?,
                None => NO_STATE,
            };

            let sub_state_rule = match &rule.sub_state {
                Some(target) => Some(self.compile_state(target)?),
                None => None,
            };

            token_rules.push(TokenRule {
                group_offset_start: group_offset,
                group_count,
                group_styles,
                goto_state,
                sub_state_rule,
            });
            alternatives.push(format!("({pattern})"));
            group_offset += 1 + group_count;
        }

        if let Some(embedded) = embedded {
            // Catch-all alternative handing remaining content to the
            // embedded grammar; gaps inside it inherit no style.
            token_rules.push(TokenRule {
                group_offset_start: group_offset,
                group_count: 0,
                group_styles: vec![NO_STYLE],
                goto_state: NO_STATE,
                sub_state_rule: Some(embedded),
            });
            alternatives.push("(.+)".to_string());
        }

        let source = alternatives.join("|");
        let regex = Regex::new(&source).map_err(|e| SyntaxError::RegexCompile {
            pattern: source.clone(),
            message: e.to_string(),
        })?;

        Ok(StateRule {
            regex,
            token_rules,
            line_end_state,
        })
    }

    fn compile_referenced(
        &mut self,
        referenced: &ReferencedStateDefinition,
    ) -> Result<StateRule, SyntaxError> {
        let grammar = (self.provider)(&referenced.reference)
            .ok_or_else(|| SyntaxError::UnknownGrammarReference(referenced.reference.clone()))?;
        let embedded = grammar
            .state_rule(SyntaxRule::DEFAULT_STATE_ID)
            .cloned()
            .ok_or_else(|| SyntaxError::UnknownGrammarReference(referenced.reference.clone()))?;

        let mut rule = self.compile_rule_list(&referenced.rules, Some(embedded))?;
        if let Some(target) = &referenced.on_line_end_state {
            rule.line_end_state = self.state_id(target)?;
        }
        Ok(rule)
    }

    fn state_id(&self, name: &str) -> Result<i32, SyntaxError> {
        self.state_ids
            .get(name)
            .copied()
            .ok_or_else(|| SyntaxError::UnknownState(name.to_string()))
    }

    fn style_id(&mut self, name: &str) -> Result<i32, SyntaxError> {
        self.styles
            .style_id(name)
            .ok_or_else(|| SyntaxError::UnknownStyle(name.to_string()))
    }
}

/// Assign state ids deterministically: `"default"` is 0, remaining states
/// get 1.. in sorted-name order.
fn assign_state_ids(states: &HashMap<String, StateDefinition>) -> HashMap<String, i32> {
    let mut names: Vec<&String> = states.keys().filter(|n| n.as_str() != "default").collect();
    names.sort();

    let mut ids = HashMap::new();
    ids.insert("default".to_string(), SyntaxRule::DEFAULT_STATE_ID);
    for (idx, name) in names.into_iter().enumerate() {
        ids.insert(name.clone(), idx as i32 + 1);
    }
    ids
}

fn inline_style_string(style: &StyleDefinition) -> Option<String> {
    let mut segments = Vec::new();
    if let Some(fg) = &style.foreground {
        segments.push(format!("foreground:{fg}"));
    }
    if let Some(bg) = &style.background {
        segments.push(format!("background:{bg}"));
    }
    if !style.tags.is_empty() {
        segments.push(format!("tags:{}", style.tags.join(",")));
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join(";"))
    }
}

/// Count the capturing groups in a regex source.
///
/// `(?:`, lookaround and option groups are non-capturing; `(?<name>` and
/// `(?P<name>` are capturing. Bracket expressions and escapes are skipped.
fn count_capture_groups(pattern: &str) -> usize {
    let bytes = pattern.as_bytes();
    let mut count = 0usize;
    let mut in_class = false;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'(' if !in_class => {
                if bytes.get(i + 1) != Some(&b'?') {
                    count += 1;
                } else {
                    match bytes.get(i + 2) {
                        Some(&b'<') if !matches!(bytes.get(i + 3), Some(&b'=') | Some(&b'!')) => {
                            count += 1;
                        }
                        Some(&b'P') if bytes.get(i + 3) == Some(&b'<') => count += 1,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    count
}

fn realize_variables(
    vars: &HashMap<String, String>,
) -> Result<HashMap<String, String>, SyntaxError> {
    let mut realized = HashMap::new();
    let mut visiting = HashSet::<String>::new();

    for key in vars.keys() {
        let _ = realize_one_variable(key, vars, &mut realized, &mut visiting)?;
    }

    Ok(realized)
}

fn realize_one_variable(
    key: &str,
    vars: &HashMap<String, String>,
    realized: &mut HashMap<String, String>,
    visiting: &mut HashSet<String>,
) -> Result<String, SyntaxError> {
    if let Some(val) = realized.get(key) {
        return Ok(val.clone());
    }
    if !visiting.insert(key.to_string()) {
        return Err(SyntaxError::CircularVariableReference(key.to_string()));
    }

    let raw = vars
        .get(key)
        .ok_or_else(|| SyntaxError::UnknownVariable(key.to_string()))?;

    let mut out = String::new();
    let mut last = 0usize;
    for (m_start, m_end, name) in variable_refs(raw) {
        out.push_str(&raw[last..m_start]);
        let expanded = realize_one_variable(&name, vars, realized, visiting)?;
        out.push_str(&expanded);
        last = m_end;
    }
    out.push_str(&raw[last..]);

    visiting.remove(key);
    realized.insert(key.to_string(), out.clone());
    Ok(out)
}

fn substitute_variables(
    text: &str,
    vars: &HashMap<String, String>,
) -> Result<String, SyntaxError> {
    let mut out = String::new();
    let mut last = 0usize;
    for (m_start, m_end, name) in variable_refs(text) {
        out.push_str(&text[last..m_start]);
        let value = vars
            .get(&name)
            .ok_or_else(|| SyntaxError::UnknownVariable(name.clone()))?;
        out.push_str(value);
        last = m_end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn variable_refs(text: &str) -> Vec<(usize, usize, String)> {
    // Only ${[A-Za-z0-9_]+} is treated as a variable reference; everything
    // else (including escaped dollars) remains unchanged.
    let re = RustRegex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid variable regex");
    re.captures_iter(text)
        .filter_map(|cap| {
            let m = cap.get(0)?;
            let name = cap.get(1)?.as_str().to_string();
            Some((m.start(), m.end(), name))
        })
        .collect()
}
