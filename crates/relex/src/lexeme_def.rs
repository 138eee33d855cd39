use convert_case::{Case, Casing};

use crate::dfa::{CompileError, Dfa};
use crate::state::StateId;

/// First terminal id handed out; -1 stays reserved for the illegal sentinel.
const FIRST_TERMINAL: StateId = -2;

#[derive(Debug)]
pub struct TokenRule {
    pub name: String,
    pub pattern: String,
    pub terminal: StateId,
}

#[derive(Debug)]
pub struct TokenSetDef {
    pub name: String,
    pub pascal_case_name: String,
    pub rules: Vec<TokenRule>,
}

/// Parses a token-set definition: one `Name: pattern` rule per line. A line
/// without a colon is a bare pattern named by its Pascal-cased text. Blank
/// lines and `#` comments are skipped. Terminal ids count down from -2 in
/// rule order; when one scan position accepts several rules, the most
/// negative id wins, so the later rule takes precedence.
pub fn parse_token_defs(def_name: &str, source: &str) -> TokenSetDef {
    let pascal_case_name = def_name.to_case(Case::Pascal);
    let mut rules = Vec::new();
    let mut next = FIRST_TERMINAL;
    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, pattern) = match line.split_once(':') {
            Some((name, pattern)) => (name.trim().to_string(), pattern.trim().to_string()),
            None => (line.to_case(Case::Pascal), line.to_string()),
        };
        rules.push(TokenRule {
            name,
            pattern,
            terminal: next,
        });
        next -= 1;
    }
    TokenSetDef {
        name: def_name.to_string(),
        pascal_case_name,
        rules,
    }
}

impl TokenSetDef {
    pub fn patterns(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.pattern.as_str()).collect()
    }

    pub fn terminal_ids(&self) -> Vec<StateId> {
        self.rules.iter().map(|r| r.terminal).collect()
    }

    pub fn rule_for(&self, terminal: StateId) -> Option<&TokenRule> {
        self.rules.iter().find(|r| r.terminal == terminal)
    }

    pub fn compile(&self) -> Result<Dfa, CompileError> {
        Dfa::compile(&self.patterns(), &self.terminal_ids())
    }
}
