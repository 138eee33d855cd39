// Pattern-to-NFA synthesis by column rewriting. Every composite column name
// is split into strictly shorter ones until only single symbols and
// two-character escapes remain:
//
//   a|b   duplicate the column under each branch name
//   ab    fresh state per occupied row; "a" enters it, "b" leaves it
//   a*    fresh state with an "a" self-loop, epsilon in and epsilon out
//   a+    like a*, but the entry edge consumes "a" and there is no
//         zero-iteration path
//
// Each rewrite strictly shortens the longest composite name, so the work
// queue drains.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

use thiserror::Error;

use crate::column::StateColumn;
use crate::dfa::ILLEGAL_STATE;
use crate::pattern::{self, PatternError};
use crate::state::{State, StateId};
use crate::table::{StateTable, TableError};

/// Reserved column name for epsilon transitions.
pub const EPSILON: &str = "null";

/// Start state id; every pattern's first transition leaves from its row.
pub const START_STATE: StateId = 0;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("got {patterns} patterns but {terminals} terminal ids")]
    CountMismatch { patterns: usize, terminals: usize },
    #[error("terminal id {0} is not negative")]
    TerminalNotNegative(StateId),
    #[error("terminal id {0} collides with the illegal-transition sentinel")]
    TerminalReserved(StateId),
    #[error("terminal id {0} is bound to more than one pattern")]
    TerminalReused(StateId),
}

/// A nondeterministic automaton over pattern-labeled columns, immutable once
/// built.
#[derive(Debug)]
pub struct Nfa {
    table: StateTable,
    terminals: HashSet<StateId>,
    patterns: Vec<String>,
    next_id: StateId,
}

impl Nfa {
    /// Builds the automaton for a set of patterns bound to distinct negative
    /// terminal ids. Matching pattern `i` in full reaches the sink state
    /// `terminal_ids[i]`.
    pub fn new(patterns: &[&str], terminal_ids: &[StateId]) -> Result<Nfa, BuildError> {
        if patterns.len() != terminal_ids.len() {
            return Err(BuildError::CountMismatch {
                patterns: patterns.len(),
                terminals: terminal_ids.len(),
            });
        }
        let mut terminals = HashSet::new();
        for &id in terminal_ids {
            if id >= 0 {
                return Err(BuildError::TerminalNotNegative(id));
            }
            if id == ILLEGAL_STATE {
                return Err(BuildError::TerminalReserved(id));
            }
            if !terminals.insert(id) {
                return Err(BuildError::TerminalReused(id));
            }
        }
        for pat in patterns {
            pattern::validate(pat)?;
        }

        let mut table = StateTable::new();
        table.add_row(State::new(START_STATE, false))?;
        for (pat, &end) in patterns.iter().zip(terminal_ids) {
            let mut column = StateColumn::new(*pat);
            column.push(State::new(end, true));
            table.add_column(column)?;
        }

        let mut nfa = Nfa {
            table,
            terminals,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            next_id: START_STATE + 1,
        };
        nfa.lower()?;
        Ok(nfa)
    }

    pub fn start(&self) -> StateId {
        START_STATE
    }

    pub fn terminals(&self) -> &HashSet<StateId> {
        &self.terminals
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    /// Destination ids from `id`'s row under `label`. Terminal markers have
    /// no row and therefore no outgoing edges.
    pub fn destinations(&self, id: StateId, label: &str) -> BTreeSet<StateId> {
        let Some(row) = self.table.state_index(id) else {
            return BTreeSet::new();
        };
        match self.table.column_by_name(label) {
            Some(column) => column.cell(row).iter().filter_map(|s| s.id()).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Drives the rewrite queue until every remaining column is atomic.
    fn lower(&mut self) -> Result<(), BuildError> {
        let mut queue: VecDeque<String> = self.patterns.iter().cloned().collect();
        while let Some(mut name) = queue.pop_front() {
            if name == EPSILON || self.table.column_by_name(&name).is_none() {
                continue;
            }
            // Peel redundant enclosing parens, renaming the column in place.
            let mut unit_end = leading_unit_end(&name);
            while name.len() >= 2
                && unit_end == name.len() - 1
                && name.starts_with('(')
                && name.ends_with(')')
            {
                let inner = name[1..name.len() - 1].to_string();
                self.table.rename_column(&name, &inner);
                name = inner;
                unit_end = leading_unit_end(&name);
            }
            if name.len() == 1 || (name.len() == 2 && name.starts_with('\\')) {
                continue; // atomic symbol
            }
            log::debug!("rewriting column {:?}", name);
            let subs = match top_level_alternation(&name) {
                Some(split) => self.rewrite_alternation(&name, split)?,
                None => {
                    let last = name.as_bytes()[name.len() - 1];
                    if unit_end + 2 == name.len() && (last == b'*' || last == b'+') {
                        // one unit, quantified over the whole name
                        if last == b'*' {
                            self.rewrite_zero_or_more(&name)?
                        } else {
                            self.rewrite_once_or_more(&name)?
                        }
                    } else {
                        self.rewrite_concatenation(&name, concat_split(&name))?
                    }
                }
            };
            for sub in subs {
                queue.push_back(sub);
            }
        }
        Ok(())
    }

    fn mint_state(&mut self) -> State {
        let state = State::new(self.next_id, false);
        self.next_id += 1;
        state
    }

    fn take_column(&mut self, name: &str) -> StateColumn {
        let column = self
            .table
            .column_by_name(name)
            .expect("rewritten column was just looked up")
            .clone();
        self.table.remove_column(name);
        column
    }

    /// `left|right`: the column splits into two exact duplicates, one per
    /// branch name. No new states.
    fn rewrite_alternation(&mut self, name: &str, split: usize) -> Result<Vec<String>, BuildError> {
        let column = self.take_column(name);
        let left = name[..split].to_string();
        let right = name[split + 1..].to_string();
        let mut left_col = column.clone();
        left_col.rename(left.as_str());
        let mut right_col = column;
        right_col.rename(right.as_str());
        self.table.add_column(left_col)?;
        self.table.add_column(right_col)?;
        Ok(vec![left, right])
    }

    /// `first rest`: every occupied row routes through a fresh state; the
    /// first unit reaches it, the remainder leaves it toward the original
    /// destinations.
    fn rewrite_concatenation(
        &mut self,
        name: &str,
        split: usize,
    ) -> Result<Vec<String>, BuildError> {
        debug_assert!(split >= 1 && split < name.len());
        let column = self.take_column(name);
        let first = name[..split].to_string();
        let rest = name[split..].to_string();
        let mut first_col = StateColumn::new(first.clone());
        let mut rest_col = StateColumn::new(rest.clone());
        let mut fresh: Vec<State> = Vec::new();
        let mut saved: Vec<BTreeSet<State>> = Vec::new();
        for cell in column.cells() {
            if cell.is_empty() {
                first_col.push(State::empty());
            } else {
                let state = self.mint_state();
                fresh.push(state);
                saved.push(cell.clone());
                first_col.push(state);
            }
            rest_col.push(State::empty());
        }
        for dests in saved {
            first_col.push(State::empty());
            rest_col.push_set(dests);
        }
        self.table.add_rows(&fresh)?;
        self.table.add_column(first_col)?;
        self.table.add_column(rest_col)?;
        Ok(vec![first, rest])
    }

    /// `unit*`: epsilon into a fresh state carrying a `unit` self-loop,
    /// epsilon out to the original destinations. The zero-iteration path is
    /// the in/out epsilon pair.
    fn rewrite_zero_or_more(&mut self, name: &str) -> Result<Vec<String>, BuildError> {
        let column = self.take_column(name);
        let unit = name[..name.len() - 1].to_string();
        let mut eps_in = StateColumn::new(EPSILON);
        let mut loop_col = StateColumn::new(unit.clone());
        let mut eps_out = StateColumn::new(EPSILON);
        let mut fresh: Vec<State> = Vec::new();
        let mut saved: Vec<BTreeSet<State>> = Vec::new();
        for cell in column.cells() {
            if cell.is_empty() {
                eps_in.push(State::empty());
            } else {
                let state = self.mint_state();
                fresh.push(state);
                saved.push(cell.clone());
                eps_in.push(state);
            }
            loop_col.push(State::empty());
            eps_out.push(State::empty());
        }
        for (state, dests) in fresh.iter().zip(saved) {
            eps_in.push(State::empty());
            loop_col.push(*state);
            eps_out.push_set(dests);
        }
        self.table.add_rows(&fresh)?;
        self.table.add_column(eps_in)?;
        self.table.add_column(loop_col)?;
        // Same name as eps_in; the table unions them into one epsilon column.
        self.table.add_column(eps_out)?;
        Ok(vec![unit])
    }

    /// `unit+`: like `unit*`, except entering the fresh state already
    /// consumes one `unit` and only the exit edge is epsilon.
    fn rewrite_once_or_more(&mut self, name: &str) -> Result<Vec<String>, BuildError> {
        let column = self.take_column(name);
        let unit = name[..name.len() - 1].to_string();
        let mut entry = StateColumn::new(unit.clone());
        let mut loop_col = StateColumn::new(unit.clone());
        let mut eps_out = StateColumn::new(EPSILON);
        let mut fresh: Vec<State> = Vec::new();
        let mut saved: Vec<BTreeSet<State>> = Vec::new();
        for cell in column.cells() {
            if cell.is_empty() {
                entry.push(State::empty());
            } else {
                let state = self.mint_state();
                fresh.push(state);
                saved.push(cell.clone());
                entry.push(state);
            }
            loop_col.push(State::empty());
            eps_out.push(State::empty());
        }
        for (state, dests) in fresh.iter().zip(saved) {
            entry.push(State::empty());
            loop_col.push(*state);
            eps_out.push_set(dests);
        }
        self.table.add_rows(&fresh)?;
        self.table.add_column(entry)?;
        // Merges into the entry column, giving both the entry edge and the
        // self-loop the same label.
        self.table.add_column(loop_col)?;
        self.table.add_column(eps_out)?;
        Ok(vec![unit])
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.table, f)
    }
}

/// Index of the last character of the leading atomic unit: a single symbol,
/// a two-character escape, or a parenthesized group.
fn leading_unit_end(name: &str) -> usize {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(b'\\') => 1,
        Some(b'(') => {
            let mut depth = 1;
            let mut i = 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 1,
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            i
        }
        _ => 0,
    }
}

/// Byte offset of the first `|` not nested inside parentheses, escaped
/// characters skipped.
fn top_level_alternation(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'|' if depth == 0 => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Concatenation split point: end of the leading unit, pulling a directly
/// attached quantifier along with it.
fn concat_split(name: &str) -> usize {
    let bytes = name.as_bytes();
    let mut split = leading_unit_end(name) + 1;
    if split < bytes.len() && (bytes[split] == b'*' || bytes[split] == b'+') {
        split += 1;
    }
    split
}
