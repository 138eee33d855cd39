use std::collections::BTreeSet;

use crate::state::State;

/// One labeled column of the transition relation: for each table row, the
/// set of destination states reachable under this column's symbol.
#[derive(Debug, Clone)]
pub struct StateColumn {
    name: String,
    cells: Vec<BTreeSet<State>>,
}

impl StateColumn {
    pub fn new(name: impl Into<String>) -> StateColumn {
        StateColumn {
            name: name.into(),
            cells: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, row: usize) -> &BTreeSet<State> {
        &self.cells[row]
    }

    pub fn cells(&self) -> impl Iterator<Item = &BTreeSet<State>> {
        self.cells.iter()
    }

    /// Appends a one-state cell, or an empty cell if `state` carries no id.
    /// Every append adds a cell; a column never has holes.
    pub fn push(&mut self, state: State) {
        let mut set = BTreeSet::new();
        if !state.is_empty() {
            set.insert(state);
        }
        self.cells.push(set);
    }

    pub fn push_set(&mut self, set: BTreeSet<State>) {
        self.cells.push(set);
    }

    /// Adds `state` to an existing cell. Id-less states are not real
    /// destinations and are dropped.
    pub fn insert(&mut self, row: usize, state: State) -> bool {
        if state.is_empty() {
            return false;
        }
        self.cells[row].insert(state)
    }
}
