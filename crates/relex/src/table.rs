use std::fmt;

use thiserror::Error;

use crate::column::StateColumn;
use crate::state::{State, StateId};

/// Structural misuse of the table. These indicate a bug in whatever drives
/// the rewrites and are never recoverable.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("state {0} is already a row of the table")]
    DuplicateRow(StateId),
    #[error("a row state must carry an id")]
    RowWithoutId,
    #[error("column {name:?} has {got} cells, table has {want} rows")]
    ColumnLengthMismatch {
        name: String,
        got: usize,
        want: usize,
    },
}

/// The sparse transition relation: an ordered arena of state rows crossed
/// with named columns of destination sets. Row position is the state's table
/// index; the logical id lives on the state itself.
#[derive(Debug, Default)]
pub struct StateTable {
    rows: Vec<State>,
    columns: Vec<StateColumn>,
}

impl StateTable {
    pub fn new() -> StateTable {
        StateTable::default()
    }

    pub fn rows(&self) -> &[State] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[StateColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    /// Appends a row and pads every existing column with an empty cell, so
    /// column length always equals row count.
    pub fn add_row(&mut self, state: State) -> Result<(), TableError> {
        let id = state.id().ok_or(TableError::RowWithoutId)?;
        if self.rows.iter().any(|r| r.id() == Some(id)) {
            return Err(TableError::DuplicateRow(id));
        }
        self.rows.push(state);
        for column in &mut self.columns {
            column.push(State::empty());
        }
        Ok(())
    }

    /// Rows are appended one at a time, in order. `State` is `Copy`, so each
    /// row is its own value and nothing aliases caller-held states.
    pub fn add_rows(&mut self, states: &[State]) -> Result<(), TableError> {
        for &state in states {
            self.add_row(state)?;
        }
        Ok(())
    }

    /// Appends a column, or merges it cell-by-cell (set union) into an
    /// existing column with the same name. Rows must be added first: a
    /// column whose cell count disagrees with the row count is rejected.
    pub fn add_column(&mut self, column: StateColumn) -> Result<(), TableError> {
        if column.len() != self.rows.len() {
            return Err(TableError::ColumnLengthMismatch {
                name: column.name().to_string(),
                got: column.len(),
                want: self.rows.len(),
            });
        }
        match self.position(column.name()) {
            None => self.columns.push(column),
            Some(pos) => {
                let old = &mut self.columns[pos];
                for (row, cell) in column.cells().enumerate() {
                    for &state in cell {
                        old.insert(row, state);
                    }
                }
            }
        }
        Ok(())
    }

    /// Removes a column by name. A miss is tolerated; the column may already
    /// have been rewritten away.
    pub fn remove_column(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(pos) => {
                self.columns.remove(pos);
                true
            }
            None => {
                log::warn!("column {:?} is not in the table", name);
                false
            }
        }
    }

    /// Renames a column in place. If the new name is already taken the two
    /// columns are unioned, keeping labels unique.
    pub(crate) fn rename_column(&mut self, from: &str, to: &str) -> bool {
        let Some(pos) = self.position(from) else {
            return false;
        };
        if self.position(to).is_none() {
            self.columns[pos].rename(to);
            return true;
        }
        let mut column = self.columns.remove(pos);
        column.rename(to);
        self.add_column(column).is_ok()
    }

    pub fn column_by_name(&self, name: &str) -> Option<&StateColumn> {
        self.position(name).map(|pos| &self.columns[pos])
    }

    /// Maps a logical state id to its row position. Terminal markers are not
    /// rows and come back `None`.
    pub fn state_index(&self, id: StateId) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == Some(id))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }
}

impl fmt::Display for StateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}", "")?;
        for column in &self.columns {
            write!(f, "{:<12}", column.name())?;
        }
        writeln!(f)?;
        for (i, row) in self.rows.iter().enumerate() {
            match row.id() {
                Some(id) => write!(f, "{:<8}", id)?,
                None => write!(f, "{:<8}", "-")?,
            }
            for column in &self.columns {
                let cell: Vec<String> = column
                    .cell(i)
                    .iter()
                    .filter_map(|s| s.id())
                    .map(|id| id.to_string())
                    .collect();
                write!(f, "{:<12}", format!("{{{}}}", cell.join(",")))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
