/// Logical state identifier. Non-negative ids are ordinary automaton states
/// (0 is the reserved start state); negative ids are terminal markers, one
/// per source pattern.
pub type StateId = i32;

// Ordering is by id; id-less states never reach a set, so the derived
// None-first ordering is never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct State {
    id: Option<StateId>,
    terminal: bool,
}

impl State {
    pub fn new(id: StateId, terminal: bool) -> State {
        State {
            id: Some(id),
            terminal,
        }
    }

    /// A state with no identity, used to append "no transition here" cells.
    pub fn empty() -> State {
        State {
            id: None,
            terminal: false,
        }
    }

    pub fn id(&self) -> Option<StateId> {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}
