// Subset construction over the lowered NFA table, plus the character-driven
// matcher that runs the result.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use bit_set::BitSet;
use serde::{Deserialize, Serialize};
use serde_binary::binary_stream::Endian;
use thiserror::Error;

use crate::nfa::{BuildError, Nfa, EPSILON};
use crate::state::StateId;

/// Sentinel for "no transition"; also the matcher's dead cursor value.
pub const ILLEGAL_STATE: i32 = -1;

/// Hard ceiling on subset-construction state count.
const STATE_LIMIT: usize = 10_000;

/// Characters that patterns must escape; input classifies them to their
/// escaped two-character label.
const META_CHARS: &[u8] = b"()*+|";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("subset construction exceeded {limit} states")]
    TooManyStates { limit: usize },
}

/// A compiled deterministic automaton: dense transition table plus accept
/// metadata. Immutable after compilation; scanning state lives in
/// [`Matcher`], so any number of concurrent scans can share one table.
#[derive(Debug)]
pub struct Dfa {
    patterns: Vec<String>,
    alphabet: Vec<String>,
    label_index: HashMap<String, usize>,
    table: Vec<i32>, // row-major, state_count x alphabet.len()
    state_count: usize,
    accept: HashMap<i32, StateId>,
    start_flagged: HashSet<i32>,
    meta: BitSet,
    class_letter: Option<usize>,
    class_digit: Option<usize>,
    class_word: Option<usize>,
}

impl Dfa {
    pub fn compile(patterns: &[&str], terminal_ids: &[StateId]) -> Result<Dfa, CompileError> {
        let nfa = Nfa::new(patterns, terminal_ids)?;
        Dfa::from_nfa(&nfa)
    }

    /// Subset construction. DFA ids are assigned in worklist discovery
    /// order, so identical inputs compile to identical tables.
    pub fn from_nfa(nfa: &Nfa) -> Result<Dfa, CompileError> {
        let alphabet: Vec<String> = nfa
            .table()
            .column_names()
            .filter(|n| *n != EPSILON)
            .map(str::to_string)
            .collect();
        let width = alphabet.len();
        let rows = nfa.table().rows();

        // Epsilon closure of every state, indexed by row position.
        let closures: Vec<BTreeSet<StateId>> = rows
            .iter()
            .map(|row| {
                let id = row.id().expect("table rows always carry ids");
                epsilon_closure(nfa, id)
            })
            .collect();

        let start_row = (0..rows.len())
            .find(|&i| closures[i].contains(&nfa.start()))
            .expect("some closure contains the start state");

        let mut table: Vec<i32> = Vec::new();
        let mut accept: HashMap<i32, StateId> = HashMap::new();
        let mut start_flagged: HashSet<i32> = HashSet::new();
        let mut ids: HashMap<Vec<StateId>, i32> = HashMap::new();
        let mut queue: VecDeque<BTreeSet<StateId>> = VecDeque::new();

        let start_set = closures[start_row].clone();
        ids.insert(canonical(&start_set), 0);
        table.extend(std::iter::repeat(ILLEGAL_STATE).take(width));
        let mut state_count = 1usize;
        queue.push_back(start_set);

        while let Some(current) = queue.pop_front() {
            let id = ids[&canonical(&current)];
            if current.contains(&nfa.start()) {
                start_flagged.insert(id);
            }
            // Ascending iteration makes the most negative terminal win when
            // several patterns accept here.
            if let Some(&kind) = current.iter().find(|s| nfa.terminals().contains(s)) {
                accept.insert(id, kind);
            }
            for (ci, label) in alphabet.iter().enumerate() {
                let mut moved: BTreeSet<StateId> = BTreeSet::new();
                for &s in &current {
                    moved.extend(nfa.destinations(s, label));
                }
                if moved.is_empty() {
                    continue; // entry stays ILLEGAL_STATE
                }
                let mut target = moved.clone();
                for &s in &moved {
                    if nfa.terminals().contains(&s) {
                        continue; // terminal markers have no closure
                    }
                    let row = nfa
                        .table()
                        .state_index(s)
                        .expect("non-terminal destination must be a table row");
                    target.extend(closures[row].iter().copied());
                }
                let key = canonical(&target);
                let next = match ids.get(&key) {
                    Some(&existing) => existing,
                    None => {
                        if state_count >= STATE_LIMIT {
                            return Err(CompileError::TooManyStates { limit: STATE_LIMIT });
                        }
                        let minted = state_count as i32;
                        ids.insert(key, minted);
                        table.extend(std::iter::repeat(ILLEGAL_STATE).take(width));
                        state_count += 1;
                        queue.push_back(target);
                        minted
                    }
                };
                table[id as usize * width + ci] = next;
            }
        }

        let label_index: HashMap<String, usize> = alphabet
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        let class_letter = label_index.get("\\c").copied();
        let class_digit = label_index.get("\\d").copied();
        let class_word = label_index.get("\\w").copied();

        let mut dfa = Dfa {
            patterns: nfa.patterns().to_vec(),
            alphabet,
            label_index,
            table,
            state_count,
            accept,
            start_flagged,
            meta: meta_chars(),
            class_letter,
            class_digit,
            class_word,
        };
        dfa.minimize();
        Ok(dfa)
    }

    /// Declared as a construction phase; the produced table may contain
    /// redundant states.
    fn minimize(&mut self) {
        // TODO: Hopcroft-style minimization that refuses to merge accept
        // states with different kinds.
    }

    pub fn matcher(&self) -> Matcher<'_> {
        Matcher {
            dfa: self,
            state: 0,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn accepted_kind_of(&self, state: i32) -> Option<StateId> {
        self.accept.get(&state).copied()
    }

    fn transition(&self, state: i32, column: usize) -> i32 {
        self.table[state as usize * self.alphabet.len() + column]
    }

    /// Alphabet column an input character classifies to, if any. Meta
    /// characters and newline/tab map to their two-character escape labels.
    fn classify(&self, ch: char) -> Option<usize> {
        let label = if (ch as usize) < 256 && self.meta.contains(ch as usize) {
            format!("\\{}", ch)
        } else if ch == '\n' {
            "\\n".to_string()
        } else if ch == '\t' {
            "\\t".to_string()
        } else {
            ch.to_string()
        };
        self.label_index.get(&label).copied()
    }

    /// Dense serializable snapshot for precompiling scanner tables.
    pub fn to_table(&self) -> ScanTable {
        let mut accept: Vec<(i32, StateId)> = self.accept.iter().map(|(&s, &k)| (s, k)).collect();
        accept.sort_unstable();
        let mut start_flagged: Vec<i32> = self.start_flagged.iter().copied().collect();
        start_flagged.sort_unstable();
        ScanTable {
            patterns: self.patterns.clone(),
            alphabet: self.alphabet.clone(),
            data: self.table.clone(),
            states: self.state_count as u32,
            accept,
            start_flagged,
        }
    }

    /// Rehydrates a runnable automaton from a precompiled snapshot.
    pub fn from_table(table: ScanTable) -> Dfa {
        let ScanTable {
            patterns,
            alphabet,
            data,
            states,
            accept,
            start_flagged,
        } = table;
        let label_index: HashMap<String, usize> = alphabet
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        let class_letter = label_index.get("\\c").copied();
        let class_digit = label_index.get("\\d").copied();
        let class_word = label_index.get("\\w").copied();
        Dfa {
            patterns,
            alphabet,
            label_index,
            table: data,
            state_count: states as usize,
            accept: accept.into_iter().collect(),
            start_flagged: start_flagged.into_iter().collect(),
            meta: meta_chars(),
            class_letter,
            class_digit,
            class_word,
        }
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6}", "")?;
        for label in &self.alphabet {
            write!(f, "{:<6}", label)?;
        }
        writeln!(f)?;
        for state in 0..self.state_count {
            write!(f, "{:<6}", state)?;
            for column in 0..self.alphabet.len() {
                write!(f, "{:<6}", self.table[state * self.alphabet.len() + column])?;
            }
            writeln!(f)?;
        }
        let mut accept: Vec<(i32, StateId)> = self.accept.iter().map(|(&s, &k)| (s, k)).collect();
        accept.sort_unstable();
        writeln!(f, "accept: {:?}", accept)?;
        let mut starts: Vec<i32> = self.start_flagged.iter().copied().collect();
        starts.sort_unstable();
        write!(f, "start-flagged: {:?}", starts)
    }
}

/// Stateful character-driven scanner over a compiled [`Dfa`]. Holds nothing
/// but the cursor; one matcher per concurrent scan.
#[derive(Debug)]
pub struct Matcher<'a> {
    dfa: &'a Dfa,
    state: i32,
}

impl Matcher<'_> {
    pub fn reset(&mut self) {
        self.state = 0;
    }

    pub fn is_legal(&self) -> bool {
        self.state != ILLEGAL_STATE
    }

    pub fn is_accepting(&self) -> bool {
        self.dfa.accept.contains_key(&self.state)
    }

    pub fn accepted_kind(&self) -> Option<StateId> {
        self.dfa.accepted_kind_of(self.state)
    }

    pub fn state(&self) -> i32 {
        self.state
    }

    /// Advances the cursor by one input character. Stepping from the illegal
    /// state is a caller bug.
    pub fn step(&mut self, ch: char) {
        assert!(self.is_legal(), "stepped the matcher from the illegal state");
        if let Some(column) = self.dfa.classify(ch) {
            let next = self.dfa.transition(self.state, column);
            if next != ILLEGAL_STATE {
                self.state = next;
                return;
            }
        }
        // Class fallback: letters try \c then \w, digits \d then \w.
        let fallback: [Option<usize>; 2] = if ch.is_ascii_alphabetic() {
            [self.dfa.class_letter, self.dfa.class_word]
        } else if ch.is_ascii_digit() {
            [self.dfa.class_digit, self.dfa.class_word]
        } else {
            [None, None]
        };
        for column in fallback.into_iter().flatten() {
            let next = self.dfa.transition(self.state, column);
            if next != ILLEGAL_STATE {
                self.state = next;
                return;
            }
        }
        self.state = ILLEGAL_STATE;
    }

    /// Feeds `text` from a fresh cursor and returns how many characters were
    /// consumed while legal. If the cursor died that is one more than the
    /// longest legal prefix, so the prefix length comes back either way.
    pub fn scan(&mut self, text: &str) -> usize {
        self.reset();
        let mut fed = 0;
        for ch in text.chars() {
            if !self.is_legal() {
                break;
            }
            self.step(ch);
            fed += 1;
        }
        if self.is_legal() {
            fed
        } else {
            fed - 1
        }
    }
}

/// Dense, serializable form of a compiled automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTable {
    patterns: Vec<String>,
    alphabet: Vec<String>,
    data: Vec<i32>,
    states: u32,
    accept: Vec<(i32, StateId)>,
    start_flagged: Vec<i32>,
}

impl ScanTable {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_binary::Error> {
        serde_binary::to_vec(self, Endian::Little)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ScanTable, serde_binary::Error> {
        serde_binary::from_slice(bytes, Endian::Little)
    }
}

/// Ids reachable from `id` over epsilon edges alone, including `id` itself.
pub(crate) fn epsilon_closure(nfa: &Nfa, id: StateId) -> BTreeSet<StateId> {
    let mut closure = BTreeSet::new();
    let mut queue = VecDeque::from([id]);
    while let Some(next) = queue.pop_front() {
        if !closure.insert(next) {
            continue;
        }
        for dest in nfa.destinations(next, EPSILON) {
            if !closure.contains(&dest) {
                queue.push_back(dest);
            }
        }
    }
    closure
}

/// Canonical map key for a state set: its ids in ascending order.
fn canonical(set: &BTreeSet<StateId>) -> Vec<StateId> {
    set.iter().copied().collect()
}

fn meta_chars() -> BitSet {
    let mut meta = BitSet::with_capacity(256);
    for &b in META_CHARS {
        meta.insert(b as usize);
    }
    meta
}
