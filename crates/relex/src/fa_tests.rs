use std::collections::BTreeSet;

use crate::dfa::epsilon_closure;
use crate::pattern::validate;
use crate::{
    BuildError, CompileError, Dfa, Nfa, PatternError, State, StateColumn, StateTable, TableError,
    EPSILON,
};

fn compile(patterns: &[&str], terminals: &[i32]) -> Dfa {
    Dfa::compile(patterns, terminals).expect("failed to compile patterns")
}

fn ids(set: &BTreeSet<i32>) -> Vec<i32> {
    set.iter().copied().collect()
}

#[test]
fn table_rejects_duplicate_rows() {
    let mut table = StateTable::new();
    table.add_row(State::new(0, false)).unwrap();
    assert!(matches!(
        table.add_row(State::new(0, false)),
        Err(TableError::DuplicateRow(0))
    ));
}

#[test]
fn table_rejects_short_columns() {
    let mut table = StateTable::new();
    table.add_row(State::new(0, false)).unwrap();
    table.add_row(State::new(1, false)).unwrap();
    let mut column = StateColumn::new("a");
    column.push(State::new(1, false));
    assert!(matches!(
        table.add_column(column),
        Err(TableError::ColumnLengthMismatch { .. })
    ));
}

#[test]
fn same_name_columns_union() {
    let mut table = StateTable::new();
    table.add_row(State::new(0, false)).unwrap();
    let mut first = StateColumn::new("a");
    first.push(State::new(1, false));
    table.add_column(first).unwrap();
    let mut second = StateColumn::new("a");
    second.push(State::new(2, false));
    table.add_column(second).unwrap();

    assert_eq!(table.columns().len(), 1);
    let merged = table.column_by_name("a").unwrap();
    let cell: Vec<i32> = merged.cell(0).iter().filter_map(|s| s.id()).collect();
    assert_eq!(cell, vec![1, 2]);
}

#[test]
fn removing_a_missing_column_is_tolerated() {
    let mut table = StateTable::new();
    assert!(!table.remove_column("ghost"));
}

#[test]
fn alternation_duplicates_the_column() {
    let nfa = Nfa::new(&["a|b"], &[-2]).unwrap();
    let names: Vec<&str> = nfa.table().column_names().collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(nfa.table().row_count(), 1);
    assert_eq!(ids(&nfa.destinations(0, "a")), vec![-2]);
    assert_eq!(ids(&nfa.destinations(0, "b")), vec![-2]);
}

#[test]
fn concatenation_routes_through_a_fresh_state() {
    let nfa = Nfa::new(&["ab"], &[-2]).unwrap();
    assert_eq!(nfa.table().row_count(), 2);
    assert_eq!(ids(&nfa.destinations(0, "a")), vec![1]);
    assert_eq!(ids(&nfa.destinations(1, "b")), vec![-2]);
    assert!(nfa.destinations(0, "b").is_empty());
    assert!(nfa.destinations(1, "a").is_empty());
}

#[test]
fn zero_or_more_builds_the_loop_shape() {
    let nfa = Nfa::new(&["a*"], &[-2]).unwrap();
    let names: Vec<&str> = nfa.table().column_names().collect();
    assert_eq!(names, vec![EPSILON, "a"]);
    assert_eq!(ids(&nfa.destinations(0, EPSILON)), vec![1]);
    assert_eq!(ids(&nfa.destinations(1, "a")), vec![1]);
    assert_eq!(ids(&nfa.destinations(1, EPSILON)), vec![-2]);
    assert!(nfa.destinations(0, "a").is_empty());
}

#[test]
fn once_or_more_consumes_on_entry() {
    let nfa = Nfa::new(&["a+"], &[-2]).unwrap();
    let names: Vec<&str> = nfa.table().column_names().collect();
    assert_eq!(names, vec!["a", EPSILON]);
    assert_eq!(ids(&nfa.destinations(0, "a")), vec![1]);
    assert_eq!(ids(&nfa.destinations(1, "a")), vec![1]);
    assert_eq!(ids(&nfa.destinations(1, EPSILON)), vec![-2]);
    assert!(nfa.destinations(0, EPSILON).is_empty());
}

#[test]
fn redundant_parens_are_peeled() {
    let nfa = Nfa::new(&["((a))"], &[-2]).unwrap();
    let names: Vec<&str> = nfa.table().column_names().collect();
    assert_eq!(names, vec!["a"]);
    assert_eq!(ids(&nfa.destinations(0, "a")), vec![-2]);
}

#[test]
fn peeling_into_an_existing_column_merges() {
    // "(a)" renames to "a", which the alternation already produced.
    let dfa = compile(&["(a)|a"], &[-2]);
    assert_eq!(dfa.alphabet(), ["a"]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("a"), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
}

#[test]
fn closure_is_reflexive_and_idempotent() {
    let nfa = Nfa::new(&["a*"], &[-2]).unwrap();
    let closure = epsilon_closure(&nfa, 0);
    assert_eq!(ids(&closure), vec![-2, 0, 1]);

    let rerun: BTreeSet<i32> = closure
        .iter()
        .flat_map(|&s| epsilon_closure(&nfa, s))
        .collect();
    assert_eq!(rerun, closure);
}

#[test]
fn compilation_is_deterministic() {
    let patterns = ["(_|\\c)(\\w|_)*", "\\d+", " |\\t"];
    let terminals = [-2, -3, -4];
    let first = compile(&patterns, &terminals);
    let second = compile(&patterns, &terminals);
    assert_eq!(first.state_count(), second.state_count());
    assert_eq!(first.alphabet(), second.alphabet());
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn alphabet_has_no_spurious_labels() {
    let patterns = ["(_|\\c)(\\w|_)*", "\\d+", "\\+|-", " |\\t", "\\n"];
    let dfa = compile(&patterns, &[-2, -3, -4, -5, -6]);
    for label in dfa.alphabet() {
        assert!(
            patterns.iter().any(|p| p.contains(label.as_str())),
            "label {:?} appears in no source pattern",
            label
        );
    }
}

#[test]
fn once_or_more_scan_roundtrip() {
    let dfa = compile(&["a+"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("aaa"), 3);
    assert!(m.is_accepting());
    assert_eq!(m.accepted_kind(), Some(-2));

    assert_eq!(m.scan(""), 0);
    assert!(m.is_legal());
    assert!(!m.is_accepting());
}

#[test]
fn zero_or_more_accepts_the_empty_word() {
    let dfa = compile(&["a*"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan(""), 0);
    assert!(m.is_accepting());
    assert_eq!(m.accepted_kind(), Some(-2));
    assert_eq!(m.scan("aaaa"), 4);
    assert!(m.is_accepting());
}

#[test]
fn scan_reports_the_longest_legal_prefix() {
    let dfa = compile(&["\\d+"], &[-3]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("12a"), 2);
    assert!(!m.is_legal());
    assert!(!m.is_accepting());
}

#[test]
fn alternation_is_symmetric() {
    let dfa = compile(&["a|b"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("a"), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
    assert_eq!(m.scan("b"), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
}

#[test]
fn letters_fall_back_to_the_letter_class() {
    let dfa = compile(&["\\c+"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("xyz"), 3);
    assert_eq!(m.accepted_kind(), Some(-2));
    assert_eq!(m.scan("x1"), 1);
}

#[test]
fn word_class_catches_letters_and_digits() {
    let dfa = compile(&["\\w+"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("a1b2"), 4);
    assert_eq!(m.accepted_kind(), Some(-2));
}

#[test]
fn letter_class_wins_over_word_class() {
    let dfa = compile(&["\\c", "\\w"], &[-2, -3]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("a"), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
    assert_eq!(m.scan("7"), 1);
    assert_eq!(m.accepted_kind(), Some(-3));
}

#[test]
fn meta_characters_scan_through_their_escapes() {
    let dfa = compile(&["\\(|\\)"], &[-2]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("("), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
    assert_eq!(m.scan(")"), 1);
    assert_eq!(m.accepted_kind(), Some(-2));
}

#[test]
fn most_negative_terminal_wins_ties() {
    // Duplicate patterns merge into one column carrying both terminals.
    let dfa = compile(&["a", "a"], &[-2, -3]);
    let mut m = dfa.matcher();
    assert_eq!(m.scan("a"), 1);
    assert_eq!(m.accepted_kind(), Some(-3));
}

#[test]
fn configuration_errors_are_rejected() {
    assert!(matches!(
        Dfa::compile(&["a", "b"], &[-2, -2]),
        Err(CompileError::Build(BuildError::TerminalReused(-2)))
    ));
    assert!(matches!(
        Dfa::compile(&["a"], &[2]),
        Err(CompileError::Build(BuildError::TerminalNotNegative(2)))
    ));
    assert!(matches!(
        Dfa::compile(&["a"], &[-1]),
        Err(CompileError::Build(BuildError::TerminalReserved(-1)))
    ));
    assert!(matches!(
        Dfa::compile(&["a", "b"], &[-2]),
        Err(CompileError::Build(BuildError::CountMismatch { .. }))
    ));
}

#[test]
fn malformed_patterns_are_rejected() {
    assert_eq!(validate(""), Err(PatternError::Empty));
    assert_eq!(
        validate("(a"),
        Err(PatternError::UnbalancedParens("(a".to_string()))
    );
    assert_eq!(
        validate("a)"),
        Err(PatternError::UnbalancedParens("a)".to_string()))
    );
    assert_eq!(
        validate("()"),
        Err(PatternError::EmptyGroup("()".to_string()))
    );
    assert_eq!(
        validate("*a"),
        Err(PatternError::DanglingQuantifier("*a".to_string(), '*'))
    );
    assert_eq!(
        validate("a**"),
        Err(PatternError::DanglingQuantifier("a**".to_string(), '*'))
    );
    assert_eq!(
        validate("a|"),
        Err(PatternError::MisplacedAlternation("a|".to_string()))
    );
    assert_eq!(
        validate("(|a)"),
        Err(PatternError::MisplacedAlternation("(|a)".to_string()))
    );
    assert_eq!(
        validate("ab\\"),
        Err(PatternError::TrailingEscape("ab\\".to_string()))
    );
    assert_eq!(
        validate("é"),
        Err(PatternError::NotAscii("é".to_string()))
    );
    assert_eq!(validate("(a|b)*c+"), Ok(()));
}

#[test]
fn zero_patterns_give_a_dead_scanner() {
    let dfa = compile(&[], &[]);
    assert_eq!(dfa.state_count(), 1);
    assert!(dfa.alphabet().is_empty());
    let mut m = dfa.matcher();
    assert!(!m.is_accepting());
    assert_eq!(m.accepted_kind(), None);
    assert_eq!(m.scan("x"), 0);
    assert!(!m.is_legal());
}

#[test]
#[should_panic(expected = "illegal state")]
fn stepping_a_dead_matcher_panics() {
    let dfa = compile(&["a"], &[-2]);
    let mut m = dfa.matcher();
    m.step('z');
    assert!(!m.is_legal());
    m.step('z');
}
