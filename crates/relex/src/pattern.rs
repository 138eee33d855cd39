// Syntax checking for the pattern subset the rewriter understands:
// literals, two-character escapes, grouping, alternation, `*` and `+`.
// Anything that would leave a rewrite undefined is rejected up front.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,
    #[error("pattern {0:?} is not ASCII")]
    NotAscii(String),
    #[error("pattern {0:?} has unbalanced parentheses")]
    UnbalancedParens(String),
    #[error("pattern {0:?} contains an empty group")]
    EmptyGroup(String),
    #[error("pattern {0:?}: {1} binds nothing")]
    DanglingQuantifier(String, char),
    #[error("pattern {0:?}: | has an empty branch")]
    MisplacedAlternation(String),
    #[error("pattern {0:?} ends in a bare escape")]
    TrailingEscape(String),
}

pub(crate) fn validate(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if !pattern.is_ascii() {
        return Err(PatternError::NotAscii(pattern.to_string()));
    }

    let owned = || pattern.to_string();
    let bytes = pattern.as_bytes();
    // Per nesting depth: (seen any unit in this group, seen a unit since the
    // last `(` or `|`).
    let mut groups: Vec<(bool, bool)> = vec![(false, false)];
    let mut prev_quantifier = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    return Err(PatternError::TrailingEscape(owned()));
                }
                i += 1;
                let top = groups.last_mut().expect("depth stack is never empty");
                *top = (true, true);
                prev_quantifier = false;
            }
            b'(' => {
                groups.push((false, false));
                prev_quantifier = false;
            }
            b')' => {
                if groups.len() == 1 {
                    return Err(PatternError::UnbalancedParens(owned()));
                }
                let (seen_any, have_unit) = groups.pop().expect("depth checked above");
                if !have_unit {
                    return if seen_any {
                        Err(PatternError::MisplacedAlternation(owned()))
                    } else {
                        Err(PatternError::EmptyGroup(owned()))
                    };
                }
                let top = groups.last_mut().expect("depth stack is never empty");
                *top = (true, true);
                prev_quantifier = false;
            }
            q @ (b'*' | b'+') => {
                let &(_, have_unit) = groups.last().expect("depth stack is never empty");
                if !have_unit || prev_quantifier {
                    return Err(PatternError::DanglingQuantifier(owned(), q as char));
                }
                prev_quantifier = true;
            }
            b'|' => {
                let top = groups.last_mut().expect("depth stack is never empty");
                if !top.1 {
                    return Err(PatternError::MisplacedAlternation(owned()));
                }
                top.1 = false;
                prev_quantifier = false;
            }
            _ => {
                let top = groups.last_mut().expect("depth stack is never empty");
                *top = (true, true);
                prev_quantifier = false;
            }
        }
        i += 1;
    }
    if groups.len() > 1 {
        return Err(PatternError::UnbalancedParens(owned()));
    }
    if !groups[0].1 {
        return Err(PatternError::MisplacedAlternation(owned()));
    }
    Ok(())
}
