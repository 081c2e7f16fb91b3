//! Pattern matching over token sequences.
//!
//! Patterns are built from single-token leaves, sequences and bounded
//! loops. Matching computes, for a start position, the set of every
//! position a match can end at, using explicit position sets instead of
//! recursion over alternatives, so long inputs need no deep stacks.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern<T> {
    /// Exactly this token
    Leaf(T),
    /// Any one of these tokens
    AnyOf(Vec<T>),
    /// The parts one after the other
    Seq(Vec<Pattern<T>>),
    /// `body` repeated between `min` and `max` times (unbounded when `None`)
    Loop {
        body: Box<Pattern<T>>,
        min: usize,
        max: Option<usize>,
    },
}

impl<T: PartialEq> Pattern<T> {
    pub fn seq(parts: Vec<Pattern<T>>) -> Self {
        Pattern::Seq(parts)
    }

    pub fn repeat(body: Pattern<T>, min: usize, max: Option<usize>) -> Self {
        Pattern::Loop {
            body: Box::new(body),
            min,
            max,
        }
    }

    pub fn zero_or_more(body: Pattern<T>) -> Self {
        Self::repeat(body, 0, None)
    }

    pub fn one_or_more(body: Pattern<T>) -> Self {
        Self::repeat(body, 1, None)
    }

    /// Every end position of a match of `self` beginning at `start`.
    pub fn ends(&self, tokens: &[T], start: usize) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        match self {
            Pattern::Leaf(t) => {
                if tokens.get(start) == Some(t) {
                    out.insert(start + 1);
                }
            }
            Pattern::AnyOf(set) => {
                if tokens.get(start).is_some_and(|token| set.contains(token)) {
                    out.insert(start + 1);
                }
            }
            Pattern::Seq(parts) => {
                let mut positions = BTreeSet::from([start]);
                for part in parts {
                    positions = positions
                        .iter()
                        .flat_map(|p| part.ends(tokens, *p))
                        .collect();
                    if positions.is_empty() {
                        break;
                    }
                }
                out = positions;
            }
            Pattern::Loop { body, min, max } => {
                if *min == 0 {
                    out.insert(start);
                }
                let mut visited = BTreeSet::new();
                let mut current = BTreeSet::from([start]);
                let mut reps = 0;
                while !current.is_empty() && max.is_none_or(|m| reps < m) {
                    let mut next: BTreeSet<usize> = current
                        .iter()
                        .flat_map(|p| body.ends(tokens, *p))
                        .collect();
                    reps += 1;
                    if reps >= *min {
                        // Beyond the minimum a revisited position adds nothing new
                        next.retain(|p| !visited.contains(p));
                        visited.extend(next.iter().copied());
                        out.extend(next.iter().copied());
                    }
                    current = next;
                }
            }
        }
        out
    }

    /// End of the longest match beginning at `start`.
    pub fn longest_match(&self, tokens: &[T], start: usize) -> Option<usize> {
        self.ends(tokens, start).last().copied()
    }

    /// Leftmost non-empty match at or after `from`, as a `(start, end)` range.
    pub fn find(&self, tokens: &[T], from: usize) -> Option<(usize, usize)> {
        (from..tokens.len()).find_map(|start| {
            self.longest_match(tokens, start)
                .filter(|end| *end > start)
                .map(|end| (start, end))
        })
    }
}
