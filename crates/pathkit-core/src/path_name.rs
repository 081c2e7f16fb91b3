//! Path identifiers.
//!
//! A path is named by the drawing layer it lives on. Everything after the
//! first `.` is a free-form suffix (variant, revision) and does not take
//! part in identity, so `8000`, `8000.0` and `8000.A` all name one path.
//! Names order the way people expect: digit groups compare by value and
//! letters ignore case.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathName {
    raw: String,
    source: Option<String>,
}

impl PathName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into().trim().to_string(),
            source: None,
        }
    }

    /// Name tagged with the file it was read from. The source is kept for
    /// messages only.
    pub fn with_source(raw: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The identifying part of the name.
    pub fn key(&self) -> &str {
        self.raw.split('.').next().unwrap_or("").trim()
    }

    /// Name usable as part of a file name.
    pub fn file_stem(&self) -> String {
        self.raw
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Group<'a> {
    Number(&'a str),
    Text(String),
}

fn groups(key: &str) -> Vec<Group<'_>> {
    let mut out = Vec::new();
    let mut rest = key;
    while let Some(first) = rest.chars().next() {
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        if digits {
            let trimmed = head.trim_start_matches('0');
            out.push(Group::Number(if trimmed.is_empty() { "0" } else { trimmed }));
        } else {
            out.push(Group::Text(head.to_lowercase()));
        }
        rest = tail;
    }
    out
}

fn compare_groups(a: &Group<'_>, b: &Group<'_>) -> Ordering {
    match (a, b) {
        // Leading zeros are gone, so a longer digit run is a larger number
        (Group::Number(x), Group::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Group::Number(_), Group::Text(_)) => Ordering::Less,
        (Group::Text(_), Group::Number(_)) => Ordering::Greater,
        (Group::Text(x), Group::Text(y)) => x.cmp(y),
    }
}

impl Ord for PathName {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = groups(self.key());
        let b = groups(other.key());
        for (x, y) in a.iter().zip(b.iter()) {
            let ord = compare_groups(x, y);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }
}

impl PartialOrd for PathName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PathName {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathName {}

impl Hash for PathName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for group in groups(self.key()) {
            match group {
                Group::Number(n) => {
                    0u8.hash(state);
                    n.hash(state);
                }
                Group::Text(t) => {
                    1u8.hash(state);
                    t.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for PathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for PathName {
    fn from(raw: String) -> Self {
        PathName::new(raw)
    }
}

impl From<&str> for PathName {
    fn from(raw: &str) -> Self {
        PathName::new(raw)
    }
}

impl From<PathName> for String {
    fn from(name: PathName) -> Self {
        name.raw
    }
}
