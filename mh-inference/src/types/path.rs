//! Lattice for `MemoryLayout.PathElement` values. These are transient:
//! they only exist between their factory call and the path-consuming
//! call, so the lattice is shallow.

use crate::lattice::{Lattice, TriState};

/// How a sequence element selects indices. Unknown numeric arguments
/// are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceVariant {
    /// `sequenceElement()`: every index, adds a coordinate.
    Open,
    /// `sequenceElement(start, step)`: adds a coordinate.
    SelectingOpen {
        start: Option<i64>,
        step: Option<i64>,
    },
    /// `sequenceElement(index)`: one fixed index, no coordinate.
    Selecting { index: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupVariant {
    Index(Option<i64>),
    Name(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathElementType {
    Top,
    Bot,
    Sequence(SequenceVariant),
    Group(GroupVariant),
    Dereference,
}

impl Lattice for PathElementType {
    fn top() -> Self {
        PathElementType::Top
    }

    fn bottom() -> Self {
        PathElementType::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (PathElementType::Bot, _) => (other.clone(), TriState::Unknown),
            (_, PathElementType::Bot) => (self.clone(), TriState::Unknown),
            (PathElementType::Top, _) | (_, PathElementType::Top) => {
                (PathElementType::Top, TriState::Unknown)
            }
            (PathElementType::Dereference, PathElementType::Dereference) => {
                (PathElementType::Dereference, TriState::Yes)
            }
            (PathElementType::Sequence(a), PathElementType::Sequence(b)) => {
                join_sequence_variants(*a, *b)
            }
            (PathElementType::Group(a), PathElementType::Group(b)) => match (a, b) {
                (GroupVariant::Index(x), GroupVariant::Index(y)) => {
                    let (index, identical) = join_selectors(*x, *y);
                    (PathElementType::Group(GroupVariant::Index(index)), identical)
                }
                (GroupVariant::Name(Some(x)), GroupVariant::Name(Some(y))) if x == y => (
                    PathElementType::Group(GroupVariant::Name(Some(x.clone()))),
                    TriState::Yes,
                ),
                (GroupVariant::Name(Some(_)), GroupVariant::Name(Some(_))) => {
                    (PathElementType::Top, TriState::No)
                }
                (GroupVariant::Name(_), GroupVariant::Name(_)) => (
                    PathElementType::Group(GroupVariant::Name(None)),
                    TriState::Unknown,
                ),
                _ => (PathElementType::Top, TriState::No),
            },
            _ => (PathElementType::Top, TriState::No),
        }
    }
}

fn join_selectors(a: Option<i64>, b: Option<i64>) -> (Option<i64>, TriState) {
    match (a, b) {
        (Some(x), Some(y)) if x == y => (Some(x), TriState::Yes),
        (Some(_), Some(_)) => (None, TriState::No),
        _ => (None, TriState::Unknown),
    }
}

fn join_sequence_variants(a: SequenceVariant, b: SequenceVariant) -> (PathElementType, TriState) {
    match (a, b) {
        (SequenceVariant::Open, SequenceVariant::Open) => {
            (PathElementType::Sequence(SequenceVariant::Open), TriState::Yes)
        }
        (
            SequenceVariant::SelectingOpen { start: s1, step: t1 },
            SequenceVariant::SelectingOpen { start: s2, step: t2 },
        ) => {
            let (start, start_identical) = join_selectors(s1, s2);
            let (step, step_identical) = join_selectors(t1, t2);
            (
                PathElementType::Sequence(SequenceVariant::SelectingOpen { start, step }),
                start_identical.sharpen(step_identical),
            )
        }
        (
            SequenceVariant::Selecting { index: i1 },
            SequenceVariant::Selecting { index: i2 },
        ) => {
            let (index, identical) = join_selectors(i1, i2);
            (
                PathElementType::Sequence(SequenceVariant::Selecting { index }),
                identical,
            )
        }
        _ => (PathElementType::Top, TriState::No),
    }
}

impl std::fmt::Display for PathElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElementType::Top => f.write_str("\u{22a4}"),
            PathElementType::Bot => f.write_str("\u{22a5}"),
            PathElementType::Dereference => f.write_str("deref"),
            PathElementType::Sequence(SequenceVariant::Open) => f.write_str("[*]"),
            PathElementType::Sequence(SequenceVariant::SelectingOpen { start, step }) => {
                write!(
                    f,
                    "[{}+{}*]",
                    start.map_or("?".to_string(), |v| v.to_string()),
                    step.map_or("?".to_string(), |v| v.to_string()),
                )
            }
            PathElementType::Sequence(SequenceVariant::Selecting { index }) => {
                write!(f, "[{}]", index.map_or("?".to_string(), |v| v.to_string()))
            }
            PathElementType::Group(GroupVariant::Index(index)) => {
                write!(f, ".{}", index.map_or("?".to_string(), |v| v.to_string()))
            }
            PathElementType::Group(GroupVariant::Name(name)) => {
                write!(f, ".{}", name.as_deref().unwrap_or("?"))
            }
        }
    }
}
