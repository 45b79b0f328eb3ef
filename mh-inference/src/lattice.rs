//! Core lattice vocabulary shared by every inference domain.
//!
//! All inferred facts live in bounded join-semilattices with an explicit
//! `Top` ("could be anything") and `Bottom` ("not yet constrained").
//! Joins are total and never fail; precision loss is expressed by moving
//! towards `Top`. Alongside the merged element, `join_identical` reports
//! whether the two inputs were provably identical, provably different,
//! or neither, which several combinators need for their precondition
//! checks.

use std::cmp::Ordering;

/// Three-valued truth for questions the analysis cannot always decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    Yes,
    No,
    Unknown,
}

impl TriState {
    /// Combines two identity verdicts: a single `No` is decisive, full
    /// agreement on `Yes` stays `Yes`, everything else is `Unknown`.
    pub fn sharpen(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::No, _) | (_, TriState::No) => TriState::No,
            (TriState::Yes, TriState::Yes) => TriState::Yes,
            _ => TriState::Unknown,
        }
    }

    pub fn is_yes(self) -> bool {
        self == TriState::Yes
    }

    pub fn is_no(self) -> bool {
        self == TriState::No
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::Yes
        } else {
            TriState::No
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(b) => TriState::from(b),
            None => TriState::Unknown,
        }
    }
}

/// Comparison result for quantities that may only be partially known,
/// such as the size of a list with gaps in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialOrder {
    Lt,
    Eq,
    Gt,
    Unordered,
}

impl PartialOrder {
    pub fn is_lt(self) -> bool {
        self == PartialOrder::Lt
    }

    pub fn is_gt(self) -> bool {
        self == PartialOrder::Gt
    }
}

impl From<Ordering> for PartialOrder {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => PartialOrder::Lt,
            Ordering::Equal => PartialOrder::Eq,
            Ordering::Greater => PartialOrder::Gt,
        }
    }
}

/// A bounded join-semilattice of inferred facts.
///
/// Implementations must satisfy, for all `a` and `b`:
/// `a.join(&b) == b.join(&a)`, `a.join(&a) == a`,
/// `a.join(&Self::bottom()) == a` and `a.join(&Self::top()) == Self::top()`.
pub trait Lattice: Clone + PartialEq + std::fmt::Debug {
    fn top() -> Self;

    fn bottom() -> Self;

    /// Joins two elements and additionally reports whether the inputs
    /// describe provably identical, provably different, or possibly
    /// equal runtime values.
    fn join_identical(&self, other: &Self) -> (Self, TriState);

    fn join(&self, other: &Self) -> Self {
        self.join_identical(other).0
    }

    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }
}

/// Joins two optional scalar attributes (sizes, alignments, counts).
/// Agreement keeps the value, disagreement is provably different,
/// a missing side decides nothing.
pub fn join_scalar<T: Copy + PartialEq>(a: Option<T>, b: Option<T>) -> (Option<T>, TriState) {
    match (a, b) {
        (Some(x), Some(y)) if x == y => (Some(x), TriState::Yes),
        (Some(_), Some(_)) => (None, TriState::No),
        _ => (None, TriState::Unknown),
    }
}
