//! A lattice of lists whose length and element knowledge may both be
//! partial.
//!
//! Besides the usual `Top`/`Bottom` poles, a list is either `Complete`
//! (length and every slot known as lattice elements) or `Incomplete`
//! (a sparse map of index to element with no upper length bound). The
//! splice operations below are what the argument-reshaping combinators
//! are built from; they shift known indices consistently so that facts
//! never end up attached to the wrong position.

use std::collections::BTreeMap;

use crate::lattice::{Lattice, PartialOrder, TriState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeList<T> {
    /// Nothing is known, not even the length.
    Top,
    /// No constraint has been collected yet.
    Bottom,
    /// Length and all slots are known (slots may still be `T::top()`).
    Complete(Vec<T>),
    /// Some slots are known, the length is not. Invariant: non-empty.
    Incomplete(BTreeMap<usize, T>),
}

impl<T: Lattice> TypeList<T> {
    pub fn complete(elements: Vec<T>) -> Self {
        TypeList::Complete(elements)
    }

    /// Smart constructor keeping the non-empty invariant: a sparse map
    /// without entries carries no information and collapses to `Bottom`.
    pub fn incomplete(known: BTreeMap<usize, T>) -> Self {
        if known.is_empty() {
            TypeList::Bottom
        } else {
            TypeList::Incomplete(known)
        }
    }

    /// The element at `index`. For sparse lists, unknown slots below the
    /// greatest known index may hold anything (`top`), while slots above
    /// it may not even exist (`bottom`).
    pub fn get(&self, index: usize) -> T {
        match self {
            TypeList::Top => T::top(),
            TypeList::Bottom => T::bottom(),
            TypeList::Complete(elements) => {
                elements.get(index).cloned().unwrap_or_else(T::top)
            }
            TypeList::Incomplete(known) => match known.get(&index) {
                Some(element) => element.clone(),
                None if index < Self::last_key(known) => T::top(),
                None => T::bottom(),
            },
        }
    }

    /// Replaces the slot at `index`. Out-of-range writes on a complete
    /// list discard all knowledge; on the unbounded variants they pin
    /// down exactly the written slot.
    pub fn set_at(&self, index: usize, element: T) -> Self {
        match self {
            TypeList::Top | TypeList::Bottom => {
                TypeList::incomplete(BTreeMap::from([(index, element)]))
            }
            TypeList::Complete(elements) => {
                if index >= elements.len() {
                    return TypeList::Top;
                }
                let mut elements = elements.clone();
                elements[index] = element;
                TypeList::Complete(elements)
            }
            TypeList::Incomplete(known) => {
                let mut known = known.clone();
                known.insert(index, element);
                TypeList::Incomplete(known)
            }
        }
    }

    /// Removes the first `n` elements, shifting the rest down.
    pub fn drop_first(&self, n: usize) -> Self {
        match self {
            TypeList::Top => TypeList::Top,
            TypeList::Bottom => TypeList::Bottom,
            TypeList::Complete(elements) => {
                if elements.len() < n {
                    return TypeList::Top;
                }
                TypeList::Complete(elements[n..].to_vec())
            }
            TypeList::Incomplete(known) => TypeList::incomplete(
                known
                    .iter()
                    .filter(|(&index, _)| index >= n)
                    .map(|(&index, element)| (index - n, element.clone()))
                    .collect(),
            ),
        }
    }

    /// Removes `n` elements starting at `index`, shifting later slots
    /// down by `n`.
    pub fn remove_at(&self, index: usize, n: usize) -> Self {
        match self {
            TypeList::Top => TypeList::Top,
            TypeList::Bottom => TypeList::Bottom,
            TypeList::Complete(elements) => {
                if index + n > elements.len() {
                    return TypeList::Top;
                }
                let mut elements = elements.clone();
                elements.drain(index..index + n);
                TypeList::Complete(elements)
            }
            TypeList::Incomplete(known) => TypeList::incomplete(
                known
                    .iter()
                    .filter(|(&i, _)| i < index || i >= index + n)
                    .map(|(&i, element)| {
                        if i >= index + n {
                            (i - n, element.clone())
                        } else {
                            (i, element.clone())
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// Inserts all elements of `other` at `index`, shifting later slots
    /// up. Inserting a list of unknown length invalidates every slot at
    /// or beyond the insertion point.
    pub fn add_all_at(&self, index: usize, other: &Self) -> Self {
        match self {
            TypeList::Top => TypeList::Top,
            TypeList::Bottom => match other {
                TypeList::Top => TypeList::Top,
                _ => TypeList::incomplete(Self::shifted_known(other, index)),
            },
            TypeList::Complete(elements) => {
                if index > elements.len() {
                    return TypeList::Top;
                }
                match other {
                    TypeList::Top => TypeList::Top,
                    TypeList::Bottom => TypeList::incomplete(
                        elements
                            .iter()
                            .take(index)
                            .cloned()
                            .enumerate()
                            .collect(),
                    ),
                    TypeList::Complete(incoming) => {
                        let mut elements = elements.clone();
                        elements.splice(index..index, incoming.iter().cloned());
                        TypeList::Complete(elements)
                    }
                    TypeList::Incomplete(_) => {
                        let mut known: BTreeMap<usize, T> = elements
                            .iter()
                            .take(index)
                            .cloned()
                            .enumerate()
                            .collect();
                        known.extend(Self::shifted_known(other, index));
                        TypeList::incomplete(known)
                    }
                }
            }
            TypeList::Incomplete(known) => match other {
                TypeList::Top => TypeList::Top,
                TypeList::Bottom => TypeList::incomplete(
                    known
                        .iter()
                        .filter(|(&i, _)| i < index)
                        .map(|(&i, element)| (i, element.clone()))
                        .collect(),
                ),
                TypeList::Complete(incoming) => {
                    let mut merged: BTreeMap<usize, T> = known
                        .iter()
                        .map(|(&i, element)| {
                            if i >= index {
                                (i + incoming.len(), element.clone())
                            } else {
                                (i, element.clone())
                            }
                        })
                        .collect();
                    for (offset, element) in incoming.iter().enumerate() {
                        merged.insert(index + offset, element.clone());
                    }
                    TypeList::incomplete(merged)
                }
                TypeList::Incomplete(_) => {
                    let mut merged: BTreeMap<usize, T> = known
                        .iter()
                        .filter(|(&i, _)| i < index)
                        .map(|(&i, element)| (i, element.clone()))
                        .collect();
                    merged.extend(Self::shifted_known(other, index));
                    TypeList::incomplete(merged)
                }
            },
        }
    }

    /// Compares the (possibly unknown) size against a concrete value.
    /// For sparse lists the size is at least `last_key + 1`, which can
    /// prove `Gt` but nothing else.
    pub fn compare_size(&self, size: usize) -> PartialOrder {
        match self {
            TypeList::Top | TypeList::Bottom => PartialOrder::Unordered,
            TypeList::Complete(elements) => PartialOrder::from(elements.len().cmp(&size)),
            TypeList::Incomplete(known) => {
                if size <= Self::last_key(known) {
                    PartialOrder::Gt
                } else {
                    PartialOrder::Unordered
                }
            }
        }
    }

    pub fn has_size(&self, size: usize) -> TriState {
        match self.compare_size(size) {
            PartialOrder::Eq => TriState::Yes,
            PartialOrder::Unordered => TriState::Unknown,
            _ => TriState::No,
        }
    }

    /// Whether the size satisfies `predicate`, if that is decidable.
    pub fn size_matches(&self, predicate: impl Fn(usize) -> bool) -> TriState {
        match self.size() {
            Some(size) => TriState::from(predicate(size)),
            None => TriState::Unknown,
        }
    }

    pub fn size(&self) -> Option<usize> {
        match self {
            TypeList::Complete(elements) => Some(elements.len()),
            _ => None,
        }
    }

    /// All elements known so far, in index order. For complete lists
    /// this is the whole list.
    pub fn known_elements(&self) -> Vec<T> {
        match self {
            TypeList::Top | TypeList::Bottom => Vec::new(),
            TypeList::Complete(elements) => elements.clone(),
            TypeList::Incomplete(known) => known.values().cloned().collect(),
        }
    }

    pub fn last(&self) -> Option<T> {
        match self {
            TypeList::Complete(elements) => elements.last().cloned(),
            _ => None,
        }
    }

    fn last_key(known: &BTreeMap<usize, T>) -> usize {
        known.keys().next_back().copied().unwrap_or(0)
    }

    fn shifted_known(list: &Self, offset: usize) -> BTreeMap<usize, T> {
        match list {
            TypeList::Top | TypeList::Bottom => BTreeMap::new(),
            TypeList::Complete(elements) => elements
                .iter()
                .enumerate()
                .map(|(i, element)| (i + offset, element.clone()))
                .collect(),
            TypeList::Incomplete(known) => known
                .iter()
                .map(|(&i, element)| (i + offset, element.clone()))
                .collect(),
        }
    }
}

impl<T: Lattice + std::fmt::Display> std::fmt::Display for TypeList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeList::Top => f.write_str("({\u{22a4}})"),
            TypeList::Bottom => f.write_str("({\u{22a5}})"),
            TypeList::Complete(elements) => {
                f.write_str("(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str(")")
            }
            TypeList::Incomplete(known) => {
                f.write_str("(")?;
                for (i, (index, element)) in known.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}={}", index, element)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl<T: Lattice> Lattice for TypeList<T> {
    fn top() -> Self {
        TypeList::Top
    }

    fn bottom() -> Self {
        TypeList::Bottom
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (TypeList::Bottom, _) => (other.clone(), TriState::Unknown),
            (_, TypeList::Bottom) => (self.clone(), TriState::Unknown),
            (TypeList::Top, _) | (_, TypeList::Top) => (TypeList::Top, TriState::Unknown),
            (TypeList::Complete(left), TypeList::Complete(right)) => {
                if left.len() != right.len() {
                    return (TypeList::Top, TriState::No);
                }
                let mut identical = TriState::Yes;
                let mut merged = Vec::with_capacity(left.len());
                for (a, b) in left.iter().zip(right) {
                    let (element, same) = a.join_identical(b);
                    identical = identical.sharpen(same);
                    merged.push(element);
                }
                (TypeList::Complete(merged), identical)
            }
            (TypeList::Complete(elements), TypeList::Incomplete(known))
            | (TypeList::Incomplete(known), TypeList::Complete(elements)) => {
                if Self::last_key(known) >= elements.len() {
                    return (TypeList::Top, TriState::No);
                }
                let mut identical = TriState::Unknown;
                let mut merged = elements.clone();
                for (&index, element) in known {
                    let (joined, same) = merged[index].join_identical(element);
                    identical = identical.sharpen(same);
                    merged[index] = joined;
                }
                if identical != TriState::No {
                    identical = TriState::Unknown;
                }
                (TypeList::Complete(merged), identical)
            }
            (TypeList::Incomplete(left), TypeList::Incomplete(right)) => {
                let mut identical = TriState::Unknown;
                let mut merged = BTreeMap::new();
                for (&index, element) in left {
                    match right.get(&index) {
                        Some(other_element) => {
                            let (joined, same) = element.join_identical(other_element);
                            identical = identical.sharpen(same);
                            merged.insert(index, joined);
                        }
                        None => {
                            merged.insert(index, element.clone());
                        }
                    }
                }
                for (&index, element) in right {
                    merged.entry(index).or_insert_with(|| element.clone());
                }
                if identical != TriState::No {
                    identical = TriState::Unknown;
                }
                (TypeList::incomplete(merged), identical)
            }
        }
    }
}
