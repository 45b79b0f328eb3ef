//! Lattices describing `java.lang.foreign` memory layouts.
//!
//! Sizes, alignments and element counts are tracked as optional exact
//! values; `None` means unknown. The byte size of a sequence layout is
//! derived, everything else is stored. Layout names form a tiny lattice
//! of their own because a layout provably without a name differs from
//! one whose name is simply unknown.

use crate::lattice::{join_scalar, Lattice, TriState};
use crate::list::TypeList;

use super::Type;

/// The optional name attached via `withName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutName {
    /// Unknown whether a name is attached.
    Top,
    /// Known to carry this name, or known to carry none.
    Exact(Option<String>),
}

impl LayoutName {
    pub const NONE: LayoutName = LayoutName::Exact(None);

    pub fn of(name: impl Into<String>) -> Self {
        LayoutName::Exact(Some(name.into()))
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (LayoutName::Exact(a), LayoutName::Exact(b)) if a == b => {
                (self.clone(), TriState::Yes)
            }
            (LayoutName::Exact(_), LayoutName::Exact(_)) => (LayoutName::Top, TriState::No),
            _ => (LayoutName::Top, TriState::Unknown),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueLayout {
    pub value_type: Type,
    pub byte_size: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressLayout {
    /// `None` means provably no target layout; an unknown target is
    /// `Some` of `Top`.
    pub target: Option<Box<MemoryLayoutType>>,
    pub byte_size: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayout {
    pub members: TypeList<MemoryLayoutType>,
    pub byte_size: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLayout {
    pub element: Box<MemoryLayoutType>,
    pub element_count: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaddingLayout {
    pub byte_size: Option<u64>,
    pub byte_alignment: Option<u64>,
    pub name: LayoutName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryLayoutType {
    Top,
    Bot,
    Value(ValueLayout),
    Address(AddressLayout),
    Struct(GroupLayout),
    Union(GroupLayout),
    Sequence(SequenceLayout),
    Padding(PaddingLayout),
}

impl MemoryLayoutType {
    pub fn value(value_type: Type, byte_size: u64, byte_alignment: u64) -> Self {
        MemoryLayoutType::Value(ValueLayout {
            value_type,
            byte_size: Some(byte_size),
            byte_alignment: Some(byte_alignment),
            name: LayoutName::NONE,
        })
    }

    pub fn address() -> Self {
        MemoryLayoutType::Address(AddressLayout {
            target: None,
            byte_size: None,
            byte_alignment: None,
            name: LayoutName::NONE,
        })
    }

    pub fn padding(byte_size: Option<u64>) -> Self {
        MemoryLayoutType::Padding(PaddingLayout {
            byte_size,
            byte_alignment: Some(1),
            name: LayoutName::NONE,
        })
    }

    /// The type a plain load through this layout produces, when this is
    /// a value layout.
    pub fn value_type(&self) -> Option<Type> {
        match self {
            MemoryLayoutType::Value(value) => Some(value.value_type.clone()),
            MemoryLayoutType::Address(_) => {
                Some(Type::object("java.lang.foreign.MemorySegment"))
            }
            _ => None,
        }
    }

    pub fn byte_size(&self) -> Option<u64> {
        match self {
            MemoryLayoutType::Top | MemoryLayoutType::Bot => None,
            MemoryLayoutType::Value(value) => value.byte_size,
            MemoryLayoutType::Address(address) => address.byte_size,
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => group.byte_size,
            MemoryLayoutType::Sequence(sequence) => sequence
                .element_count
                .zip(sequence.element.byte_size())
                .and_then(|(count, size)| count.checked_mul(size)),
            MemoryLayoutType::Padding(padding) => padding.byte_size,
        }
    }

    pub fn byte_alignment(&self) -> Option<u64> {
        match self {
            MemoryLayoutType::Top | MemoryLayoutType::Bot => None,
            MemoryLayoutType::Value(value) => value.byte_alignment,
            MemoryLayoutType::Address(address) => address.byte_alignment,
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => {
                group.byte_alignment
            }
            MemoryLayoutType::Sequence(sequence) => sequence
                .byte_alignment
                .or_else(|| sequence.element.byte_alignment()),
            MemoryLayoutType::Padding(padding) => padding.byte_alignment,
        }
    }

    pub fn name(&self) -> LayoutName {
        match self {
            MemoryLayoutType::Top | MemoryLayoutType::Bot => LayoutName::Top,
            MemoryLayoutType::Value(value) => value.name.clone(),
            MemoryLayoutType::Address(address) => address.name.clone(),
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => {
                group.name.clone()
            }
            MemoryLayoutType::Sequence(sequence) => sequence.name.clone(),
            MemoryLayoutType::Padding(padding) => padding.name.clone(),
        }
    }

    pub fn with_name(&self, name: LayoutName) -> Self {
        let mut result = self.clone();
        match &mut result {
            MemoryLayoutType::Top | MemoryLayoutType::Bot => {}
            MemoryLayoutType::Value(value) => value.name = name,
            MemoryLayoutType::Address(address) => address.name = name,
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => {
                group.name = name
            }
            MemoryLayoutType::Sequence(sequence) => sequence.name = name,
            MemoryLayoutType::Padding(padding) => padding.name = name,
        }
        result
    }

    /// Sets the alignment without validating it; the interpreter checks
    /// the power-of-two requirement at the call site.
    pub fn with_byte_alignment(&self, byte_alignment: u64) -> Self {
        let mut result = self.clone();
        match &mut result {
            MemoryLayoutType::Top | MemoryLayoutType::Bot => {}
            MemoryLayoutType::Value(value) => value.byte_alignment = Some(byte_alignment),
            MemoryLayoutType::Address(address) => {
                address.byte_alignment = Some(byte_alignment)
            }
            MemoryLayoutType::Struct(group) | MemoryLayoutType::Union(group) => {
                group.byte_alignment = Some(byte_alignment)
            }
            MemoryLayoutType::Sequence(sequence) => {
                sequence.byte_alignment = Some(byte_alignment)
            }
            MemoryLayoutType::Padding(padding) => padding.byte_alignment = Some(byte_alignment),
        }
        result
    }
}

fn join_target(
    left: &Option<Box<MemoryLayoutType>>,
    right: &Option<Box<MemoryLayoutType>>,
) -> (Option<Box<MemoryLayoutType>>, TriState) {
    match (left, right) {
        (None, None) => (None, TriState::Yes),
        (Some(a), Some(b)) => {
            let (joined, identical) = a.join_identical(b);
            (Some(Box::new(joined)), identical)
        }
        _ => (Some(Box::new(MemoryLayoutType::Top)), TriState::No),
    }
}

impl Lattice for MemoryLayoutType {
    fn top() -> Self {
        MemoryLayoutType::Top
    }

    fn bottom() -> Self {
        MemoryLayoutType::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        use MemoryLayoutType::*;
        match (self, other) {
            (Bot, _) => (other.clone(), TriState::Unknown),
            (_, Bot) => (self.clone(), TriState::Unknown),
            (Top, _) | (_, Top) => (Top, TriState::Unknown),
            (Value(a), Value(b)) => {
                let (value_type, type_identical) = a.value_type.join_identical(&b.value_type);
                let (byte_size, size_identical) = join_scalar(a.byte_size, b.byte_size);
                let (byte_alignment, alignment_identical) =
                    join_scalar(a.byte_alignment, b.byte_alignment);
                let (name, name_identical) = a.name.join_identical(&b.name);
                (
                    Value(ValueLayout {
                        value_type,
                        byte_size,
                        byte_alignment,
                        name,
                    }),
                    type_identical
                        .sharpen(size_identical)
                        .sharpen(alignment_identical)
                        .sharpen(name_identical),
                )
            }
            (Address(a), Address(b)) => {
                let (target, target_identical) = join_target(&a.target, &b.target);
                let (byte_size, size_identical) = join_scalar(a.byte_size, b.byte_size);
                let (byte_alignment, alignment_identical) =
                    join_scalar(a.byte_alignment, b.byte_alignment);
                let (name, name_identical) = a.name.join_identical(&b.name);
                (
                    Address(AddressLayout {
                        target,
                        byte_size,
                        byte_alignment,
                        name,
                    }),
                    target_identical
                        .sharpen(size_identical)
                        .sharpen(alignment_identical)
                        .sharpen(name_identical),
                )
            }
            (Struct(a), Struct(b)) => {
                let (group, identical) = join_groups(a, b);
                (Struct(group), identical)
            }
            (Union(a), Union(b)) => {
                let (group, identical) = join_groups(a, b);
                (Union(group), identical)
            }
            (Sequence(a), Sequence(b)) => {
                let (element, element_identical) = a.element.join_identical(&b.element);
                let (element_count, count_identical) =
                    join_scalar(a.element_count, b.element_count);
                let (byte_alignment, alignment_identical) =
                    join_scalar(a.byte_alignment, b.byte_alignment);
                let (name, name_identical) = a.name.join_identical(&b.name);
                (
                    Sequence(SequenceLayout {
                        element: Box::new(element),
                        element_count,
                        byte_alignment,
                        name,
                    }),
                    element_identical
                        .sharpen(count_identical)
                        .sharpen(alignment_identical)
                        .sharpen(name_identical),
                )
            }
            (Padding(a), Padding(b)) => {
                let (byte_size, size_identical) = join_scalar(a.byte_size, b.byte_size);
                let (byte_alignment, alignment_identical) =
                    join_scalar(a.byte_alignment, b.byte_alignment);
                let (name, name_identical) = a.name.join_identical(&b.name);
                (
                    Padding(PaddingLayout {
                        byte_size,
                        byte_alignment,
                        name,
                    }),
                    size_identical
                        .sharpen(alignment_identical)
                        .sharpen(name_identical),
                )
            }
            // Different layout kinds describe provably different layouts.
            _ => (Top, TriState::No),
        }
    }
}

fn join_groups(a: &GroupLayout, b: &GroupLayout) -> (GroupLayout, TriState) {
    let (members, members_identical) = a.members.join_identical(&b.members);
    let (byte_size, size_identical) = join_scalar(a.byte_size, b.byte_size);
    let (byte_alignment, alignment_identical) = join_scalar(a.byte_alignment, b.byte_alignment);
    let (name, name_identical) = a.name.join_identical(&b.name);
    (
        GroupLayout {
            members,
            byte_size,
            byte_alignment,
            name,
        },
        members_identical
            .sharpen(size_identical)
            .sharpen(alignment_identical)
            .sharpen(name_identical),
    )
}

fn fmt_opt(f: &mut std::fmt::Formatter<'_>, value: Option<u64>) -> std::fmt::Result {
    match value {
        Some(v) => write!(f, "{}", v),
        None => f.write_str("?"),
    }
}

fn fmt_alignment_prefix(
    f: &mut std::fmt::Formatter<'_>,
    byte_size: Option<u64>,
    byte_alignment: Option<u64>,
) -> std::fmt::Result {
    // The alignment prefix is omitted only when it provably equals the
    // size, which is the common case for the canonical value layouts.
    if byte_size.is_none() || byte_size != byte_alignment {
        fmt_opt(f, byte_alignment)?;
        f.write_str("%")?;
    }
    Ok(())
}

fn fmt_members(
    f: &mut std::fmt::Formatter<'_>,
    members: &TypeList<MemoryLayoutType>,
    separator: &str,
) -> std::fmt::Result {
    match members {
        TypeList::Top => f.write_str("[{\u{22a4}}]"),
        TypeList::Bottom => f.write_str("[{\u{22a5}}]"),
        TypeList::Complete(_) | TypeList::Incomplete(_) => {
            let last = match members {
                TypeList::Complete(elements) => elements.len(),
                TypeList::Incomplete(known) => {
                    known.keys().next_back().map(|&k| k + 1).unwrap_or(0)
                }
                _ => unreachable!(),
            };
            f.write_str("[")?;
            for index in 0..last {
                if index > 0 {
                    f.write_str(separator)?;
                }
                write!(f, "{}", members.get(index))?;
            }
            f.write_str("]")
        }
    }
}

fn fmt_name(f: &mut std::fmt::Formatter<'_>, name: &LayoutName) -> std::fmt::Result {
    if let LayoutName::Exact(Some(name)) = name {
        write!(f, "({})", name)?;
    }
    Ok(())
}

impl std::fmt::Display for MemoryLayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryLayoutType::Top => f.write_str("\u{22a4}"),
            MemoryLayoutType::Bot => f.write_str("\u{22a5}"),
            MemoryLayoutType::Value(value) => {
                fmt_alignment_prefix(f, value.byte_size, value.byte_alignment)?;
                write!(f, "{}", value.value_type)?;
                fmt_opt(f, value.byte_size)?;
                fmt_name(f, &value.name)
            }
            MemoryLayoutType::Address(address) => {
                f.write_str("a")?;
                if let Some(target) = &address.target {
                    write!(f, ":{}", target)?;
                }
                fmt_name(f, &address.name)
            }
            MemoryLayoutType::Struct(group) => {
                fmt_alignment_prefix(f, group.byte_size, group.byte_alignment)?;
                fmt_members(f, &group.members, "")?;
                fmt_name(f, &group.name)
            }
            MemoryLayoutType::Union(group) => {
                fmt_alignment_prefix(f, group.byte_size, group.byte_alignment)?;
                fmt_members(f, &group.members, "|")?;
                fmt_name(f, &group.name)
            }
            MemoryLayoutType::Sequence(sequence) => {
                f.write_str("[")?;
                fmt_opt(f, sequence.element_count)?;
                write!(f, ":{}]", sequence.element)?;
                fmt_name(f, &sequence.name)
            }
            MemoryLayoutType::Padding(padding) => {
                f.write_str("x")?;
                fmt_opt(f, padding.byte_size)?;
                fmt_name(f, &padding.name)
            }
        }
    }
}
