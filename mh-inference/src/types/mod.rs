//! The lattice domains the interpreter computes over.
//!
//! Each domain has its own element type; [`LatticeValue`] is the tagged
//! union the fact table stores. Joins across different domains never
//! happen by construction, since every expression has a single static
//! type and therefore a single domain.

use crate::ir::{Domain, JavaType, Primitive};
use crate::lattice::{Lattice, TriState};

pub mod descriptor;
pub mod layout;
pub mod method_handle;
pub mod path;
pub mod var_handle;

pub use descriptor::{void_return, FunctionDescriptorType};
pub use layout::{
    AddressLayout, GroupLayout, LayoutName, MemoryLayoutType, PaddingLayout, SequenceLayout,
    ValueLayout,
};
pub use method_handle::MethodHandleType;
pub use path::{GroupVariant, PathElementType, SequenceVariant};
pub use var_handle::{InvocationBehavior, VarHandleType};

/// A possibly-unknown Java type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Top,
    Bot,
    Exact(JavaType),
}

impl Type {
    pub const BOOLEAN: Type = Type::Exact(JavaType::Primitive(Primitive::Boolean));
    pub const BYTE: Type = Type::Exact(JavaType::Primitive(Primitive::Byte));
    pub const CHAR: Type = Type::Exact(JavaType::Primitive(Primitive::Char));
    pub const SHORT: Type = Type::Exact(JavaType::Primitive(Primitive::Short));
    pub const INT: Type = Type::Exact(JavaType::Primitive(Primitive::Int));
    pub const LONG: Type = Type::Exact(JavaType::Primitive(Primitive::Long));
    pub const FLOAT: Type = Type::Exact(JavaType::Primitive(Primitive::Float));
    pub const DOUBLE: Type = Type::Exact(JavaType::Primitive(Primitive::Double));
    pub const VOID: Type = Type::Exact(JavaType::Primitive(Primitive::Void));

    pub fn object(name: &str) -> Type {
        Type::Exact(JavaType::object(name))
    }

    pub fn exact(&self) -> Option<&JavaType> {
        match self {
            Type::Exact(java_type) => Some(java_type),
            _ => None,
        }
    }

    /// Whether this is provably `java_type`.
    pub fn matches(&self, java_type: &JavaType) -> TriState {
        match self {
            Type::Exact(exact) => TriState::from(exact == java_type),
            _ => TriState::Unknown,
        }
    }

    /// Whether this could still be `java_type`.
    pub fn can_be(&self, java_type: &JavaType) -> bool {
        self.matches(java_type) != TriState::No
    }

    pub fn is_primitive(&self) -> TriState {
        match self {
            Type::Exact(java_type) => TriState::from(java_type.is_primitive()),
            _ => TriState::Unknown,
        }
    }

    pub fn is_void(&self) -> TriState {
        self.matches(&JavaType::Primitive(Primitive::Void))
    }

    pub fn erased(&self) -> Type {
        match self {
            Type::Exact(java_type) => Type::Exact(java_type.erased()),
            other => other.clone(),
        }
    }
}

impl Lattice for Type {
    fn top() -> Self {
        Type::Top
    }

    fn bottom() -> Self {
        Type::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (Type::Bot, _) => (other.clone(), TriState::Unknown),
            (_, Type::Bot) => (self.clone(), TriState::Unknown),
            (Type::Top, _) | (_, Type::Top) => (Type::Top, TriState::Unknown),
            (Type::Exact(a), Type::Exact(b)) => {
                if a == b {
                    (self.clone(), TriState::Yes)
                } else {
                    (Type::Top, TriState::No)
                }
            }
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Top => f.write_str("\u{22a4}"),
            Type::Bot => f.write_str("\u{22a5}"),
            Type::Exact(java_type) => write!(f, "{}", java_type),
        }
    }
}

/// An inferred fact about one expression, tagged by domain.
#[derive(Debug, Clone, PartialEq)]
pub enum LatticeValue {
    Handle(MethodHandleType),
    VarHandle(VarHandleType),
    Layout(MemoryLayoutType),
    Path(PathElementType),
    Descriptor(FunctionDescriptorType),
}

impl LatticeValue {
    pub fn domain(&self) -> Domain {
        match self {
            LatticeValue::Handle(_) => Domain::MethodHandle,
            LatticeValue::VarHandle(_) => Domain::VarHandle,
            LatticeValue::Layout(_) => Domain::MemoryLayout,
            LatticeValue::Path(_) => Domain::PathElement,
            LatticeValue::Descriptor(_) => Domain::FunctionDescriptor,
        }
    }

    pub fn top_of(domain: Domain) -> LatticeValue {
        match domain {
            Domain::MethodHandle => LatticeValue::Handle(MethodHandleType::top()),
            Domain::VarHandle => LatticeValue::VarHandle(VarHandleType::top()),
            Domain::MemoryLayout => LatticeValue::Layout(MemoryLayoutType::top()),
            Domain::PathElement => LatticeValue::Path(PathElementType::top()),
            Domain::FunctionDescriptor => {
                LatticeValue::Descriptor(FunctionDescriptorType::top())
            }
        }
    }

    pub fn bottom_of(domain: Domain) -> LatticeValue {
        match domain {
            Domain::MethodHandle => LatticeValue::Handle(MethodHandleType::bottom()),
            Domain::VarHandle => LatticeValue::VarHandle(VarHandleType::bottom()),
            Domain::MemoryLayout => LatticeValue::Layout(MemoryLayoutType::bottom()),
            Domain::PathElement => LatticeValue::Path(PathElementType::bottom()),
            Domain::FunctionDescriptor => {
                LatticeValue::Descriptor(FunctionDescriptorType::bottom())
            }
        }
    }

    /// Joins two facts of the same domain. Mismatched domains cannot
    /// occur for a well-typed body; if they do, the join degrades to
    /// `Top` of the left domain.
    pub fn join(&self, other: &LatticeValue) -> LatticeValue {
        match (self, other) {
            (LatticeValue::Handle(a), LatticeValue::Handle(b)) => {
                LatticeValue::Handle(a.join(b))
            }
            (LatticeValue::VarHandle(a), LatticeValue::VarHandle(b)) => {
                LatticeValue::VarHandle(a.join(b))
            }
            (LatticeValue::Layout(a), LatticeValue::Layout(b)) => LatticeValue::Layout(a.join(b)),
            (LatticeValue::Path(a), LatticeValue::Path(b)) => LatticeValue::Path(a.join(b)),
            (LatticeValue::Descriptor(a), LatticeValue::Descriptor(b)) => {
                LatticeValue::Descriptor(a.join(b))
            }
            _ => LatticeValue::top_of(self.domain()),
        }
    }

    pub fn as_handle(&self) -> Option<&MethodHandleType> {
        match self {
            LatticeValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_var_handle(&self) -> Option<&VarHandleType> {
        match self {
            LatticeValue::VarHandle(var_handle) => Some(var_handle),
            _ => None,
        }
    }

    pub fn as_layout(&self) -> Option<&MemoryLayoutType> {
        match self {
            LatticeValue::Layout(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathElementType> {
        match self {
            LatticeValue::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&FunctionDescriptorType> {
        match self {
            LatticeValue::Descriptor(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

impl std::fmt::Display for LatticeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatticeValue::Handle(v) => write!(f, "{}", v),
            LatticeValue::VarHandle(v) => write!(f, "{}", v),
            LatticeValue::Layout(v) => write!(f, "{}", v),
            LatticeValue::Path(v) => write!(f, "{}", v),
            LatticeValue::Descriptor(v) => write!(f, "{}", v),
        }
    }
}
