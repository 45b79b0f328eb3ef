//! Lattice for `FunctionDescriptor` values: a list of argument layouts
//! and a return layout. A void-returning descriptor carries a value
//! layout of type `void` as its return layout, so joins treat "void"
//! and "some layout" as provably different.

use crate::lattice::{Lattice, TriState};
use crate::list::TypeList;

use super::{MemoryLayoutType, MethodHandleType, Type, ValueLayout};
use crate::types::LayoutName;

/// The return-layout sentinel produced by `ofVoid`/`dropReturnLayout`.
pub fn void_return() -> MemoryLayoutType {
    MemoryLayoutType::Value(ValueLayout {
        value_type: Type::VOID,
        byte_size: None,
        byte_alignment: None,
        name: LayoutName::NONE,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionDescriptorType {
    Top,
    Bot,
    Complete {
        arguments: TypeList<MemoryLayoutType>,
        return_layout: MemoryLayoutType,
    },
}

impl FunctionDescriptorType {
    pub fn new(arguments: TypeList<MemoryLayoutType>, return_layout: MemoryLayoutType) -> Self {
        FunctionDescriptorType::Complete {
            arguments,
            return_layout,
        }
    }

    pub fn arguments(&self) -> TypeList<MemoryLayoutType> {
        match self {
            FunctionDescriptorType::Top => TypeList::Top,
            FunctionDescriptorType::Bot => TypeList::Bottom,
            FunctionDescriptorType::Complete { arguments, .. } => arguments.clone(),
        }
    }

    pub fn return_layout(&self) -> MemoryLayoutType {
        match self {
            FunctionDescriptorType::Top => MemoryLayoutType::Top,
            FunctionDescriptorType::Bot => MemoryLayoutType::Bot,
            FunctionDescriptorType::Complete { return_layout, .. } => return_layout.clone(),
        }
    }

    pub fn with_return_layout(&self, return_layout: MemoryLayoutType) -> Self {
        match self {
            FunctionDescriptorType::Top => FunctionDescriptorType::Top,
            FunctionDescriptorType::Bot => Self::new(TypeList::Bottom, return_layout),
            FunctionDescriptorType::Complete { arguments, .. } => {
                Self::new(arguments.clone(), return_layout)
            }
        }
    }

    pub fn with_arguments(&self, arguments: TypeList<MemoryLayoutType>) -> Self {
        match self {
            FunctionDescriptorType::Top => FunctionDescriptorType::Top,
            FunctionDescriptorType::Bot => Self::new(arguments, MemoryLayoutType::Bot),
            FunctionDescriptorType::Complete { return_layout, .. } => {
                Self::new(arguments, return_layout.clone())
            }
        }
    }

    /// The Java type a downcall carrying this layout passes or returns:
    /// value layouts carry their own type, everything else is accessed
    /// through a `MemorySegment`.
    pub fn carried_type(layout: &MemoryLayoutType) -> Type {
        match layout {
            MemoryLayoutType::Top => Type::Top,
            MemoryLayoutType::Bot => Type::Bot,
            MemoryLayoutType::Value(value) => value.value_type.clone(),
            _ => Type::object("java.lang.foreign.MemorySegment"),
        }
    }

    /// The method type of a handle invoking a function with this
    /// descriptor, before any linker-specific leading parameters.
    pub fn to_method_handle_type(&self) -> MethodHandleType {
        match self {
            FunctionDescriptorType::Top => MethodHandleType::Top,
            FunctionDescriptorType::Bot => MethodHandleType::Bot,
            FunctionDescriptorType::Complete {
                arguments,
                return_layout,
            } => {
                let return_type = Self::carried_type(return_layout);
                let parameters = match arguments {
                    TypeList::Top => TypeList::Top,
                    TypeList::Bottom => TypeList::Bottom,
                    TypeList::Complete(layouts) => {
                        TypeList::complete(layouts.iter().map(Self::carried_type).collect())
                    }
                    TypeList::Incomplete(known) => TypeList::incomplete(
                        known
                            .iter()
                            .map(|(&index, layout)| (index, Self::carried_type(layout)))
                            .collect(),
                    ),
                };
                MethodHandleType::new(return_type, parameters)
            }
        }
    }
}

impl Lattice for FunctionDescriptorType {
    fn top() -> Self {
        FunctionDescriptorType::Top
    }

    fn bottom() -> Self {
        FunctionDescriptorType::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (FunctionDescriptorType::Bot, _) => (other.clone(), TriState::Unknown),
            (_, FunctionDescriptorType::Bot) => (self.clone(), TriState::Unknown),
            (FunctionDescriptorType::Top, _) | (_, FunctionDescriptorType::Top) => {
                (FunctionDescriptorType::Top, TriState::Unknown)
            }
            (
                FunctionDescriptorType::Complete {
                    arguments: left_arguments,
                    return_layout: left_return,
                },
                FunctionDescriptorType::Complete {
                    arguments: right_arguments,
                    return_layout: right_return,
                },
            ) => {
                let (arguments, arguments_identical) =
                    left_arguments.join_identical(right_arguments);
                let (return_layout, return_identical) = left_return.join_identical(right_return);
                (
                    FunctionDescriptorType::Complete {
                        arguments,
                        return_layout,
                    },
                    arguments_identical.sharpen(return_identical),
                )
            }
        }
    }
}

impl std::fmt::Display for FunctionDescriptorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionDescriptorType::Top => f.write_str("\u{22a4}"),
            FunctionDescriptorType::Bot => f.write_str("\u{22a5}"),
            FunctionDescriptorType::Complete {
                arguments,
                return_layout,
            } => write!(f, "{}{}", arguments, return_layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn void_descriptor_maps_to_void_method_type() {
        let descriptor = FunctionDescriptorType::new(
            TypeList::complete(vec![MemoryLayoutType::value(Type::INT, 4, 4)]),
            void_return(),
        );
        let handle = descriptor.to_method_handle_type();
        assert_eq!(handle.return_type(), Type::VOID);
        assert_eq!(handle.parameter_at(0), Type::INT);
    }

    #[test]
    fn group_arguments_are_passed_as_segments() {
        let group = MemoryLayoutType::Struct(crate::types::GroupLayout {
            members: TypeList::complete(vec![MemoryLayoutType::value(Type::INT, 4, 4)]),
            byte_size: Some(4),
            byte_alignment: Some(4),
            name: LayoutName::NONE,
        });
        let descriptor = FunctionDescriptorType::new(
            TypeList::complete(vec![group.clone()]),
            group,
        );
        let handle = descriptor.to_method_handle_type();
        let segment = Type::object("java.lang.foreign.MemorySegment");
        assert_eq!(handle.return_type(), segment);
        assert_eq!(handle.parameter_at(0), segment);
    }

    #[test]
    fn void_and_value_returns_are_provably_different() {
        let void_descriptor = FunctionDescriptorType::new(TypeList::complete(vec![]), void_return());
        let int_descriptor = FunctionDescriptorType::new(
            TypeList::complete(vec![]),
            MemoryLayoutType::value(Type::INT, 4, 4),
        );
        let (_, identical) = void_descriptor.join_identical(&int_descriptor);
        assert_eq!(identical, TriState::No);
    }
}
