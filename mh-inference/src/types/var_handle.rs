//! Lattice for `VarHandle` values: the variable type being accessed,
//! the coordinate types, and whether invocation checks are exact.

use crate::lattice::{Lattice, TriState};
use crate::list::TypeList;

use super::Type;

/// Whether `withInvokeExactBehavior`/`withInvokeBehavior` was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationBehavior {
    InvokeExact,
    Invoke,
    Unknown,
}

impl InvocationBehavior {
    fn join_identical(self, other: Self) -> (Self, TriState) {
        match (self, other) {
            (InvocationBehavior::Unknown, _) | (_, InvocationBehavior::Unknown) => {
                (InvocationBehavior::Unknown, TriState::Unknown)
            }
            (a, b) if a == b => (a, TriState::Yes),
            _ => (InvocationBehavior::Unknown, TriState::No),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarHandleType {
    Top,
    Bot,
    Complete {
        variable_type: Type,
        coordinates: TypeList<Type>,
        behavior: InvocationBehavior,
    },
}

impl VarHandleType {
    pub fn new(variable_type: Type, coordinates: TypeList<Type>) -> Self {
        VarHandleType::Complete {
            variable_type,
            coordinates,
            behavior: InvocationBehavior::Invoke,
        }
    }

    pub fn of(variable_type: Type, coordinate_types: Vec<Type>) -> Self {
        Self::new(variable_type, TypeList::complete(coordinate_types))
    }

    pub fn variable_type(&self) -> Type {
        match self {
            VarHandleType::Top => Type::Top,
            VarHandleType::Bot => Type::Bot,
            VarHandleType::Complete { variable_type, .. } => variable_type.clone(),
        }
    }

    pub fn coordinates(&self) -> TypeList<Type> {
        match self {
            VarHandleType::Top => TypeList::Top,
            VarHandleType::Bot => TypeList::Bottom,
            VarHandleType::Complete { coordinates, .. } => coordinates.clone(),
        }
    }

    pub fn behavior(&self) -> InvocationBehavior {
        match self {
            VarHandleType::Complete { behavior, .. } => *behavior,
            _ => InvocationBehavior::Unknown,
        }
    }

    pub fn with_behavior(&self, behavior: InvocationBehavior) -> Self {
        match self {
            VarHandleType::Complete {
                variable_type,
                coordinates,
                ..
            } => VarHandleType::Complete {
                variable_type: variable_type.clone(),
                coordinates: coordinates.clone(),
                behavior,
            },
            other => other.clone(),
        }
    }
}

impl Lattice for VarHandleType {
    fn top() -> Self {
        VarHandleType::Top
    }

    fn bottom() -> Self {
        VarHandleType::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (VarHandleType::Bot, _) => (other.clone(), TriState::Unknown),
            (_, VarHandleType::Bot) => (self.clone(), TriState::Unknown),
            (VarHandleType::Top, _) | (_, VarHandleType::Top) => {
                (VarHandleType::Top, TriState::Unknown)
            }
            (
                VarHandleType::Complete {
                    variable_type: left_type,
                    coordinates: left_coordinates,
                    behavior: left_behavior,
                },
                VarHandleType::Complete {
                    variable_type: right_type,
                    coordinates: right_coordinates,
                    behavior: right_behavior,
                },
            ) => {
                let (variable_type, type_identical) = left_type.join_identical(right_type);
                let (coordinates, coordinates_identical) =
                    left_coordinates.join_identical(right_coordinates);
                let (behavior, behavior_identical) =
                    left_behavior.join_identical(*right_behavior);
                if variable_type == Type::Top
                    && coordinates == TypeList::Top
                    && behavior == InvocationBehavior::Unknown
                {
                    return (
                        VarHandleType::Top,
                        type_identical
                            .sharpen(coordinates_identical)
                            .sharpen(behavior_identical),
                    );
                }
                (
                    VarHandleType::Complete {
                        variable_type,
                        coordinates,
                        behavior,
                    },
                    type_identical
                        .sharpen(coordinates_identical)
                        .sharpen(behavior_identical),
                )
            }
        }
    }
}

impl std::fmt::Display for VarHandleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarHandleType::Top => f.write_str("\u{22a4}"),
            VarHandleType::Bot => f.write_str("\u{22a5}"),
            VarHandleType::Complete {
                variable_type,
                coordinates,
                ..
            } => write!(f, "{}({})", coordinates, variable_type),
        }
    }
}
