//! The signature lattice shared by `MethodType` and `MethodHandle`
//! expressions: a return type, a parameter list, and whether the handle
//! collects trailing arguments into an array.

use crate::lattice::{Lattice, TriState};
use crate::list::TypeList;

use super::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum MethodHandleType {
    Top,
    Bot,
    Complete {
        return_type: Type,
        parameters: TypeList<Type>,
        varargs: TriState,
    },
}

impl MethodHandleType {
    pub fn new(return_type: Type, parameters: TypeList<Type>) -> Self {
        MethodHandleType::Complete {
            return_type,
            parameters,
            varargs: TriState::No,
        }
    }

    pub fn of(return_type: Type, parameter_types: Vec<Type>) -> Self {
        Self::new(return_type, TypeList::complete(parameter_types))
    }

    pub fn return_type(&self) -> Type {
        match self {
            MethodHandleType::Top => Type::Top,
            MethodHandleType::Bot => Type::Bot,
            MethodHandleType::Complete { return_type, .. } => return_type.clone(),
        }
    }

    pub fn parameters(&self) -> TypeList<Type> {
        match self {
            MethodHandleType::Top => TypeList::Top,
            MethodHandleType::Bot => TypeList::Bottom,
            MethodHandleType::Complete { parameters, .. } => parameters.clone(),
        }
    }

    pub fn parameter_at(&self, index: usize) -> Type {
        self.parameters().get(index)
    }

    pub fn varargs(&self) -> TriState {
        match self {
            MethodHandleType::Complete { varargs, .. } => *varargs,
            _ => TriState::Unknown,
        }
    }

    /// Replacing a component of an unconstrained signature makes the
    /// signature partially known; `Top` absorbs every update.
    pub fn with_return_type(&self, return_type: Type) -> Self {
        match self {
            MethodHandleType::Top => MethodHandleType::Top,
            MethodHandleType::Bot => Self::new(return_type, TypeList::Bottom),
            MethodHandleType::Complete { parameters, .. } => MethodHandleType::Complete {
                return_type,
                parameters: parameters.clone(),
                varargs: TriState::No,
            },
        }
    }

    pub fn with_parameters(&self, parameters: TypeList<Type>) -> Self {
        match self {
            MethodHandleType::Top => MethodHandleType::Top,
            MethodHandleType::Bot => Self::new(Type::Bot, parameters),
            MethodHandleType::Complete { return_type, .. } => MethodHandleType::Complete {
                return_type: return_type.clone(),
                parameters,
                varargs: TriState::No,
            },
        }
    }

    pub fn with_varargs(&self, varargs: TriState) -> Self {
        match self {
            MethodHandleType::Complete {
                return_type,
                parameters,
                ..
            } => MethodHandleType::Complete {
                return_type: return_type.clone(),
                parameters: parameters.clone(),
                varargs,
            },
            other => other.clone(),
        }
    }
}

impl Lattice for MethodHandleType {
    fn top() -> Self {
        MethodHandleType::Top
    }

    fn bottom() -> Self {
        MethodHandleType::Bot
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (MethodHandleType::Bot, _) => (other.clone(), TriState::Unknown),
            (_, MethodHandleType::Bot) => (self.clone(), TriState::Unknown),
            (MethodHandleType::Top, _) | (_, MethodHandleType::Top) => {
                (MethodHandleType::Top, TriState::Unknown)
            }
            (
                MethodHandleType::Complete {
                    return_type: left_return,
                    parameters: left_parameters,
                    varargs: left_varargs,
                },
                MethodHandleType::Complete {
                    return_type: right_return,
                    parameters: right_parameters,
                    varargs: right_varargs,
                },
            ) => {
                let (return_type, return_identical) =
                    left_return.join_identical(right_return);
                let (parameters, parameters_identical) =
                    left_parameters.join_identical(right_parameters);
                let (varargs, varargs_identical) = join_varargs(*left_varargs, *right_varargs);
                (
                    MethodHandleType::Complete {
                        return_type,
                        parameters,
                        varargs,
                    },
                    return_identical
                        .sharpen(parameters_identical)
                        .sharpen(varargs_identical),
                )
            }
        }
    }
}

fn join_varargs(left: TriState, right: TriState) -> (TriState, TriState) {
    match (left, right) {
        (TriState::Unknown, _) | (_, TriState::Unknown) => (TriState::Unknown, TriState::Unknown),
        (a, b) if a == b => (a, TriState::Yes),
        _ => (TriState::Unknown, TriState::No),
    }
}

impl std::fmt::Display for MethodHandleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodHandleType::Top => f.write_str("\u{22a4}"),
            MethodHandleType::Bot => f.write_str("\u{22a5}"),
            MethodHandleType::Complete {
                return_type,
                parameters,
                ..
            } => write!(f, "{}{}", parameters, return_type),
        }
    }
}
