//! Handlers for the `MethodHandles` factory methods that create a
//! handle or var handle from scratch.

use crate::ir::{CallExpr, ConstantValue, ExprId, ExprKind, JavaType, Primitive};
use crate::list::TypeList;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{LatticeValue, MethodHandleType, Type, VarHandleType};

use super::{handle, var_handle, Interpreter};

/// The component type of a known array type, `Top` otherwise.
fn component_of(array: &Type) -> Type {
    match array.exact().and_then(JavaType::component) {
        Some(component) => Type::Exact(component.clone()),
        None => Type::Top,
    }
}

pub(super) fn array_constructor(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let array = interp.array_type(*call.args.first()?);
    handle(MethodHandleType::of(array, vec![Type::INT]))
}

pub(super) fn array_element_getter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let array = interp.array_type(*call.args.first()?);
    let component = component_of(&array);
    handle(MethodHandleType::of(component, vec![array, Type::INT]))
}

pub(super) fn array_element_setter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let array = interp.array_type(*call.args.first()?);
    let component = component_of(&array);
    handle(MethodHandleType::of(
        Type::VOID,
        vec![array, Type::INT, component],
    ))
}

pub(super) fn array_element_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let array = interp.array_type(*call.args.first()?);
    let component = component_of(&array);
    var_handle(VarHandleType::of(component, vec![array, Type::INT]))
}

pub(super) fn array_length(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let array = interp.array_type(*call.args.first()?);
    handle(MethodHandleType::of(Type::INT, vec![array]))
}

pub(super) fn byte_array_view_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let coordinate = Type::Exact(JavaType::array_of(JavaType::Primitive(Primitive::Byte)));
    view_var_handle(interp, call, at, block, coordinate)
}

pub(super) fn byte_buffer_view_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    view_var_handle(interp, call, at, block, Type::object("java.nio.ByteBuffer"))
}

fn view_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
    coordinate: Type,
) -> Option<LatticeValue> {
    let view_expr = *call.args.first()?;
    let array = interp.array_type(view_expr);
    let component = component_of(&array);
    if let Some(JavaType::Primitive(primitive)) = component.exact() {
        let supported = matches!(
            primitive,
            Primitive::Short
                | Primitive::Char
                | Primitive::Int
                | Primitive::Long
                | Primitive::Float
                | Primitive::Double
        );
        if !supported {
            let span = interp.span(view_expr);
            let found = component.to_string();
            let top: VarHandleType = interp.problem(
                view_expr,
                AnalysisProblem::UnsupportedViewHandleComponent { found, span },
            );
            return var_handle(top);
        }
    }
    var_handle(VarHandleType::of(component, vec![coordinate, Type::INT]))
}

pub(super) fn constant(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let type_expr = *call.args.first()?;
    let value_expr = *call.args.get(1)?;
    let ty = interp.non_void_type(type_expr);
    if let (Some(target), Some(source)) = (ty.exact(), interp.static_type(value_expr)) {
        if !interp.oracle().is_convertible_from(target, source) {
            let span = interp.span(value_expr);
            let top: MethodHandleType = interp.problem(
                value_expr,
                AnalysisProblem::ParametersIncompatible {
                    expected: target.display_name(),
                    found: source.display_name(),
                    span,
                },
            );
            return handle(top);
        }
    }
    if ty.exact().is_some() && is_zero_constant(&interp.expr(value_expr).constant) {
        let span = interp.span(at);
        interp.report(at, AnalysisProblem::RedundantConstantZero { span });
    }
    handle(MethodHandleType::of(ty, vec![]))
}

fn is_zero_constant(constant: &Option<ConstantValue>) -> bool {
    matches!(
        constant,
        Some(ConstantValue::Int(0)) | Some(ConstantValue::Long(0)) | Some(ConstantValue::Bool(false))
    )
}

pub(super) fn empty(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let method_type = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(method_type)
}

pub(super) fn identity(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let ty = interp.non_void_type(*call.args.first()?);
    handle(MethodHandleType::of(ty.clone(), vec![ty]))
}

/// `invoker` and `exactInvoker` share a signature; exactness only
/// affects runtime checking.
pub(super) fn invoker(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let method_type = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let parameters = method_type.parameters().add_all_at(
        0,
        &TypeList::complete(vec![Type::object("java.lang.invoke.MethodHandle")]),
    );
    handle(method_type.with_parameters(parameters))
}

pub(super) fn spread_invoker(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let method_type = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let Some(leading) = interp.non_negative_int(*call.args.get(1)?) else {
        return handle(MethodHandleType::Top);
    };
    let TypeList::Complete(parameters) = method_type.parameters() else {
        return handle(MethodHandleType::Top);
    };
    if leading as usize >= parameters.len() {
        return handle(MethodHandleType::Top);
    }
    let mut result = vec![Type::object("java.lang.invoke.MethodHandle")];
    result.extend(parameters[..leading as usize].iter().cloned());
    result.push(Type::Exact(JavaType::array_of(JavaType::object(
        "java.lang.Object",
    ))));
    handle(MethodHandleType::of(method_type.return_type(), result))
}

pub(super) fn throw_exception(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let return_type = interp.as_type(*call.args.first()?);
    let exception_type = interp.as_type(*call.args.get(1)?);
    handle(MethodHandleType::of(return_type, vec![exception_type]))
}

pub(super) fn zero(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let ty = interp.non_void_type(*call.args.first()?);
    handle(MethodHandleType::of(ty, vec![]))
}

pub(super) fn var_handle_invoker(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    var_handle_invoker_common(interp, call, at, block, false)
}

pub(super) fn var_handle_exact_invoker(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    var_handle_invoker_common(interp, call, at, block, true)
}

/// How an access-mode constant constrains the invoked method type.
enum AccessKind {
    Get,
    Set,
    CompareAndSet,
}

fn access_kind(name: &str) -> AccessKind {
    if name.starts_with("SET") {
        AccessKind::Set
    } else if name.contains("COMPARE_AND_SET") {
        AccessKind::CompareAndSet
    } else {
        // GET*, COMPARE_AND_EXCHANGE* and GET_AND_* all produce a value
        AccessKind::Get
    }
}

fn var_handle_invoker_common(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
    exact: bool,
) -> Option<LatticeValue> {
    let mode_expr = *call.args.first()?;
    let type_expr = *call.args.get(1)?;
    let method_type = interp
        .handle_type(type_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    if exact {
        if let ExprKind::FieldConstant { name, .. } = &interp.expr(mode_expr).kind {
            let return_type = method_type.return_type();
            match access_kind(name) {
                AccessKind::Get => {
                    if return_type.is_void().is_yes() {
                        let span = interp.span(type_expr);
                        let top: MethodHandleType = interp
                            .problem(type_expr, AnalysisProblem::TypeMustNotBeVoid { span });
                        return handle(top);
                    }
                }
                AccessKind::Set => {
                    if return_type.is_void().is_no() {
                        let span = interp.span(type_expr);
                        let found = return_type.to_string();
                        let top: MethodHandleType = interp.problem(
                            type_expr,
                            AnalysisProblem::ReturnTypeMustBeVoid { found, span },
                        );
                        return handle(top);
                    }
                }
                AccessKind::CompareAndSet => {
                    if return_type.matches(&super::boolean_type()).is_no() {
                        let span = interp.span(type_expr);
                        let found = return_type.to_string();
                        let top: MethodHandleType = interp.problem(
                            type_expr,
                            AnalysisProblem::BooleanReturnRequired { found, span },
                        );
                        return handle(top);
                    }
                }
            }
        }
    }
    let parameters = method_type.parameters().add_all_at(
        0,
        &TypeList::complete(vec![Type::object("java.lang.invoke.VarHandle")]),
    );
    handle(method_type.with_parameters(parameters))
}
