//! Handlers for `MethodHandles.Lookup` find methods. Field accessors
//! have fully determined signatures; method lookups reshape the passed
//! `MethodType` around the receiver.

use crate::ir::{CallExpr, ExprId};
use crate::list::TypeList;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{LatticeValue, MethodHandleType, Type, VarHandleType};

use super::{handle, var_handle, Interpreter};

pub(super) fn find_constructor(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let type_expr = *call.args.get(1)?;
    let method_type = interp
        .handle_type(type_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    if !method_type.return_type().can_be(&super::void_type()) {
        let span = interp.span(type_expr);
        let found = method_type.return_type().to_string();
        let top: MethodHandleType =
            interp.problem(type_expr, AnalysisProblem::ReturnTypeMustBeVoid { found, span });
        return handle(top);
    }
    let constructed = interp.reference_type(*call.args.first()?);
    handle(method_type.with_return_type(constructed))
}

pub(super) fn find_getter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let owner = interp.reference_type(*call.args.first()?);
    let field = interp.non_void_type(*call.args.get(2)?);
    handle(MethodHandleType::of(field, vec![owner]))
}

pub(super) fn find_setter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let owner = interp.reference_type(*call.args.first()?);
    let field = interp.non_void_type(*call.args.get(2)?);
    handle(MethodHandleType::of(Type::VOID, vec![owner, field]))
}

pub(super) fn find_static_getter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let field = interp.non_void_type(*call.args.get(2)?);
    handle(MethodHandleType::of(field, vec![]))
}

pub(super) fn find_static_setter(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let field = interp.non_void_type(*call.args.get(2)?);
    handle(MethodHandleType::of(Type::VOID, vec![field]))
}

pub(super) fn find_static(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let method_type = interp
        .handle_type(*call.args.get(2)?, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(method_type)
}

pub(super) fn find_virtual(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let receiver = interp.reference_type(*call.args.first()?);
    let method_type = interp
        .handle_type(*call.args.get(2)?, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(prepend_receiver(&method_type, receiver))
}

pub(super) fn find_special(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let method_type = interp
        .handle_type(*call.args.get(2)?, block)
        .unwrap_or(MethodHandleType::Bot);
    let caller = interp.reference_type(*call.args.get(3)?);
    handle(prepend_receiver(&method_type, caller))
}

/// Builds `(receiver, params...)` while keeping the varargs verdict of
/// the original type.
fn prepend_receiver(method_type: &MethodHandleType, receiver: Type) -> MethodHandleType {
    let parameters = TypeList::complete(vec![receiver]).add_all_at(1, &method_type.parameters());
    method_type
        .with_parameters(parameters)
        .with_varargs(method_type.varargs())
}

pub(super) fn find_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let owner = interp.reference_type(*call.args.first()?);
    let field = interp.non_void_type(*call.args.get(2)?);
    var_handle(VarHandleType::of(field, vec![owner]))
}

pub(super) fn find_static_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let field = interp.non_void_type(*call.args.get(2)?);
    var_handle(VarHandleType::of(field, vec![]))
}
