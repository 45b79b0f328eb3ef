//! Handlers for instance methods transforming a single `MethodHandle`
//! or `VarHandle`.

use crate::ir::{CallExpr, ConstantValue, ExprId};
use crate::lattice::TriState;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{InvocationBehavior, LatticeValue, MethodHandleType, VarHandleType};

use super::{handle, var_handle, Interpreter};

pub(super) fn as_fixed_arity(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(qual.with_varargs(TriState::No))
}

/// `asType` only performs pairwise conversions, so the new type fully
/// determines the result.
pub(super) fn as_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let new_type = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(new_type)
}

pub(super) fn bind_to(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    if !matches!(qual, MethodHandleType::Complete { .. }) {
        return handle(qual);
    }
    let value_expr = *call.args.first()?;
    let parameters = qual.parameters();
    if parameters.has_size(0).is_yes() {
        let span = interp.span(value_expr);
        let top: MethodHandleType =
            interp.problem(value_expr, AnalysisProblem::NoParameters { span });
        return handle(top);
    }
    let first = parameters.get(0);
    if first.is_primitive().is_yes() {
        let span = interp.span(value_expr);
        let found = first.to_string();
        let top: MethodHandleType = interp.problem(
            value_expr,
            AnalysisProblem::ReferenceTypeExpected { found, span },
        );
        return handle(top);
    }
    if let (Some(target), Some(source)) = (first.exact(), interp.static_type(value_expr)) {
        if !interp.oracle().is_assignable_from(target, source) {
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
    handle(qual.with_parameters(parameters.drop_first(1)))
}

pub(super) fn with_varargs(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let varargs = match call.args.first().map(|&arg| &interp.expr(arg).constant) {
        Some(Some(ConstantValue::Bool(value))) => TriState::from(*value),
        _ => TriState::Unknown,
    };
    handle(qual.with_varargs(varargs))
}

/// `MethodHandle.type()`: the `MethodType` carries the same signature
/// fact as the handle itself.
pub(super) fn handle_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(qual)
}

pub(super) fn with_invoke_behavior(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    change_behavior(interp, call, at, block, InvocationBehavior::Invoke)
}

pub(super) fn with_invoke_exact_behavior(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    change_behavior(interp, call, at, block, InvocationBehavior::InvokeExact)
}

fn change_behavior(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
    behavior: InvocationBehavior,
) -> Option<LatticeValue> {
    let qual = match call.qualifier {
        Some(qualifier) => interp
            .var_handle_type(qualifier, block)
            .unwrap_or(VarHandleType::Bot),
        None => VarHandleType::Bot,
    };
    if qual.behavior() == behavior {
        let span = interp.span(at);
        interp.report(at, AnalysisProblem::RedundantInvocationBehavior { span });
    }
    var_handle(qual.with_behavior(behavior))
}
