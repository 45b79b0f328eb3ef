//! Handlers for the `MethodHandles` combinators merging several handles
//! into one. Most checks here are necessarily three-valued: a
//! precondition is only reported when it provably fails, and anything
//! undecidable degrades the result towards `Top` silently.

use crate::ir::{CallExpr, ExprId};
use crate::lattice::{Lattice, PartialOrder, TriState};
use crate::list::TypeList;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{LatticeValue, MethodHandleType, Type};

use super::{boolean_type, handle, int_type, Interpreter};

fn top() -> Option<LatticeValue> {
    handle(MethodHandleType::Top)
}

pub(super) fn catch_exception(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let exception = interp.reference_type(*call.args.get(1)?);
    let handler_expr = *call.args.get(2)?;
    let handler = interp
        .handle_type(handler_expr, block)
        .unwrap_or(MethodHandleType::Bot);

    if let (Some(exception), TypeList::Complete(params)) =
        (exception.exact(), handler.parameters())
    {
        if params.is_empty() || !params[0].can_be(exception) {
            let span = interp.span(handler_expr);
            let ty = exception.display_name();
            let top: MethodHandleType = interp.problem(
                handler_expr,
                AnalysisProblem::ExceptionParameterExpected { ty, span },
            );
            return handle(top);
        }
    }
    let (return_type, identical) = target
        .return_type()
        .join_identical(&handler.return_type());
    if identical.is_no() {
        let span = interp.span(handler_expr);
        interp.report(
            handler_expr,
            AnalysisProblem::IncompatibleReturnTypes {
                first: target.return_type().to_string(),
                second: handler.return_type().to_string(),
                span,
            },
        );
    }
    let trailing = handler.parameters().drop_first(1);
    if trailing.join_identical(&target.parameters()).1.is_no() {
        let span = interp.span(handler_expr);
        let top: MethodHandleType = interp.problem(
            handler_expr,
            AnalysisProblem::ParametersIncompatible {
                expected: target.parameters().to_string(),
                found: trailing.to_string(),
                span,
            },
        );
        return handle(top);
    }
    handle(target.with_return_type(return_type))
}

pub(super) fn collect_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let pos_expr = *call.args.get(1)?;
    let filter = interp
        .handle_type(*call.args.get(2)?, block)
        .unwrap_or(MethodHandleType::Bot);
    let Some(pos) = interp.non_negative_int(pos_expr) else {
        return handle(MethodHandleType::Bot);
    };
    let pos = pos as usize;
    let mut parameters = target.parameters();
    if let Some(size) = parameters.size() {
        if pos >= size {
            let top: MethodHandleType = interp.out_of_bounds(Some(size), pos_expr, pos as i64);
            return handle(top);
        }
    }
    let filter_return = filter.return_type();
    match filter_return.is_void() {
        TriState::Yes => {}
        TriState::Unknown => return handle(target.with_parameters(TypeList::Top)),
        TriState::No => {
            if parameters.get(pos).join_identical(&filter_return).1.is_no() {
                return top();
            }
            parameters = parameters.remove_at(pos, 1);
        }
    }
    parameters = parameters.add_all_at(pos, &filter.parameters());
    handle(target.with_parameters(parameters))
}

pub(super) fn counted_loop(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    match call.args.as_slice() {
        &[iterations, init, body] => {
            let iterations = interp
                .handle_type(iterations, block)
                .unwrap_or(MethodHandleType::Bot);
            counted_loop_core(interp, call, at, block, iterations, init, body)
        }
        &[start, end, init, body] => {
            let start_type = interp
                .handle_type(start, block)
                .unwrap_or(MethodHandleType::Bot);
            let end_type = interp
                .handle_type(end, block)
                .unwrap_or(MethodHandleType::Bot);
            let (_, identical) = start_type
                .return_type()
                .join_identical(&end_type.return_type());
            if identical.is_no() {
                let span = interp.span(at);
                let top: MethodHandleType = interp.problem(
                    at,
                    AnalysisProblem::IncompatibleReturnTypes {
                        first: start_type.return_type().to_string(),
                        second: end_type.return_type().to_string(),
                        span,
                    },
                );
                return handle(top);
            }
            if start_type
                .parameters()
                .join_identical(&end_type.parameters())
                .1
                .is_no()
            {
                return top();
            }
            counted_loop_core(interp, call, at, block, start_type, init, body)
        }
        _ => top(),
    }
}

fn counted_loop_core(
    interp: &mut Interpreter<'_>,
    _call: &CallExpr,
    _at: ExprId,
    block: BlockId,
    iterations: MethodHandleType,
    init_expr: ExprId,
    body_expr: ExprId,
) -> Option<LatticeValue> {
    let init = interp
        .handle_type(init_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    let body = interp
        .handle_type(body_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    if iterations.is_top() || init.is_top() || body.is_top() {
        return top();
    }
    if !iterations.return_type().can_be(&int_type()) {
        return top();
    }
    // external loop parameters, derived from the body signature
    let mut external = TypeList::Bottom;
    if let MethodHandleType::Complete { .. } = body {
        let body_return = body.return_type();
        let body_params = body.parameters();
        match body_return.is_void() {
            // (int, A...) -> void
            TriState::Yes => {
                if body_params.has_size(0).is_yes() || !body_params.get(0).can_be(&int_type()) {
                    return top();
                }
                external = body_params.drop_first(1);
            }
            // (V, int, A...) -> V
            TriState::No => {
                if body_params.size_matches(|size| size < 2).is_yes()
                    || body_params.get(0).join_identical(&body_return).1.is_no()
                    || !body_params.get(1).can_be(&int_type())
                {
                    return top();
                }
                external = body_params.drop_first(2);
            }
            TriState::Unknown => external = TypeList::Top,
        }
    }
    if external.join_identical(&init.parameters()).1.is_no() {
        return top();
    }
    if external.join_identical(&iterations.parameters()).1.is_no() {
        return top();
    }
    let return_type = match init {
        MethodHandleType::Bot => body.return_type(),
        _ => init.return_type(),
    };
    handle(iterations.with_return_type(return_type))
}

pub(super) fn while_loop(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let init = *call.args.first()?;
    let pred = *call.args.get(1)?;
    let body = *call.args.get(2)?;
    while_loop_core(interp, block, init, pred, body)
}

pub(super) fn do_while_loop(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let init = *call.args.first()?;
    let body = *call.args.get(1)?;
    let pred = *call.args.get(2)?;
    while_loop_core(interp, block, init, pred, body)
}

fn while_loop_core(
    interp: &mut Interpreter<'_>,
    block: BlockId,
    init_expr: ExprId,
    pred_expr: ExprId,
    body_expr: ExprId,
) -> Option<LatticeValue> {
    let init = interp
        .handle_type(init_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    let pred = interp
        .handle_type(pred_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    let body = interp
        .handle_type(body_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    if !pred.return_type().can_be(&boolean_type()) {
        return top();
    }
    if !matches!(body, MethodHandleType::Complete { .. }) {
        return handle(body);
    }
    if !matches!(pred, MethodHandleType::Complete { .. }) {
        return handle(pred);
    }
    let body_return = body.return_type();
    let internal = body.parameters();
    if pred.parameters().join_identical(&internal).1.is_no() {
        return top();
    }
    if init.return_type().join_identical(&body_return).1.is_no() {
        return top();
    }
    match body_return.is_void() {
        TriState::Yes => {
            if init.parameters().join_identical(&internal).1.is_no() {
                return top();
            }
        }
        _ => {
            // a value-carrying body is (V, A...) -> V
            if internal.has_size(0).is_yes() {
                return top();
            }
            if internal.get(0).join_identical(&body_return).1.is_no() {
                return top();
            }
            if !matches!(init, MethodHandleType::Complete { .. }) {
                return handle(init);
            }
            if init
                .parameters()
                .join_identical(&internal.drop_first(1))
                .1
                .is_no()
            {
                return top();
            }
        }
    }
    handle(init)
}

pub(super) fn drop_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let pos_expr = *call.args.get(1)?;
    let dropped: Vec<Type> = call.args[2..]
        .iter()
        .map(|&arg| interp.non_void_type(arg))
        .collect();
    let Some(pos) = interp.non_negative_int(pos_expr) else {
        return top();
    };
    let parameters = target.parameters();
    if parameters.compare_size(pos as usize) == PartialOrder::Lt {
        let top: MethodHandleType = interp.out_of_bounds(parameters.size(), pos_expr, pos);
        return handle(top);
    }
    handle(target.with_parameters(
        parameters.add_all_at(pos as usize, &TypeList::complete(dropped)),
    ))
}

pub(super) fn drop_return(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Top);
    if target.return_type().is_void().is_yes() {
        let span = interp.span(at);
        interp.report(at, AnalysisProblem::RedundantDropReturn { span });
    }
    handle(target.with_return_type(Type::VOID))
}

pub(super) fn explicit_cast_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let new_type = interp
        .handle_type(*call.args.get(1)?, block)
        .unwrap_or(MethodHandleType::Bot);
    if !matches!(new_type, MethodHandleType::Complete { .. }) {
        return handle(new_type);
    }
    if !matches!(target, MethodHandleType::Complete { .. }) {
        return handle(target);
    }
    if let (Some(a), Some(b)) = (target.parameters().size(), new_type.parameters().size()) {
        if a != b {
            return top();
        }
    }
    handle(new_type)
}

pub(super) fn filter_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    if !matches!(target, MethodHandleType::Complete { .. }) {
        return handle(target);
    }
    let Some(pos) = interp.non_negative_int(*call.args.get(1)?) else {
        return top();
    };
    let pos = pos as usize;
    let mut filters = Vec::new();
    for &arg in &call.args[2..] {
        let filter = interp
            .handle_type(arg, block)
            .unwrap_or(MethodHandleType::Bot);
        if !matches!(filter, MethodHandleType::Complete { .. }) {
            return top();
        }
        filters.push(filter);
    }
    let mut parameters = target.parameters();
    if parameters.size_matches(|size| pos + filters.len() > size).is_yes() {
        return top();
    }
    for (offset, filter) in filters.iter().enumerate() {
        if filter.parameters().has_size(1).is_no() {
            return top();
        }
        let slot = pos + offset;
        if parameters
            .get(slot)
            .join_identical(&filter.return_type())
            .1
            .is_no()
        {
            return top();
        }
        parameters = parameters.set_at(slot, filter.parameter_at(0));
    }
    handle(target.with_parameters(parameters))
}

pub(super) fn filter_return_value(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Top);
    let filter_expr = *call.args.get(1)?;
    let filter = interp
        .handle_type(filter_expr, block)
        .unwrap_or(MethodHandleType::Top);
    let filter_params = filter.parameters();
    let target_return = target.return_type();
    match target_return.is_void() {
        TriState::Yes => {
            if filter_params.compare_size(0).is_gt() {
                let span = interp.span(filter_expr);
                let top: MethodHandleType = interp
                    .problem(filter_expr, AnalysisProblem::FilterParametersNotAllowed { span });
                return handle(top);
            }
        }
        TriState::Unknown => {
            if filter_params.compare_size(1).is_gt() {
                let span = interp.span(filter_expr);
                let top: MethodHandleType = interp
                    .problem(filter_expr, AnalysisProblem::FilterTooManyParameters { span });
                return handle(top);
            }
        }
        TriState::No => {
            if filter_params.compare_size(0) == PartialOrder::Eq {
                let span = interp.span(filter_expr);
                let ty = target_return.to_string();
                let top: MethodHandleType = interp
                    .problem(filter_expr, AnalysisProblem::FilterParameterExpected { ty, span });
                return handle(top);
            }
            if filter_params.compare_size(1).is_gt() {
                let span = interp.span(filter_expr);
                let top: MethodHandleType = interp
                    .problem(filter_expr, AnalysisProblem::FilterTooManyParameters { span });
                return handle(top);
            }
            if filter_params.get(0).join_identical(&target_return).1.is_no() {
                let span = interp.span(filter_expr);
                let top: MethodHandleType = interp.problem(
                    filter_expr,
                    AnalysisProblem::FilterParameterMismatch {
                        expected: target_return.to_string(),
                        found: filter_params.get(0).to_string(),
                        span,
                    },
                );
                return handle(top);
            }
        }
    }
    handle(target.with_return_type(filter.return_type()))
}

pub(super) fn fold_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let (pos_expr, combiner_expr) = match call.args.as_slice() {
        &[_, combiner] => (None, combiner),
        &[_, pos, combiner] => (Some(pos), combiner),
        _ => return top(),
    };
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let pos = match pos_expr {
        None => 0,
        Some(expr) => match interp.non_negative_int(expr) {
            Some(pos) => pos as usize,
            None => return top(),
        },
    };
    if target.parameters().size_matches(|size| pos >= size).is_yes() {
        return top();
    }
    let combiner = interp
        .handle_type(combiner_expr, block)
        .unwrap_or(MethodHandleType::Bot);
    if !matches!(combiner.parameters(), TypeList::Complete(_)) {
        return top();
    }
    let parameters = match combiner.return_type().is_void() {
        TriState::Unknown => TypeList::Top,
        TriState::Yes => target.parameters(),
        TriState::No => target.parameters().remove_at(pos, 1),
    };
    handle(target.with_parameters(parameters))
}

pub(super) fn guard_with_test(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let test = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let target = interp
        .handle_type(*call.args.get(1)?, block)
        .unwrap_or(MethodHandleType::Bot);
    let fallback = interp
        .handle_type(*call.args.get(2)?, block)
        .unwrap_or(MethodHandleType::Bot);
    if !test.return_type().can_be(&boolean_type()) {
        return top();
    }
    if target.join_identical(&fallback).1.is_no() {
        return top();
    }
    let (Some(test_size), Some(target_size)) =
        (test.parameters().size(), target.parameters().size())
    else {
        return top();
    };
    if test_size > target_size {
        return top();
    }
    for index in 0..test_size {
        if test
            .parameter_at(index)
            .join_identical(&target.parameter_at(index))
            .1
            .is_no()
        {
            return top();
        }
    }
    handle(target)
}

pub(super) fn insert_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let pos_expr = *call.args.get(1)?;
    let Some(pos) = interp.non_negative_int(pos_expr) else {
        return top();
    };
    let pos = pos as usize;
    let count = call.args.len().saturating_sub(2);
    let parameters = target.parameters();
    if parameters.compare_size(pos + count) == PartialOrder::Lt {
        // blame the first value that no longer fits a parameter slot
        let size = parameters.size();
        let blamed = size
            .and_then(|size| call.args.get(2 + size.saturating_sub(pos)))
            .copied()
            .unwrap_or(pos_expr);
        let top: MethodHandleType =
            interp.out_of_bounds(size, blamed, (pos + count) as i64);
        return handle(top);
    }
    handle(target.with_parameters(parameters.remove_at(pos, count)))
}

pub(super) fn permute_arguments(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Bot);
    let new_type = interp
        .handle_type(*call.args.get(1)?, block)
        .unwrap_or(MethodHandleType::Bot);
    let (_, identical) = target
        .return_type()
        .join_identical(&new_type.return_type());
    if identical.is_no() {
        let span = interp.span(at);
        let top: MethodHandleType = interp.problem(
            at,
            AnalysisProblem::IncompatibleReturnTypes {
                first: target.return_type().to_string(),
                second: new_type.return_type().to_string(),
                span,
            },
        );
        return handle(top);
    }
    let reorder = &call.args[2..];
    let target_params = target.parameters();
    if target_params
        .size_matches(|size| size != reorder.len())
        .is_yes()
    {
        let span = interp.span(at);
        let top: MethodHandleType = interp.problem(
            at,
            AnalysisProblem::ReorderLengthMismatch {
                expected: target_params.size().unwrap_or(0),
                found: reorder.len(),
                span,
            },
        );
        return handle(top);
    }
    let TypeList::Complete(mut out_params) = new_type.parameters() else {
        return top();
    };
    for (index, &reorder_expr) in reorder.iter().enumerate() {
        let Some(value) = interp.constant_i32(reorder_expr) else {
            return handle(new_type);
        };
        if value < 0 || value as usize >= out_params.len() {
            let span = interp.span(reorder_expr);
            interp.report(
                reorder_expr,
                AnalysisProblem::ReorderIndexOutOfBounds {
                    max: out_params.len(),
                    found: value as i64,
                    span,
                },
            );
            continue;
        }
        let slot = value as usize;
        let (joined, identical) = target_params.get(index).join_identical(&out_params[slot]);
        if identical.is_no() {
            let span = interp.span(reorder_expr);
            interp.report(
                reorder_expr,
                AnalysisProblem::NotIdenticalTypes {
                    left: target_params.get(index).to_string(),
                    right: out_params[slot].to_string(),
                    span,
                },
            );
            out_params[slot] = Type::Top;
        } else {
            out_params[slot] = joined;
        }
    }
    handle(MethodHandleType::new(
        new_type.return_type(),
        TypeList::complete(out_params),
    ))
}

pub(super) fn table_switch(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    if call.args.len() < 2 {
        let span = interp.span(at);
        let top: MethodHandleType =
            interp.problem(at, AnalysisProblem::TableSwitchNoCases { span });
        return handle(top);
    }
    let mut error = false;
    let mut folded: Option<MethodHandleType> = None;
    for &arg in &call.args {
        let case = interp
            .handle_type(arg, block)
            .unwrap_or(MethodHandleType::Bot);
        if case.parameters().compare_size(1) == PartialOrder::Lt
            || case.parameter_at(0).matches(&int_type()).is_no()
        {
            let span = interp.span(arg);
            interp.report(
                arg,
                AnalysisProblem::LeadingIntRequired {
                    found: case.parameter_at(0).to_string(),
                    span,
                },
            );
            error = true;
        }
        folded = Some(match folded {
            None => case,
            Some(previous) => {
                let (joined, identical) = previous.join_identical(&case);
                if identical.is_no() {
                    let span = interp.span(arg);
                    interp.report(
                        arg,
                        AnalysisProblem::NotIdenticalTypes {
                            left: previous.to_string(),
                            right: case.to_string(),
                            span,
                        },
                    );
                    error = true;
                }
                joined
            }
        });
    }
    if error {
        return top();
    }
    handle(folded.unwrap_or(MethodHandleType::Top))
}

pub(super) fn try_finally(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .handle_type(*call.args.first()?, block)
        .unwrap_or(MethodHandleType::Top);
    let cleanup_expr = *call.args.get(1)?;
    let cleanup = interp
        .handle_type(cleanup_expr, block)
        .unwrap_or(MethodHandleType::Top);
    let (new_return, identical) = cleanup
        .return_type()
        .join_identical(&target.return_type());
    if identical.is_no() {
        let span = interp.span(cleanup_expr);
        let top: MethodHandleType = interp.problem(
            cleanup_expr,
            AnalysisProblem::IncompatibleReturnTypes {
                first: target.return_type().to_string(),
                second: cleanup.return_type().to_string(),
                span,
            },
        );
        return handle(top);
    }
    // the cleanup signature is (Throwable, result?, A...) where A... is
    // a prefix of the target parameters
    let leading = match target.return_type().is_void() {
        TriState::Yes => 1,
        TriState::No => 2,
        TriState::Unknown => {
            return handle(MethodHandleType::new(new_return, TypeList::Top));
        }
    };
    if cleanup
        .parameters()
        .size_matches(|size| size < leading)
        .is_yes()
    {
        let span = interp.span(cleanup_expr);
        let top: MethodHandleType =
            interp.problem(cleanup_expr, AnalysisProblem::MissingCleanupParameters { span });
        return handle(top);
    }
    if leading == 2 && cleanup.parameter_at(1).join_identical(&new_return).1.is_no() {
        let span = interp.span(cleanup_expr);
        let top: MethodHandleType = interp.problem(
            cleanup_expr,
            AnalysisProblem::CleanupParametersMismatch {
                expected: new_return.to_string(),
                found: cleanup.parameter_at(1).to_string(),
                span,
            },
        );
        return handle(top);
    }
    let TypeList::Complete(trailing) = cleanup.parameters().drop_first(leading) else {
        return top();
    };
    let TypeList::Complete(target_params) = target.parameters() else {
        return top();
    };
    if trailing.len() > target_params.len() {
        return top();
    }
    for (a, b) in trailing.iter().zip(&target_params) {
        if a.join_identical(b).1.is_no() {
            return top();
        }
    }
    handle(target)
}
