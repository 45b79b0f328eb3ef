//! Handlers for `java.lang.invoke.MethodType` factories and reshaping
//! methods. All of these are pure signature algebra on [`TypeList`].

use crate::ir::{CallExpr, Domain, ExprId, JavaType, Primitive};
use crate::list::TypeList;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{LatticeValue, MethodHandleType, Type};

use super::{handle, Interpreter};

pub(super) fn method_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let (&rtype_expr, rest) = call.args.split_first()?;
    let return_type = interp.as_type(rtype_expr);
    // methodType(rtype, mt) reuses the parameter list of another type
    if let [other] = rest {
        let is_method_type = interp
            .static_type(*other)
            .and_then(Domain::of_type)
            .is_some();
        if is_method_type {
            let other_type = interp
                .handle_type(*other, block)
                .unwrap_or(MethodHandleType::Bot);
            return handle(other_type.with_return_type(return_type));
        }
    }
    let parameters: Vec<Type> = rest.iter().map(|&arg| interp.non_void_type(arg)).collect();
    handle(MethodHandleType::of(return_type, parameters))
}

pub(super) fn generic_method_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let Some(count) = call.args.first().and_then(|&arg| interp.constant_i32(arg)) else {
        return handle(MethodHandleType::Bot);
    };
    if count < 0 {
        let arg = call.args[0];
        let span = interp.span(arg);
        interp.report(
            arg,
            AnalysisProblem::NegativeArgument {
                value: count as i64,
                span,
            },
        );
        return handle(MethodHandleType::Top);
    }
    let mut parameters = vec![super::object_type(); count as usize];
    if let Some(&final_array) = call.args.get(1) {
        match interp.expr(final_array).constant {
            Some(crate::ir::ConstantValue::Bool(true)) => {
                parameters.push(Type::Exact(JavaType::array_of(JavaType::object(
                    "java.lang.Object",
                ))));
            }
            Some(crate::ir::ConstantValue::Bool(false)) => {}
            _ => return handle(MethodHandleType::Top),
        }
    }
    handle(MethodHandleType::of(super::object_type(), parameters))
}

pub(super) fn append_parameter_types(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    if call.args.is_empty() {
        return handle(qual);
    }
    let appended: Vec<Type> = call
        .args
        .iter()
        .map(|&arg| interp.non_void_type(arg))
        .collect();
    let parameters = match qual.parameters() {
        TypeList::Complete(mut existing) => {
            existing.extend(appended);
            TypeList::Complete(existing)
        }
        _ => TypeList::Top,
    };
    handle(qual.with_parameters(parameters))
}

pub(super) fn insert_parameter_types(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let (&pos_expr, rest) = call.args.split_first()?;
    let inserted: Vec<Type> = rest.iter().map(|&arg| interp.non_void_type(arg)).collect();
    let Some(pos) = interp.non_negative_int(pos_expr) else {
        return handle(qual.with_parameters(TypeList::Bottom));
    };
    if inserted.is_empty() {
        return handle(qual);
    }
    let parameters = qual
        .parameters()
        .add_all_at(pos as usize, &TypeList::complete(inserted));
    handle(qual.with_parameters(parameters))
}

pub(super) fn drop_parameter_types(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let TypeList::Complete(existing) = qual.parameters() else {
        return handle(qual);
    };
    let (Some(start), Some(end)) = (
        call.args.first().and_then(|&arg| interp.constant_i32(arg)),
        call.args.get(1).and_then(|&arg| interp.constant_i32(arg)),
    ) else {
        return handle(qual.with_parameters(TypeList::Bottom));
    };
    let size = existing.len() as i32;
    if start < 0 || start > size || end < 0 || end > size || start > end {
        let arg = call.args[0];
        let span = interp.span(arg);
        let top: MethodHandleType = interp.problem(
            arg,
            AnalysisProblem::IndexOutOfBoundsKnown {
                index: if start < 0 || start > size { start } else { end } as i64,
                size: size as usize,
                span,
            },
        );
        return handle(top);
    }
    let parameters = qual
        .parameters()
        .remove_at(start as usize, (end - start) as usize);
    handle(qual.with_parameters(parameters))
}

pub(super) fn change_parameter_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let Some(pos) = call.args.first().and_then(|&arg| interp.constant_i32(arg)) else {
        return handle(MethodHandleType::Bot);
    };
    if pos < 0 {
        let arg = call.args[0];
        let span = interp.span(arg);
        let top: MethodHandleType = interp.problem(
            arg,
            AnalysisProblem::NegativeArgument {
                value: pos as i64,
                span,
            },
        );
        return handle(top);
    }
    let parameters = qual.parameters();
    if parameters.size_matches(|size| pos as usize >= size).is_yes() {
        let top: MethodHandleType =
            interp.out_of_bounds(parameters.size(), call.args[0], pos as i64);
        return handle(top);
    }
    let new_type = interp.non_void_type(*call.args.get(1)?);
    handle(qual.with_parameters(parameters.set_at(pos as usize, new_type)))
}

pub(super) fn change_return_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let return_type = interp.as_type(*call.args.first()?);
    handle(qual.with_return_type(return_type))
}

pub(super) fn erase(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(map_types(&qual, Type::erased))
}

pub(super) fn generic(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    let Some(size) = qual.parameters().size() else {
        return handle(MethodHandleType::Top);
    };
    handle(MethodHandleType::of(
        super::object_type(),
        vec![super::object_type(); size],
    ))
}

pub(super) fn wrap(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(map_types(&qual, |ty| match ty.exact() {
        Some(JavaType::Primitive(primitive)) => Type::object(primitive.boxed_name()),
        _ => ty.clone(),
    }))
}

pub(super) fn unwrap(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qual = interp
        .qualifier_handle(call, block)
        .unwrap_or(MethodHandleType::Bot);
    handle(map_types(&qual, |ty| match unboxed(ty) {
        Some(primitive) => Type::Exact(JavaType::Primitive(primitive)),
        None => ty.clone(),
    }))
}

fn unboxed(ty: &Type) -> Option<Primitive> {
    let name = ty.exact()?.qualified_name()?;
    [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ]
    .into_iter()
    .find(|primitive| primitive.boxed_name() == name)
}

/// Applies `f` to the return type and all parameters. A parameter list
/// of unknown length cannot be mapped slot by slot and degrades.
fn map_types(qual: &MethodHandleType, f: impl Fn(&Type) -> Type) -> MethodHandleType {
    let return_type = f(&qual.return_type());
    let parameters = match qual.parameters() {
        TypeList::Complete(elements) => {
            TypeList::complete(elements.iter().map(&f).collect())
        }
        TypeList::Bottom => TypeList::Bottom,
        _ => TypeList::Top,
    };
    MethodHandleType::new(return_type, parameters)
}
