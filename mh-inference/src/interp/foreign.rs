//! Handlers for the `java.lang.foreign` API: memory layouts, layout
//! paths, function descriptors and the linker.
//!
//! Layout construction mirrors the runtime checks: alignments must be
//! powers of two, struct members must fall on aligned offsets, and
//! sequence elements need a size that is a multiple of their alignment.
//! Path elements are transient values consumed by `varHandle`, which
//! walks them through the layout tree via [`PathWalk`].

use std::collections::BTreeMap;

use crate::ir::{CallExpr, Domain, ExprId, JavaType, Primitive};
use crate::list::TypeList;
use crate::path::PathWalk;
use crate::problems::AnalysisProblem;
use crate::ssa::BlockId;
use crate::types::{
    AddressLayout, FunctionDescriptorType, GroupLayout, GroupVariant, LatticeValue, LayoutName,
    MemoryLayoutType, MethodHandleType, PathElementType, SequenceLayout, SequenceVariant, Type,
    VarHandleType,
};

use super::{descriptor, handle, layout, memory_segment_type, path, Interpreter};

/// The abstract value of a `ValueLayout` constant, keyed by the field
/// name. The `_UNALIGNED` variants drop the natural alignment to 1.
pub(crate) fn field_constant(class: &str, name: &str) -> Option<LatticeValue> {
    if !class.starts_with("java.lang.foreign.ValueLayout") {
        return None;
    }
    let value = match name {
        "ADDRESS" => MemoryLayoutType::address(),
        "ADDRESS_UNALIGNED" => MemoryLayoutType::Address(AddressLayout {
            target: None,
            byte_size: None,
            byte_alignment: Some(1),
            name: LayoutName::NONE,
        }),
        "JAVA_BOOLEAN" => MemoryLayoutType::value(Type::BOOLEAN, 1, 1),
        "JAVA_BYTE" => MemoryLayoutType::value(Type::BYTE, 1, 1),
        "JAVA_CHAR" => MemoryLayoutType::value(Type::CHAR, 2, 2),
        "JAVA_SHORT" => MemoryLayoutType::value(Type::SHORT, 2, 2),
        "JAVA_INT" => MemoryLayoutType::value(Type::INT, 4, 4),
        "JAVA_FLOAT" => MemoryLayoutType::value(Type::FLOAT, 4, 4),
        "JAVA_LONG" => MemoryLayoutType::value(Type::LONG, 8, 8),
        "JAVA_DOUBLE" => MemoryLayoutType::value(Type::DOUBLE, 8, 8),
        "JAVA_CHAR_UNALIGNED" => MemoryLayoutType::value(Type::CHAR, 2, 1),
        "JAVA_SHORT_UNALIGNED" => MemoryLayoutType::value(Type::SHORT, 2, 1),
        "JAVA_INT_UNALIGNED" => MemoryLayoutType::value(Type::INT, 4, 1),
        "JAVA_FLOAT_UNALIGNED" => MemoryLayoutType::value(Type::FLOAT, 4, 1),
        "JAVA_LONG_UNALIGNED" => MemoryLayoutType::value(Type::LONG, 8, 1),
        "JAVA_DOUBLE_UNALIGNED" => MemoryLayoutType::value(Type::DOUBLE, 8, 1),
        _ => return None,
    };
    layout(value)
}

// --- MemoryLayout ---

pub(super) fn with_name(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let name = match interp.constant_str(*call.args.first()?) {
        Some(name) => LayoutName::of(name),
        None => LayoutName::Top,
    };
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    layout(qualifier.with_name(name))
}

pub(super) fn without_name(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    layout(qualifier.with_name(LayoutName::NONE))
}

/// Byte order does not affect anything we track.
pub(super) fn with_order(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    layout(qualifier)
}

pub(super) fn with_byte_alignment(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let alignment_expr = *call.args.first()?;
    let Some(value) = interp.constant_i64(alignment_expr) else {
        return layout(MemoryLayoutType::Top);
    };
    if value <= 0 || (value as u64).count_ones() != 1 {
        let span = interp.span(alignment_expr);
        let top: MemoryLayoutType =
            interp.problem(alignment_expr, AnalysisProblem::NotAPowerOfTwo { value, span });
        return layout(top);
    }
    let alignment = value as u64;
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    // A struct cannot be under-aligned below a member's requirement.
    if let MemoryLayoutType::Struct(group) = &qualifier {
        if let TypeList::Complete(members) = &group.members {
            let mut offset = Some(0u64);
            for member in members {
                if let Some(required) = member.byte_alignment() {
                    if required > alignment {
                        if let Some(offset) = offset {
                            let span = interp.span(at);
                            let top: MemoryLayoutType = interp.problem(
                                at,
                                AnalysisProblem::MemberAlignmentMismatch {
                                    offset,
                                    alignment: required,
                                    span,
                                },
                            );
                            return layout(top);
                        }
                        return layout(MemoryLayoutType::Top);
                    }
                }
                offset = offset
                    .zip(member.byte_size())
                    .and_then(|(current, size)| current.checked_add(size));
            }
        }
    }
    layout(qualifier.with_byte_alignment(alignment))
}

pub(super) fn with_target_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let target = interp
        .layout_type(*call.args.first()?, block)
        .unwrap_or(MemoryLayoutType::Top);
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    layout(match qualifier {
        MemoryLayoutType::Address(address) => MemoryLayoutType::Address(AddressLayout {
            target: Some(Box::new(target)),
            ..address
        }),
        MemoryLayoutType::Bot => MemoryLayoutType::Bot,
        _ => MemoryLayoutType::Top,
    })
}

pub(super) fn without_target_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    layout(match qualifier {
        MemoryLayoutType::Address(address) => MemoryLayoutType::Address(AddressLayout {
            target: None,
            ..address
        }),
        MemoryLayoutType::Bot => MemoryLayoutType::Bot,
        _ => MemoryLayoutType::Top,
    })
}

pub(super) fn struct_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let mut members = Vec::new();
    let mut offset = Some(0u64);
    let mut alignment = Some(1u64);
    for &arg in &call.args {
        let member = interp
            .layout_type(arg, block)
            .unwrap_or(MemoryLayoutType::Top);
        if let (Some(current), Some(required)) = (offset, member.byte_alignment()) {
            if current % required != 0 {
                let span = interp.span(arg);
                let top: MemoryLayoutType = interp.problem(
                    arg,
                    AnalysisProblem::MemberAlignmentMismatch {
                        offset: current,
                        alignment: required,
                        span,
                    },
                );
                return layout(top);
            }
        }
        offset = match offset.zip(member.byte_size()) {
            Some((current, size)) => match current.checked_add(size) {
                Some(next) => Some(next),
                None => {
                    let span = interp.span(at);
                    let top: MemoryLayoutType =
                        interp.problem(at, AnalysisProblem::SizeOverflow { span });
                    return layout(top);
                }
            },
            None => None,
        };
        alignment = alignment
            .zip(member.byte_alignment())
            .map(|(a, b)| a.max(b));
        members.push(member);
    }
    layout(MemoryLayoutType::Struct(GroupLayout {
        members: TypeList::complete(members),
        byte_size: offset,
        byte_alignment: alignment,
        name: LayoutName::NONE,
    }))
}

pub(super) fn union_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let mut members = Vec::new();
    let mut size = Some(0u64);
    let mut alignment = Some(1u64);
    for &arg in &call.args {
        let member = interp
            .layout_type(arg, block)
            .unwrap_or(MemoryLayoutType::Top);
        size = size.zip(member.byte_size()).map(|(a, b)| a.max(b));
        alignment = alignment
            .zip(member.byte_alignment())
            .map(|(a, b)| a.max(b));
        members.push(member);
    }
    layout(MemoryLayoutType::Union(GroupLayout {
        members: TypeList::complete(members),
        byte_size: size,
        byte_alignment: alignment,
        name: LayoutName::NONE,
    }))
}

pub(super) fn sequence_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let (count_expr, element_expr) = match call.args.as_slice() {
        &[element] => (None, element),
        &[count, element] => (Some(count), element),
        _ => return layout(MemoryLayoutType::Top),
    };
    let count = match count_expr {
        None => None,
        Some(expr) => match interp.constant_i64(expr) {
            Some(value) if value < 0 => {
                let span = interp.span(expr);
                let top: MemoryLayoutType =
                    interp.problem(expr, AnalysisProblem::NegativeArgument { value, span });
                return layout(top);
            }
            Some(value) => Some(value as u64),
            None => None,
        },
    };
    let element = interp
        .layout_type(element_expr, block)
        .unwrap_or(MemoryLayoutType::Top);
    if let (Some(size), Some(alignment)) = (element.byte_size(), element.byte_alignment()) {
        if size % alignment != 0 {
            let span = interp.span(element_expr);
            let top: MemoryLayoutType = interp.problem(
                element_expr,
                AnalysisProblem::SizeMustBeMultipleOfAlignment {
                    size,
                    alignment,
                    span,
                },
            );
            return layout(top);
        }
    }
    if let Some((count, size)) = count.zip(element.byte_size()) {
        if count.checked_mul(size).is_none() {
            let span = interp.span(at);
            let top: MemoryLayoutType =
                interp.problem(at, AnalysisProblem::SizeOverflow { span });
            return layout(top);
        }
    }
    layout(MemoryLayoutType::Sequence(SequenceLayout {
        element: Box::new(element),
        element_count: count,
        byte_alignment: None,
        name: LayoutName::NONE,
    }))
}

pub(super) fn padding_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let size_expr = *call.args.first()?;
    match interp.constant_i64(size_expr) {
        None => layout(MemoryLayoutType::padding(None)),
        Some(value) if value <= 0 => {
            let span = interp.span(size_expr);
            let top: MemoryLayoutType =
                interp.problem(size_expr, AnalysisProblem::NegativeArgument { value, span });
            layout(top)
        }
        Some(value) => layout(MemoryLayoutType::padding(Some(value as u64))),
    }
}

/// `scaleHandle()` always produces `(long, long) -> long`.
pub(super) fn scale_handle(
    _interp: &mut Interpreter<'_>,
    _call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    handle(MethodHandleType::of(
        Type::LONG,
        vec![Type::LONG, Type::LONG],
    ))
}

/// Walks a layout path for `varHandle`, reporting failures at the path
/// element that caused them.
struct VarHandleWalk<'i, 'a> {
    interp: &'i mut Interpreter<'a>,
    call_at: ExprId,
    /// The argument expressions producing each path element, indexed in
    /// step with the path itself.
    exprs: Vec<ExprId>,
    /// Coordinates every access starts with, before any collected by
    /// open sequence elements.
    initial: Vec<Type>,
}

impl VarHandleWalk<'_, '_> {
    fn finish(&self, variable_type: Type, coords: &[Type]) -> VarHandleType {
        let mut coordinates = self.initial.clone();
        coordinates.extend_from_slice(coords);
        VarHandleType::new(variable_type, TypeList::complete(coordinates))
    }
}

impl PathWalk for VarHandleWalk<'_, '_> {
    type Out = VarHandleType;

    fn on_bottom_layout(&mut self, _at: usize, _coords: &mut Vec<Type>) -> Self::Out {
        VarHandleType::Bot
    }

    fn on_top_layout(&mut self, _at: usize, _coords: &mut Vec<Type>) -> Self::Out {
        VarHandleType::Top
    }

    fn on_path_empty(&mut self, layout: &MemoryLayoutType, coords: &mut Vec<Type>) -> Self::Out {
        match layout.value_type() {
            Some(variable_type) => self.finish(variable_type, coords),
            None => {
                let span = self.interp.span(self.call_at);
                self.interp.problem(
                    self.call_at,
                    AnalysisProblem::PathTargetNotValueLayout { span },
                )
            }
        }
    }

    fn on_top_path_element(
        &mut self,
        _at: usize,
        _layout: &MemoryLayoutType,
        _coords: &mut Vec<Type>,
    ) -> Self::Out {
        VarHandleType::Top
    }

    fn on_bottom_path_element(
        &mut self,
        _at: usize,
        _layout: &MemoryLayoutType,
        _coords: &mut Vec<Type>,
    ) -> Self::Out {
        VarHandleType::Bot
    }

    fn on_mismatch(
        &mut self,
        at: usize,
        element: &PathElementType,
        layout: &MemoryLayoutType,
    ) -> MemoryLayoutType {
        let expr = self.exprs[at];
        let span = self.interp.span(expr);
        self.interp.problem(
            expr,
            AnalysisProblem::PathElementMismatch {
                element: element.to_string(),
                layout: layout.to_string(),
                span,
            },
        )
    }

    fn on_invalid_dereference(&mut self, at: usize) -> MemoryLayoutType {
        let expr = self.exprs[at];
        let span = self.interp.span(expr);
        self.interp
            .problem(expr, AnalysisProblem::DereferenceWithoutTarget { span })
    }

    fn on_group_index_out_of_bounds(
        &mut self,
        at: usize,
        index: i64,
        members_size: Option<usize>,
    ) -> MemoryLayoutType {
        self.interp.out_of_bounds(members_size, self.exprs[at], index)
    }

    fn on_group_name_not_found(&mut self, at: usize, name: &str) -> MemoryLayoutType {
        let expr = self.exprs[at];
        let span = self.interp.span(expr);
        self.interp.problem(
            expr,
            AnalysisProblem::UnknownGroupName {
                name: name.to_string(),
                span,
            },
        )
    }

    fn on_sequence_index_out_of_bounds(
        &mut self,
        at: usize,
        index: i64,
        count: u64,
    ) -> MemoryLayoutType {
        let expr = self.exprs[at];
        let span = self.interp.span(expr);
        self.interp.problem(
            expr,
            AnalysisProblem::SequenceIndexOutOfBounds { index, count, span },
        )
    }
}

fn walk_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
    initial: Vec<Type>,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_layout(call, block)
        .unwrap_or(MemoryLayoutType::Bot);
    let elements: Vec<PathElementType> = call
        .args
        .iter()
        .map(|&arg| interp.path_type(arg, block).unwrap_or(PathElementType::Top))
        .collect();
    let mut walk = VarHandleWalk {
        interp,
        call_at: at,
        exprs: call.args.clone(),
        initial,
    };
    super::var_handle(walk.walk(&elements, &qualifier))
}

pub(super) fn var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    walk_var_handle(interp, call, at, block, vec![memory_segment_type()])
}

/// `arrayElementVarHandle` accesses an unbounded sequence of this
/// layout, so a `long` index coordinate precedes the path's own.
pub(super) fn array_element_var_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    walk_var_handle(
        interp,
        call,
        at,
        block,
        vec![memory_segment_type(), Type::LONG],
    )
}

// --- PathElement ---

pub(super) fn sequence_element(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    match call.args.as_slice() {
        [] => path(PathElementType::Sequence(SequenceVariant::Open)),
        &[index_expr] => {
            let index = interp.constant_i64(index_expr);
            if let Some(value) = index {
                if value < 0 {
                    let span = interp.span(index_expr);
                    let top: PathElementType = interp
                        .problem(index_expr, AnalysisProblem::NegativeArgument { value, span });
                    return path(top);
                }
            }
            path(PathElementType::Sequence(SequenceVariant::Selecting {
                index,
            }))
        }
        &[start_expr, step_expr] => {
            let start = interp.constant_i64(start_expr);
            if let Some(value) = start {
                if value < 0 {
                    let span = interp.span(start_expr);
                    let top: PathElementType = interp
                        .problem(start_expr, AnalysisProblem::NegativeArgument { value, span });
                    return path(top);
                }
            }
            let step = interp.constant_i64(step_expr);
            if step == Some(0) {
                let span = interp.span(step_expr);
                let top: PathElementType =
                    interp.problem(step_expr, AnalysisProblem::StepMustNotBeZero { span });
                return path(top);
            }
            path(PathElementType::Sequence(SequenceVariant::SelectingOpen {
                start,
                step,
            }))
        }
        _ => path(PathElementType::Top),
    }
}

pub(super) fn group_element(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    let arg = *call.args.first()?;
    match interp.static_type(arg) {
        Some(JavaType::Object(name)) if name == "java.lang.String" => {
            let name = interp.constant_str(arg).map(str::to_string);
            path(PathElementType::Group(GroupVariant::Name(name)))
        }
        Some(JavaType::Primitive(Primitive::Int | Primitive::Long)) => {
            let index = interp.constant_i64(arg);
            if let Some(value) = index {
                if value < 0 {
                    let span = interp.span(arg);
                    let top: PathElementType =
                        interp.problem(arg, AnalysisProblem::NegativeArgument { value, span });
                    return path(top);
                }
            }
            path(PathElementType::Group(GroupVariant::Index(index)))
        }
        _ => path(PathElementType::Top),
    }
}

pub(super) fn dereference_element(
    _interp: &mut Interpreter<'_>,
    _call: &CallExpr,
    _at: ExprId,
    _block: BlockId,
) -> Option<LatticeValue> {
    path(PathElementType::Dereference)
}

// --- FunctionDescriptor ---

pub(super) fn descriptor_of(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let (&return_expr, argument_exprs) = call.args.split_first()?;
    let return_layout = interp
        .layout_type(return_expr, block)
        .unwrap_or(MemoryLayoutType::Top);
    let arguments = argument_layouts(interp, argument_exprs, block);
    descriptor(FunctionDescriptorType::new(arguments, return_layout))
}

pub(super) fn descriptor_of_void(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let arguments = argument_layouts(interp, &call.args, block);
    descriptor(FunctionDescriptorType::new(
        arguments,
        crate::types::void_return(),
    ))
}

fn argument_layouts(
    interp: &mut Interpreter<'_>,
    exprs: &[ExprId],
    block: BlockId,
) -> TypeList<MemoryLayoutType> {
    TypeList::complete(
        exprs
            .iter()
            .map(|&arg| {
                interp
                    .layout_type(arg, block)
                    .unwrap_or(MemoryLayoutType::Top)
            })
            .collect(),
    )
}

pub(super) fn drop_return_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_descriptor(call, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    descriptor(qualifier.with_return_layout(crate::types::void_return()))
}

pub(super) fn append_argument_layouts(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let appended = argument_layouts(interp, &call.args, block);
    let qualifier = interp
        .qualifier_descriptor(call, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    let arguments = match qualifier.arguments() {
        TypeList::Complete(mut existing) => {
            if let TypeList::Complete(new) = appended {
                existing.extend(new);
            }
            TypeList::complete(existing)
        }
        _ => TypeList::Top,
    };
    descriptor(qualifier.with_arguments(arguments))
}

pub(super) fn insert_argument_layouts(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let index_expr = *call.args.first()?;
    let inserted = argument_layouts(interp, &call.args[1..], block);
    let qualifier = interp
        .qualifier_descriptor(call, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    let Some(index) = interp.non_negative_int(index_expr) else {
        return descriptor(qualifier.with_arguments(TypeList::Top));
    };
    let arguments = qualifier.arguments().add_all_at(index as usize, &inserted);
    descriptor(qualifier.with_arguments(arguments))
}

pub(super) fn change_return_layout(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let return_layout = interp
        .layout_type(*call.args.first()?, block)
        .unwrap_or(MemoryLayoutType::Top);
    let qualifier = interp
        .qualifier_descriptor(call, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    descriptor(qualifier.with_return_layout(return_layout))
}

pub(super) fn to_method_type(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let qualifier = interp
        .qualifier_descriptor(call, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    handle(qualifier.to_method_handle_type())
}

// --- Linker ---

/// `downcallHandle` in its unbound form prepends the function address,
/// plus a `SegmentAllocator` when the native function returns a
/// composite by value. The bound form has the address baked in.
pub(super) fn downcall_handle(
    interp: &mut Interpreter<'_>,
    call: &CallExpr,
    _at: ExprId,
    block: BlockId,
) -> Option<LatticeValue> {
    let first = *call.args.first()?;
    let unbound = interp
        .static_type(first)
        .and_then(Domain::of_type)
        == Some(Domain::FunctionDescriptor);
    let (descriptor_expr, options) = if unbound {
        (first, &call.args[1..])
    } else {
        (*call.args.get(1)?, &call.args[2..])
    };
    // Linker options such as captureCallState change the signature.
    if !options.is_empty() {
        return handle(MethodHandleType::Top);
    }
    let descriptor = interp
        .descriptor_type(descriptor_expr, block)
        .unwrap_or(FunctionDescriptorType::Bot);
    let base = descriptor.to_method_handle_type();
    let needs_allocator = match descriptor.return_layout() {
        MemoryLayoutType::Struct(_)
        | MemoryLayoutType::Union(_)
        | MemoryLayoutType::Sequence(_) => Some(true),
        MemoryLayoutType::Top | MemoryLayoutType::Bot => None,
        _ => Some(false),
    };
    let mut leading = Vec::new();
    if unbound {
        leading.push(memory_segment_type());
    }
    let parameters = match needs_allocator {
        Some(with_allocator) => {
            if with_allocator {
                leading.push(Type::object("java.lang.foreign.SegmentAllocator"));
            }
            base.parameters().add_all_at(0, &TypeList::complete(leading))
        }
        // Unknown return layout: only the leading coordinates are known.
        None => {
            let known: BTreeMap<usize, Type> =
                leading.into_iter().enumerate().collect();
            if known.is_empty() {
                TypeList::Top
            } else {
                TypeList::incomplete(known)
            }
        }
    };
    handle(base.with_parameters(parameters))
}
