//! Memory layout construction, layout paths, and layout var handles.

use pretty_assertions::assert_eq;

use crate::ir::{ExprId, Owner};
use crate::problems::AnalysisProblem;
use crate::tests::fixtures::*;
use crate::types::{MemoryLayoutType, Type, VarHandleType};

const VALUE_LAYOUT: &str = "java.lang.foreign.ValueLayout";

fn java_int(b: &mut BodyBuilder) -> ExprId {
    b.field_constant(VALUE_LAYOUT, "JAVA_INT", value_layout_class())
}

fn java_long(b: &mut BodyBuilder) -> ExprId {
    b.field_constant(VALUE_LAYOUT, "JAVA_LONG", value_layout_class())
}

fn memory_segment() -> Type {
    Type::object("java.lang.foreign.MemorySegment")
}

#[test]
fn canonical_value_layouts_are_known() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    b.keep(int);
    let unaligned = b.field_constant(VALUE_LAYOUT, "JAVA_INT_UNALIGNED", value_layout_class());
    b.keep(unaligned);
    let address = b.field_constant(VALUE_LAYOUT, "ADDRESS", value_layout_class());
    b.keep(address);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, int).to_string(), "int4");
    assert_eq!(layout_fact(&facts, unaligned).to_string(), "1%int4");
    assert_eq!(layout_fact(&facts, address).to_string(), "a");
}

#[test]
fn with_name_attaches_a_constant_name() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let name = b.string("x");
    let named = b.instance_call(
        int,
        Owner::MemoryLayout,
        "withName",
        vec![name],
        value_layout_class(),
    );
    b.keep(named);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, named).to_string(), "int4(x)");
}

#[test]
fn struct_layout_accumulates_size_and_alignment() {
    let mut b = BodyBuilder::new();
    let a = java_int(&mut b);
    let c = java_int(&mut b);
    let d = java_long(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "structLayout",
        vec![a, c, d],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    let fact = layout_fact(&facts, layout);
    assert_eq!(fact.byte_size(), Some(16));
    assert_eq!(fact.byte_alignment(), Some(8));
    assert_eq!(fact.to_string(), "8%[int4int4long8]");
}

#[test]
fn struct_layout_rejects_a_misaligned_member() {
    let mut b = BodyBuilder::new();
    let a = java_int(&mut b);
    let c = java_long(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "structLayout",
        vec![a, c],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, layout), MemoryLayoutType::Top);
    assert!(matches!(
        facts.problem_for(c),
        Some(AnalysisProblem::MemberAlignmentMismatch { offset: 4, alignment: 8, .. })
    ));
}

#[test]
fn union_layout_takes_the_widest_member() {
    let mut b = BodyBuilder::new();
    let a = java_int(&mut b);
    let c = java_long(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "unionLayout",
        vec![a, c],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    let fact = layout_fact(&facts, layout);
    assert_eq!(fact.byte_size(), Some(8));
    assert_eq!(fact.byte_alignment(), Some(8));
}

#[test]
fn sequence_layout_multiplies_the_element_size() {
    let mut b = BodyBuilder::new();
    let count = b.long(4);
    let element = java_int(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "sequenceLayout",
        vec![count, element],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    let fact = layout_fact(&facts, layout);
    assert_eq!(fact.to_string(), "[4:int4]");
    assert_eq!(fact.byte_size(), Some(16));
    assert_eq!(fact.byte_alignment(), Some(4));
}

#[test]
fn sequence_layout_rejects_a_negative_count() {
    let mut b = BodyBuilder::new();
    let count = b.long(-1);
    let element = java_int(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "sequenceLayout",
        vec![count, element],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, layout), MemoryLayoutType::Top);
    assert!(matches!(
        facts.problem_for(count),
        Some(AnalysisProblem::NegativeArgument { value: -1, .. })
    ));
}

#[test]
fn padding_layout_tracks_the_constant_size() {
    let mut b = BodyBuilder::new();
    let size = b.long(3);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "paddingLayout",
        vec![size],
        memory_layout_class(),
    );
    b.keep(layout);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, layout).to_string(), "x3");
}

#[test]
fn with_byte_alignment_must_be_a_power_of_two() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let alignment = b.long(3);
    let adjusted = b.instance_call(
        int,
        Owner::MemoryLayout,
        "withByteAlignment",
        vec![alignment],
        value_layout_class(),
    );
    b.keep(adjusted);
    let facts = b.analyze();
    assert_eq!(layout_fact(&facts, adjusted), MemoryLayoutType::Top);
    assert!(matches!(
        facts.problem_for(alignment),
        Some(AnalysisProblem::NotAPowerOfTwo { value: 3, .. })
    ));
}

#[test]
fn var_handle_resolves_a_named_group_member() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let name = b.string("x");
    let named = b.instance_call(
        int,
        Owner::MemoryLayout,
        "withName",
        vec![name],
        value_layout_class(),
    );
    let layout = b.static_call(
        Owner::MemoryLayout,
        "structLayout",
        vec![named],
        memory_layout_class(),
    );
    let path_name = b.string("x");
    let element = b.static_call(
        Owner::PathElement,
        "groupElement",
        vec![path_name],
        path_element_class(),
    );
    let vh = b.instance_call(
        layout,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert_eq!(
        var_handle_fact(&facts, vh),
        VarHandleType::of(Type::INT, vec![memory_segment()])
    );
}

#[test]
fn open_sequence_elements_add_a_long_coordinate() {
    let mut b = BodyBuilder::new();
    let count = b.long(4);
    let int = java_int(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "sequenceLayout",
        vec![count, int],
        memory_layout_class(),
    );
    let element = b.static_call(
        Owner::PathElement,
        "sequenceElement",
        vec![],
        path_element_class(),
    );
    let vh = b.instance_call(
        layout,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert_eq!(
        var_handle_fact(&facts, vh),
        VarHandleType::of(Type::INT, vec![memory_segment(), Type::LONG])
    );
}

#[test]
fn an_unknown_group_name_is_reported() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let name = b.string("x");
    let named = b.instance_call(
        int,
        Owner::MemoryLayout,
        "withName",
        vec![name],
        value_layout_class(),
    );
    let layout = b.static_call(
        Owner::MemoryLayout,
        "structLayout",
        vec![named],
        memory_layout_class(),
    );
    let path_name = b.string("y");
    let element = b.static_call(
        Owner::PathElement,
        "groupElement",
        vec![path_name],
        path_element_class(),
    );
    let vh = b.instance_call(
        layout,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert!(matches!(
        facts.problem_for(element),
        Some(AnalysisProblem::UnknownGroupName { .. })
    ));
}

#[test]
fn a_selecting_index_past_the_sequence_end_is_reported() {
    let mut b = BodyBuilder::new();
    let count = b.long(4);
    let int = java_int(&mut b);
    let layout = b.static_call(
        Owner::MemoryLayout,
        "sequenceLayout",
        vec![count, int],
        memory_layout_class(),
    );
    let index = b.long(9);
    let element = b.static_call(
        Owner::PathElement,
        "sequenceElement",
        vec![index],
        path_element_class(),
    );
    let vh = b.instance_call(
        layout,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert!(matches!(
        facts.problem_for(element),
        Some(AnalysisProblem::SequenceIndexOutOfBounds { index: 9, count: 4, .. })
    ));
}

#[test]
fn dereference_follows_the_address_target() {
    let mut b = BodyBuilder::new();
    let address = b.field_constant(VALUE_LAYOUT, "ADDRESS", value_layout_class());
    let int = java_int(&mut b);
    let with_target = b.instance_call(
        address,
        Owner::MemoryLayout,
        "withTargetLayout",
        vec![int],
        value_layout_class(),
    );
    let element = b.static_call(
        Owner::PathElement,
        "dereferenceElement",
        vec![],
        path_element_class(),
    );
    let vh = b.instance_call(
        with_target,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert_eq!(
        var_handle_fact(&facts, vh),
        VarHandleType::of(Type::INT, vec![memory_segment()])
    );
}

#[test]
fn dereference_without_a_target_is_reported() {
    let mut b = BodyBuilder::new();
    let address = b.field_constant(VALUE_LAYOUT, "ADDRESS", value_layout_class());
    let element = b.static_call(
        Owner::PathElement,
        "dereferenceElement",
        vec![],
        path_element_class(),
    );
    let vh = b.instance_call(
        address,
        Owner::MemoryLayout,
        "varHandle",
        vec![element],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert!(matches!(
        facts.problem_for(element),
        Some(AnalysisProblem::DereferenceWithoutTarget { .. })
    ));
}

#[test]
fn array_element_var_handle_starts_with_a_long_index() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let vh = b.instance_call(
        int,
        Owner::MemoryLayout,
        "arrayElementVarHandle",
        vec![],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert_eq!(
        var_handle_fact(&facts, vh),
        VarHandleType::of(Type::INT, vec![memory_segment(), Type::LONG])
    );
}

#[test]
fn scale_handle_has_a_fixed_signature() {
    let mut b = BodyBuilder::new();
    let int = java_int(&mut b);
    let handle = b.instance_call(
        int,
        Owner::MemoryLayout,
        "scaleHandle",
        vec![],
        method_handle_class(),
    );
    b.keep(handle);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, handle).to_string(), "(long,long)long");
}
