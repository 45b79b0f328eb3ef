//! `MethodType` factory and reshaping methods.

use pretty_assertions::assert_eq;

use crate::ir::{JavaType, Owner};
use crate::problems::AnalysisProblem;
use crate::tests::fixtures::*;
use crate::types::MethodHandleType;

#[test]
fn method_type_collects_return_and_parameters() {
    let mut b = BodyBuilder::new();
    let ret = b.class(int_class());
    let p0 = b.class(long_class());
    let p1 = b.class(boolean_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![ret, p0, p1], method_type_class());
    b.keep(mt);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, mt).to_string(), "(long,boolean)int");
}

#[test]
fn method_type_can_borrow_parameters_from_another_type() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let other = b.static_call(Owner::MethodType, "methodType", vec![int, int], method_type_class());
    let ret = b.class(long_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![ret, other], method_type_class());
    b.keep(mt);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, mt).to_string(), "(int)long");
}

#[test]
fn append_parameter_types_extends_the_list() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let base = b.static_call(Owner::MethodType, "methodType", vec![int, int], method_type_class());
    let long = b.class(long_class());
    let appended = b.instance_call(
        base,
        Owner::MethodType,
        "appendParameterTypes",
        vec![long],
        method_type_class(),
    );
    b.keep(appended);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, appended).to_string(), "(int,long)int");
}

#[test]
fn insert_parameter_types_splices_at_the_index() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![int, int, int],
        method_type_class(),
    );
    let pos = b.int(1);
    let long = b.class(long_class());
    let inserted = b.instance_call(
        base,
        Owner::MethodType,
        "insertParameterTypes",
        vec![pos, long],
        method_type_class(),
    );
    b.keep(inserted);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, inserted).to_string(), "(int,long,int)int");
}

#[test]
fn drop_parameter_types_removes_the_range() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let long = b.class(long_class());
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![int, int, long],
        method_type_class(),
    );
    let start = b.int(0);
    let end = b.int(1);
    let dropped = b.instance_call(
        base,
        Owner::MethodType,
        "dropParameterTypes",
        vec![start, end],
        method_type_class(),
    );
    b.keep(dropped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, dropped).to_string(), "(long)int");
}

#[test]
fn drop_parameter_types_rejects_an_inverted_range() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let long = b.class(long_class());
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![int, int, long],
        method_type_class(),
    );
    let start = b.int(2);
    let end = b.int(1);
    let dropped = b.instance_call(
        base,
        Owner::MethodType,
        "dropParameterTypes",
        vec![start, end],
        method_type_class(),
    );
    b.keep(dropped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, dropped), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(start),
        Some(AnalysisProblem::IndexOutOfBoundsKnown { index: 1, size: 2, .. })
    ));
}

#[test]
fn change_parameter_type_out_of_bounds_is_reported() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let base = b.static_call(Owner::MethodType, "methodType", vec![int, int], method_type_class());
    let pos = b.int(5);
    let long = b.class(long_class());
    let changed = b.instance_call(
        base,
        Owner::MethodType,
        "changeParameterType",
        vec![pos, long],
        method_type_class(),
    );
    b.keep(changed);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, changed), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(pos),
        Some(AnalysisProblem::IndexOutOfBoundsKnown { index: 5, size: 1, .. })
    ));
}

#[test]
fn change_return_type_replaces_only_the_return() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let base = b.static_call(Owner::MethodType, "methodType", vec![int, int], method_type_class());
    let void = b.class(void_class());
    let changed = b.instance_call(
        base,
        Owner::MethodType,
        "changeReturnType",
        vec![void],
        method_type_class(),
    );
    b.keep(changed);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, changed).to_string(), "(int)void");
}

#[test]
fn wrap_boxes_primitives_and_unwrap_undoes_it() {
    let mut b = BodyBuilder::new();
    let boolean = b.class(boolean_class());
    let int = b.class(int_class());
    let long = b.class(long_class());
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![boolean, int, long],
        method_type_class(),
    );
    let wrapped = b.instance_call(base, Owner::MethodType, "wrap", vec![], method_type_class());
    let unwrapped =
        b.instance_call(wrapped, Owner::MethodType, "unwrap", vec![], method_type_class());
    b.keep(unwrapped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, wrapped).to_string(), "(Integer,Long)Boolean");
    assert_eq!(handle_fact(&facts, unwrapped).to_string(), "(int,long)boolean");
}

#[test]
fn generic_replaces_every_type_with_object() {
    let mut b = BodyBuilder::new();
    let long = b.class(long_class());
    let int = b.class(int_class());
    let string = b.class(JavaType::object("java.lang.String"));
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![long, int, string],
        method_type_class(),
    );
    let generic = b.instance_call(base, Owner::MethodType, "generic", vec![], method_type_class());
    b.keep(generic);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, generic).to_string(), "(Object,Object)Object");
}

#[test]
fn erase_keeps_primitive_parameters() {
    let mut b = BodyBuilder::new();
    let long = b.class(long_class());
    let int = b.class(int_class());
    let string = b.class(JavaType::object("java.lang.String"));
    let base = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![long, int, string],
        method_type_class(),
    );
    let erased = b.instance_call(base, Owner::MethodType, "erase", vec![], method_type_class());
    b.keep(erased);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, erased).to_string(), "(int,Object)long");
}

#[test]
fn generic_method_type_builds_object_signatures() {
    let mut b = BodyBuilder::new();
    let count = b.int(2);
    let plain = b.static_call(
        Owner::MethodType,
        "genericMethodType",
        vec![count],
        method_type_class(),
    );
    b.keep(plain);
    let count = b.int(1);
    let trailing = b.boolean(true);
    let with_array = b.static_call(
        Owner::MethodType,
        "genericMethodType",
        vec![count, trailing],
        method_type_class(),
    );
    b.keep(with_array);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, plain).to_string(), "(Object,Object)Object");
    assert_eq!(handle_fact(&facts, with_array).to_string(), "(Object,Object[])Object");
}

#[test]
fn generic_method_type_rejects_a_negative_count() {
    let mut b = BodyBuilder::new();
    let count = b.int(-1);
    let mt = b.static_call(
        Owner::MethodType,
        "genericMethodType",
        vec![count],
        method_type_class(),
    );
    b.keep(mt);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, mt), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(count),
        Some(AnalysisProblem::NegativeArgument { value: -1, .. })
    ));
}

#[test]
fn non_constant_arity_yields_no_information() {
    let mut b = BodyBuilder::new();
    let count = b.opaque(int_class());
    let mt = b.static_call(
        Owner::MethodType,
        "genericMethodType",
        vec![count],
        method_type_class(),
    );
    b.keep(mt);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, mt), MethodHandleType::Bot);
}
