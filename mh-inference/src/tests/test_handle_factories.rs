//! Lookup find methods, `MethodHandles` initializers, and the instance
//! transforms on `MethodHandle` and `VarHandle`.

use pretty_assertions::assert_eq;

use crate::ir::{JavaType, Owner};
use crate::problems::AnalysisProblem;
use crate::tests::fixtures::*;
use crate::types::{InvocationBehavior, MethodHandleType, Type, VarHandleType};

fn lookup_class() -> JavaType {
    JavaType::object("java.lang.invoke.MethodHandles.Lookup")
}

#[test]
fn find_getter_takes_the_receiver_and_returns_the_field() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let name = b.string("x");
    let field = b.class(int_class());
    let getter = b.instance_call(
        lookup,
        Owner::Lookup,
        "findGetter",
        vec![owner, name, field],
        method_handle_class(),
    );
    b.keep(getter);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, getter).to_string(), "(Point)int");
}

#[test]
fn find_static_setter_takes_only_the_value() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let name = b.string("x");
    let field = b.class(long_class());
    let setter = b.instance_call(
        lookup,
        Owner::Lookup,
        "findStaticSetter",
        vec![owner, name, field],
        method_handle_class(),
    );
    b.keep(setter);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, setter).to_string(), "(long)void");
}

#[test]
fn find_virtual_prepends_the_receiver() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let name = b.string("scale");
    let long = b.class(long_class());
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![long, int], method_type_class());
    let handle = b.instance_call(
        lookup,
        Owner::Lookup,
        "findVirtual",
        vec![owner, name, mt],
        method_handle_class(),
    );
    b.keep(handle);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, handle).to_string(), "(Point,int)long");
}

#[test]
fn find_constructor_returns_the_constructed_class() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let void = b.class(void_class());
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![void, int], method_type_class());
    let ctor = b.instance_call(
        lookup,
        Owner::Lookup,
        "findConstructor",
        vec![owner, mt],
        method_handle_class(),
    );
    b.keep(ctor);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, ctor).to_string(), "(int)Point");
}

#[test]
fn find_constructor_rejects_a_non_void_type() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![int], method_type_class());
    let ctor = b.instance_call(
        lookup,
        Owner::Lookup,
        "findConstructor",
        vec![owner, mt],
        method_handle_class(),
    );
    b.keep(ctor);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, ctor), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(mt),
        Some(AnalysisProblem::ReturnTypeMustBeVoid { .. })
    ));
}

#[test]
fn find_var_handle_knows_type_and_coordinates() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let name = b.string("x");
    let field = b.class(int_class());
    let vh = b.instance_call(
        lookup,
        Owner::Lookup,
        "findVarHandle",
        vec![owner, name, field],
        var_handle_class(),
    );
    b.keep(vh);
    let facts = b.analyze();
    assert_eq!(
        var_handle_fact(&facts, vh),
        VarHandleType::of(Type::INT, vec![Type::object("com.example.Point")])
    );
}

#[test]
fn identity_and_zero_have_fixed_shapes() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let id = b.static_call(Owner::MethodHandles, "identity", vec![int], method_handle_class());
    b.keep(id);
    let long = b.class(long_class());
    let zero = b.static_call(Owner::MethodHandles, "zero", vec![long], method_handle_class());
    b.keep(zero);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, id).to_string(), "(int)int");
    assert_eq!(handle_fact(&facts, zero).to_string(), "()long");
}

#[test]
fn constant_zero_should_have_been_zero() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let value = b.int(0);
    let call = b.static_call(
        Owner::MethodHandles,
        "constant",
        vec![int, value],
        method_handle_class(),
    );
    b.keep(call);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, call).to_string(), "()int");
    assert!(matches!(
        facts.problem_for(call),
        Some(AnalysisProblem::RedundantConstantZero { .. })
    ));
}

#[test]
fn constant_rejects_an_inconvertible_value() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let value = b.string("nope");
    let call = b.static_call(
        Owner::MethodHandles,
        "constant",
        vec![int, value],
        method_handle_class(),
    );
    b.keep(call);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, call), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(value),
        Some(AnalysisProblem::ParametersIncompatible { .. })
    ));
}

#[test]
fn invoker_prepends_a_method_handle_parameter() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let long = b.class(long_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![int, long], method_type_class());
    let invoker = b.static_call(Owner::MethodHandles, "invoker", vec![mt], method_handle_class());
    b.keep(invoker);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, invoker).to_string(), "(MethodHandle,long)int");
}

#[test]
fn bind_to_drops_a_reference_leading_parameter() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let object = b.class(JavaType::object("java.lang.Object"));
    let mt = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![int, object, int],
        method_type_class(),
    );
    let target = b.static_call(Owner::MethodHandles, "empty", vec![mt], method_handle_class());
    let value = b.opaque(JavaType::object("java.lang.String"));
    let bound = b.instance_call(
        target,
        Owner::MethodHandle,
        "bindTo",
        vec![value],
        method_handle_class(),
    );
    b.keep(bound);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, bound).to_string(), "(int)int");
}

#[test]
fn bind_to_needs_a_reference_leading_parameter() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![int, int], method_type_class());
    let target = b.static_call(Owner::MethodHandles, "empty", vec![mt], method_handle_class());
    let value = b.opaque(JavaType::object("java.lang.Integer"));
    let bound = b.instance_call(
        target,
        Owner::MethodHandle,
        "bindTo",
        vec![value],
        method_handle_class(),
    );
    b.keep(bound);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, bound), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(value),
        Some(AnalysisProblem::ReferenceTypeExpected { .. })
    ));
}

#[test]
fn as_type_simply_adopts_the_new_type() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![int], method_type_class());
    let target = b.static_call(Owner::MethodHandles, "empty", vec![mt], method_handle_class());
    let long = b.class(long_class());
    let new_mt = b.static_call(Owner::MethodType, "methodType", vec![long], method_type_class());
    let adapted = b.instance_call(
        target,
        Owner::MethodHandle,
        "asType",
        vec![new_mt],
        method_handle_class(),
    );
    b.keep(adapted);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, adapted).to_string(), "()long");
}

#[test]
fn with_varargs_records_the_verdict() {
    let mut b = BodyBuilder::new();
    let int = b.class(int_class());
    let mt = b.static_call(Owner::MethodType, "methodType", vec![int], method_type_class());
    let target = b.static_call(Owner::MethodHandles, "empty", vec![mt], method_handle_class());
    let flag = b.boolean(true);
    let varargs = b.instance_call(
        target,
        Owner::MethodHandle,
        "withVarargs",
        vec![flag],
        method_handle_class(),
    );
    b.keep(varargs);
    let facts = b.analyze();
    assert!(handle_fact(&facts, varargs).varargs().is_yes());
}

#[test]
fn redundant_invoke_behavior_is_flagged() {
    let mut b = BodyBuilder::new();
    let lookup = b.opaque(lookup_class());
    let owner = b.class(JavaType::object("com.example.Point"));
    let name = b.string("x");
    let field = b.class(int_class());
    let vh = b.instance_call(
        lookup,
        Owner::Lookup,
        "findVarHandle",
        vec![owner, name, field],
        var_handle_class(),
    );
    let same = b.instance_call(vh, Owner::VarHandle, "withInvokeBehavior", vec![], var_handle_class());
    b.keep(same);
    let facts = b.analyze();
    assert_eq!(var_handle_fact(&facts, same).behavior(), InvocationBehavior::Invoke);
    assert!(matches!(
        facts.problem_for(same),
        Some(AnalysisProblem::RedundantInvocationBehavior { .. })
    ));
    let vh_fact = var_handle_fact(&facts, vh);
    let exact = vh_fact.with_behavior(InvocationBehavior::InvokeExact);
    assert_eq!(exact.behavior(), InvocationBehavior::InvokeExact);
}
