//! `MethodHandles` combinators that merge several handles into one.

use pretty_assertions::assert_eq;

use crate::ir::{ExprId, JavaType, Owner};
use crate::problems::AnalysisProblem;
use crate::tests::fixtures::*;
use crate::types::MethodHandleType;

/// An `empty(methodType(ret, params...))` handle with the given shape.
fn empty_handle(b: &mut BodyBuilder, ret: JavaType, params: &[JavaType]) -> ExprId {
    let mut args = vec![b.class(ret)];
    for param in params {
        args.push(b.class(param.clone()));
    }
    let mt = b.static_call(Owner::MethodType, "methodType", args, method_type_class());
    b.static_call(Owner::MethodHandles, "empty", vec![mt], method_handle_class())
}

#[test]
fn drop_arguments_inserts_ignored_parameters() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let pos = b.int(0);
    let long = b.class(long_class());
    let dropped = b.static_call(
        Owner::MethodHandles,
        "dropArguments",
        vec![target, pos, long],
        method_handle_class(),
    );
    b.keep(dropped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, dropped).to_string(), "(long,int)int");
}

#[test]
fn drop_return_discards_the_result() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[long_class()]);
    let dropped = b.static_call(
        Owner::MethodHandles,
        "dropReturn",
        vec![target],
        method_handle_class(),
    );
    b.keep(dropped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, dropped).to_string(), "(long)void");
    assert!(facts.problem_for(dropped).is_none());
}

#[test]
fn drop_return_on_a_void_handle_is_redundant() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, void_class(), &[]);
    let dropped = b.static_call(
        Owner::MethodHandles,
        "dropReturn",
        vec![target],
        method_handle_class(),
    );
    b.keep(dropped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, dropped).to_string(), "()void");
    assert!(matches!(
        facts.problem_for(dropped),
        Some(AnalysisProblem::RedundantDropReturn { .. })
    ));
}

#[test]
fn insert_arguments_removes_the_bound_slots() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class(), long_class()]);
    let pos = b.int(0);
    let value = b.opaque(int_class());
    let inserted = b.static_call(
        Owner::MethodHandles,
        "insertArguments",
        vec![target, pos, value],
        method_handle_class(),
    );
    b.keep(inserted);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, inserted).to_string(), "(long)int");
}

#[test]
fn insert_arguments_past_the_end_is_reported() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let pos = b.int(3);
    let value = b.opaque(int_class());
    let inserted = b.static_call(
        Owner::MethodHandles,
        "insertArguments",
        vec![target, pos, value],
        method_handle_class(),
    );
    b.keep(inserted);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, inserted), MethodHandleType::Top);
    assert_eq!(
        facts
            .problems()
            .filter(|(_, problem)| matches!(
                problem,
                AnalysisProblem::IndexOutOfBoundsKnown { index: 4, size: 1, .. }
            ))
            .count(),
        1
    );
}

#[test]
fn filter_return_value_chains_the_filter() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let filter = empty_handle(&mut b, long_class(), &[int_class()]);
    let filtered = b.static_call(
        Owner::MethodHandles,
        "filterReturnValue",
        vec![target, filter],
        method_handle_class(),
    );
    b.keep(filtered);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, filtered).to_string(), "(int)long");
}

#[test]
fn filter_return_value_checks_the_filter_parameter() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let filter = empty_handle(&mut b, long_class(), &[long_class()]);
    let filtered = b.static_call(
        Owner::MethodHandles,
        "filterReturnValue",
        vec![target, filter],
        method_handle_class(),
    );
    b.keep(filtered);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, filtered), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(filter),
        Some(AnalysisProblem::FilterParameterMismatch { .. })
    ));
}

#[test]
fn filter_return_value_on_void_rejects_parameters() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, void_class(), &[]);
    let filter = empty_handle(&mut b, int_class(), &[int_class()]);
    let filtered = b.static_call(
        Owner::MethodHandles,
        "filterReturnValue",
        vec![target, filter],
        method_handle_class(),
    );
    b.keep(filtered);
    let facts = b.analyze();
    assert!(matches!(
        facts.problem_for(filter),
        Some(AnalysisProblem::FilterParametersNotAllowed { .. })
    ));
}

#[test]
fn filter_arguments_replaces_the_filtered_slot() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class(), long_class()]);
    let pos = b.int(1);
    let filter = empty_handle(&mut b, long_class(), &[boolean_class()]);
    let filtered = b.static_call(
        Owner::MethodHandles,
        "filterArguments",
        vec![target, pos, filter],
        method_handle_class(),
    );
    b.keep(filtered);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, filtered).to_string(), "(int,boolean)int");
}

#[test]
fn collect_arguments_splices_the_filter_parameters() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class(), long_class()]);
    let pos = b.int(1);
    let filter = empty_handle(&mut b, long_class(), &[boolean_class(), int_class()]);
    let collected = b.static_call(
        Owner::MethodHandles,
        "collectArguments",
        vec![target, pos, filter],
        method_handle_class(),
    );
    b.keep(collected);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, collected).to_string(), "(int,boolean,int)int");
}

#[test]
fn fold_arguments_consumes_the_folded_slot() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class(), long_class()]);
    let combiner = empty_handle(&mut b, int_class(), &[long_class()]);
    let folded = b.static_call(
        Owner::MethodHandles,
        "foldArguments",
        vec![target, combiner],
        method_handle_class(),
    );
    b.keep(folded);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, folded).to_string(), "(long)int");
}

#[test]
fn guard_with_test_keeps_the_branch_type() {
    let mut b = BodyBuilder::new();
    let test = empty_handle(&mut b, boolean_class(), &[int_class()]);
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let fallback = empty_handle(&mut b, int_class(), &[int_class()]);
    let guarded = b.static_call(
        Owner::MethodHandles,
        "guardWithTest",
        vec![test, target, fallback],
        method_handle_class(),
    );
    b.keep(guarded);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, guarded).to_string(), "(int)int");
}

#[test]
fn guard_with_test_requires_matching_branches() {
    let mut b = BodyBuilder::new();
    let test = empty_handle(&mut b, boolean_class(), &[int_class()]);
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let fallback = empty_handle(&mut b, long_class(), &[int_class()]);
    let guarded = b.static_call(
        Owner::MethodHandles,
        "guardWithTest",
        vec![test, target, fallback],
        method_handle_class(),
    );
    b.keep(guarded);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, guarded), MethodHandleType::Top);
}

#[test]
fn permute_arguments_adopts_the_new_order() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class(), long_class()]);
    let new_type_ret = b.class(int_class());
    let new_p0 = b.class(long_class());
    let new_p1 = b.class(int_class());
    let new_type = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![new_type_ret, new_p0, new_p1],
        method_type_class(),
    );
    let i1 = b.int(1);
    let i0 = b.int(0);
    let permuted = b.static_call(
        Owner::MethodHandles,
        "permuteArguments",
        vec![target, new_type, i1, i0],
        method_handle_class(),
    );
    b.keep(permuted);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, permuted).to_string(), "(long,int)int");
}

#[test]
fn permute_arguments_checks_each_mapped_slot() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let new_type_ret = b.class(int_class());
    let new_p0 = b.class(long_class());
    let new_type = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![new_type_ret, new_p0],
        method_type_class(),
    );
    let i0 = b.int(0);
    let permuted = b.static_call(
        Owner::MethodHandles,
        "permuteArguments",
        vec![target, new_type, i0],
        method_handle_class(),
    );
    b.keep(permuted);
    let facts = b.analyze();
    assert!(matches!(
        facts.problem_for(i0),
        Some(AnalysisProblem::NotIdenticalTypes { .. })
    ));
}

#[test]
fn table_switch_folds_identical_cases() {
    let mut b = BodyBuilder::new();
    let fallback = empty_handle(&mut b, long_class(), &[int_class()]);
    let case_a = empty_handle(&mut b, long_class(), &[int_class()]);
    let case_b = empty_handle(&mut b, long_class(), &[int_class()]);
    let switched = b.static_call(
        Owner::MethodHandles,
        "tableSwitch",
        vec![fallback, case_a, case_b],
        method_handle_class(),
    );
    b.keep(switched);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, switched).to_string(), "(int)long");
}

#[test]
fn table_switch_needs_a_leading_int() {
    let mut b = BodyBuilder::new();
    let fallback = empty_handle(&mut b, long_class(), &[int_class()]);
    let bad_case = empty_handle(&mut b, long_class(), &[long_class()]);
    let switched = b.static_call(
        Owner::MethodHandles,
        "tableSwitch",
        vec![fallback, bad_case],
        method_handle_class(),
    );
    b.keep(switched);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, switched), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(bad_case),
        Some(AnalysisProblem::LeadingIntRequired { .. })
    ));
}

#[test]
fn catch_exception_needs_the_exception_parameter() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let exception = b.class(JavaType::object("java.lang.Throwable"));
    let handler = empty_handle(&mut b, int_class(), &[int_class()]);
    let caught = b.static_call(
        Owner::MethodHandles,
        "catchException",
        vec![target, exception, handler],
        method_handle_class(),
    );
    b.keep(caught);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, caught), MethodHandleType::Top);
    assert!(matches!(
        facts.problem_for(handler),
        Some(AnalysisProblem::ExceptionParameterExpected { .. })
    ));
}

#[test]
fn catch_exception_keeps_the_target_shape() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let exception = b.class(JavaType::object("java.lang.Throwable"));
    let handler = empty_handle(
        &mut b,
        int_class(),
        &[JavaType::object("java.lang.Throwable"), int_class()],
    );
    let caught = b.static_call(
        Owner::MethodHandles,
        "catchException",
        vec![target, exception, handler],
        method_handle_class(),
    );
    b.keep(caught);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, caught).to_string(), "(int)int");
}

#[test]
fn try_finally_threads_the_cleanup() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let cleanup = empty_handle(
        &mut b,
        int_class(),
        &[JavaType::object("java.lang.Throwable"), int_class(), int_class()],
    );
    let wrapped = b.static_call(
        Owner::MethodHandles,
        "tryFinally",
        vec![target, cleanup],
        method_handle_class(),
    );
    b.keep(wrapped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, wrapped).to_string(), "(int)int");
}

#[test]
fn counted_loop_returns_the_iteration_variable_type() {
    let mut b = BodyBuilder::new();
    let iterations = empty_handle(&mut b, int_class(), &[]);
    let init = empty_handle(&mut b, long_class(), &[]);
    let body = empty_handle(&mut b, long_class(), &[long_class(), int_class()]);
    let looped = b.static_call(
        Owner::MethodHandles,
        "countedLoop",
        vec![iterations, init, body],
        method_handle_class(),
    );
    b.keep(looped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, looped).to_string(), "()long");
}

#[test]
fn while_loop_returns_the_accumulator_type() {
    let mut b = BodyBuilder::new();
    let init = empty_handle(&mut b, int_class(), &[]);
    let pred = empty_handle(&mut b, boolean_class(), &[int_class()]);
    let body = empty_handle(&mut b, int_class(), &[int_class()]);
    let looped = b.static_call(
        Owner::MethodHandles,
        "whileLoop",
        vec![init, pred, body],
        method_handle_class(),
    );
    b.keep(looped);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, looped).to_string(), "()int");
}

#[test]
fn explicit_cast_arguments_adopts_a_same_arity_type() {
    let mut b = BodyBuilder::new();
    let target = empty_handle(&mut b, int_class(), &[int_class()]);
    let ret = b.class(long_class());
    let p0 = b.class(long_class());
    let new_type = b.static_call(
        Owner::MethodType,
        "methodType",
        vec![ret, p0],
        method_type_class(),
    );
    let cast = b.static_call(
        Owner::MethodHandles,
        "explicitCastArguments",
        vec![target, new_type],
        method_handle_class(),
    );
    b.keep(cast);
    let facts = b.analyze();
    assert_eq!(handle_fact(&facts, cast).to_string(), "(long)long");
}
