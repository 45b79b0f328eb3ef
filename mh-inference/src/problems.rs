//! Diagnosable conditions detected while interpreting combinator calls.
//!
//! These never abort the analysis. A handler records the problem for
//! the offending expression and degrades its fact to `Top`; the host
//! decides whether and how to surface them.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum AnalysisProblem {
    #[error("argument must not be negative, but is {value}")]
    #[diagnostic(code(mh_inference::argument::negative))]
    NegativeArgument {
        value: i64,
        #[label("negative argument")]
        span: SourceSpan,
    },

    #[error("index {index} is out of bounds")]
    #[diagnostic(code(mh_inference::argument::index_out_of_bounds))]
    IndexOutOfBounds {
        index: i64,
        #[label("out of bounds")]
        span: SourceSpan,
    },

    #[error("index {index} is out of bounds for size {size}")]
    #[diagnostic(code(mh_inference::argument::index_out_of_bounds))]
    IndexOutOfBoundsKnown {
        index: i64,
        size: usize,
        #[label("out of bounds")]
        span: SourceSpan,
    },

    #[error("type must not be void")]
    #[diagnostic(code(mh_inference::types::void))]
    TypeMustNotBeVoid {
        #[label("void type")]
        span: SourceSpan,
    },

    #[error("a reference type is required, but {found} was found")]
    #[diagnostic(code(mh_inference::types::reference_expected))]
    ReferenceTypeExpected {
        found: String,
        #[label("not a reference type")]
        span: SourceSpan,
    },

    #[error("an array type is required, but {found} was found")]
    #[diagnostic(code(mh_inference::types::array_expected))]
    ArrayTypeExpected {
        found: String,
        #[label("not an array type")]
        span: SourceSpan,
    },

    #[error("the return type must be void, but is {found}")]
    #[diagnostic(code(mh_inference::returns::void_required))]
    ReturnTypeMustBeVoid {
        found: String,
        #[label("must return void")]
        span: SourceSpan,
    },

    #[error("the return type must be boolean, but is {found}")]
    #[diagnostic(code(mh_inference::returns::boolean_required))]
    BooleanReturnRequired {
        found: String,
        #[label("must return boolean")]
        span: SourceSpan,
    },

    #[error("return types {first} and {second} are incompatible")]
    #[diagnostic(code(mh_inference::returns::incompatible))]
    IncompatibleReturnTypes {
        first: String,
        second: String,
        #[label("incompatible return types")]
        span: SourceSpan,
    },

    #[error("expected parameters {expected}, but got {found}")]
    #[diagnostic(code(mh_inference::parameters::mismatch))]
    ParametersIncompatible {
        expected: String,
        found: String,
        #[label("parameter mismatch")]
        span: SourceSpan,
    },

    #[error("types {left} and {right} must be effectively identical")]
    #[diagnostic(code(mh_inference::parameters::not_identical))]
    NotIdenticalTypes {
        left: String,
        right: String,
        #[label("must be identical")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, but got {found}")]
    #[diagnostic(code(mh_inference::parameters::arity))]
    WrongArity {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("the target handle has no parameters to bind")]
    #[diagnostic(code(mh_inference::parameters::none))]
    NoParameters {
        #[label("no parameters")]
        span: SourceSpan,
    },

    #[error("a leading int parameter is required, but got {found}")]
    #[diagnostic(code(mh_inference::parameters::leading_int))]
    LeadingIntRequired {
        found: String,
        #[label("must start with int")]
        span: SourceSpan,
    },

    #[error("at least one case handle is required")]
    #[diagnostic(code(mh_inference::table_switch::no_cases))]
    TableSwitchNoCases {
        #[label("no cases")]
        span: SourceSpan,
    },

    #[error("the cleanup handle must start with a Throwable parameter")]
    #[diagnostic(
        code(mh_inference::cleanup::leading_throwable),
        help("the first cleanup parameter receives the thrown exception")
    )]
    MissingCleanupParameters {
        #[label("missing Throwable parameter")]
        span: SourceSpan,
    },

    #[error("cleanup parameters {found} do not match the target parameters {expected}")]
    #[diagnostic(code(mh_inference::cleanup::mismatch))]
    CleanupParametersMismatch {
        expected: String,
        found: String,
        #[label("cleanup mismatch")]
        span: SourceSpan,
    },

    #[error("the handler must start with a {ty} parameter")]
    #[diagnostic(code(mh_inference::catch::leading_exception))]
    ExceptionParameterExpected {
        ty: String,
        #[label("missing exception parameter")]
        span: SourceSpan,
    },

    #[error("the reorder array must have {expected} elements, but has {found}")]
    #[diagnostic(code(mh_inference::reorder::length))]
    ReorderLengthMismatch {
        expected: usize,
        found: usize,
        #[label("wrong reorder length")]
        span: SourceSpan,
    },

    #[error("reorder index {found} must be in [0, {max})")]
    #[diagnostic(code(mh_inference::reorder::index))]
    ReorderIndexOutOfBounds {
        max: usize,
        found: i64,
        #[label("invalid reorder index")]
        span: SourceSpan,
    },

    #[error("{value} is not a power of two")]
    #[diagnostic(code(mh_inference::layout::alignment))]
    NotAPowerOfTwo {
        value: i64,
        #[label("not a power of two")]
        span: SourceSpan,
    },

    #[error("byte size {size} is not a multiple of alignment {alignment}")]
    #[diagnostic(code(mh_inference::layout::size_alignment))]
    SizeMustBeMultipleOfAlignment {
        size: u64,
        alignment: u64,
        #[label("misaligned size")]
        span: SourceSpan,
    },

    #[error("member layout at offset {offset} requires alignment {alignment}")]
    #[diagnostic(
        code(mh_inference::layout::member_alignment),
        help("insert a padding layout before this member or relax its alignment")
    )]
    MemberAlignmentMismatch {
        offset: u64,
        alignment: u64,
        #[label("misaligned member")]
        span: SourceSpan,
    },

    #[error("the total layout size exceeds the representable range")]
    #[diagnostic(code(mh_inference::layout::overflow))]
    SizeOverflow {
        #[label("size overflows")]
        span: SourceSpan,
    },

    #[error("the address layout has no target layout to dereference")]
    #[diagnostic(code(mh_inference::path::dereference))]
    DereferenceWithoutTarget {
        #[label("no target layout")]
        span: SourceSpan,
    },

    #[error("path element {element} cannot be applied to layout {layout}")]
    #[diagnostic(code(mh_inference::path::mismatch))]
    PathElementMismatch {
        element: String,
        layout: String,
        #[label("element does not fit this layout")]
        span: SourceSpan,
    },

    #[error("no member layout is named {name}")]
    #[diagnostic(code(mh_inference::path::unknown_name))]
    UnknownGroupName {
        name: String,
        #[label("unknown member name")]
        span: SourceSpan,
    },

    #[error("sequence index {index} is out of bounds for element count {count}")]
    #[diagnostic(code(mh_inference::path::sequence_index))]
    SequenceIndexOutOfBounds {
        index: i64,
        count: u64,
        #[label("out of bounds")]
        span: SourceSpan,
    },

    #[error("this call does not change the invocation behavior")]
    #[diagnostic(code(mh_inference::redundant::behavior))]
    RedundantInvocationBehavior {
        #[label("already in effect")]
        span: SourceSpan,
    },

    #[error("the target already returns void")]
    #[diagnostic(code(mh_inference::redundant::drop_return))]
    RedundantDropReturn {
        #[label("return type is already void")]
        span: SourceSpan,
    },

    #[error("a zero constant can be created with zero(type)")]
    #[diagnostic(code(mh_inference::redundant::constant_zero))]
    RedundantConstantZero {
        #[label("constant of a zero value")]
        span: SourceSpan,
    },

    #[error("{found} is not a supported view handle component type")]
    #[diagnostic(
        code(mh_inference::types::view_component),
        help("view handles support short, char, int, long, float and double")
    )]
    UnsupportedViewHandleComponent {
        found: String,
        #[label("unsupported component type")]
        span: SourceSpan,
    },

    #[error("the filter must not take parameters when the target returns void")]
    #[diagnostic(code(mh_inference::filter::no_parameters))]
    FilterParametersNotAllowed {
        #[label("filter takes parameters")]
        span: SourceSpan,
    },

    #[error("the filter must take at most one parameter")]
    #[diagnostic(code(mh_inference::filter::too_many_parameters))]
    FilterTooManyParameters {
        #[label("more than one parameter")]
        span: SourceSpan,
    },

    #[error("the filter must take a parameter of type {ty}")]
    #[diagnostic(code(mh_inference::filter::parameter_expected))]
    FilterParameterExpected {
        ty: String,
        #[label("missing filter parameter")]
        span: SourceSpan,
    },

    #[error("the filter parameter {found} does not accept the return type {expected}")]
    #[diagnostic(code(mh_inference::filter::parameter_mismatch))]
    FilterParameterMismatch {
        expected: String,
        found: String,
        #[label("incompatible filter parameter")]
        span: SourceSpan,
    },

    #[error("the sequence step must not be zero")]
    #[diagnostic(code(mh_inference::path::zero_step))]
    StepMustNotBeZero {
        #[label("zero step")]
        span: SourceSpan,
    },

    #[error("the path does not end at a value layout")]
    #[diagnostic(code(mh_inference::path::target_not_value))]
    PathTargetNotValueLayout {
        #[label("not a value layout")]
        span: SourceSpan,
    },
}

impl AnalysisProblem {
    pub fn span(&self) -> SourceSpan {
        match self {
            AnalysisProblem::NegativeArgument { span, .. }
            | AnalysisProblem::IndexOutOfBounds { span, .. }
            | AnalysisProblem::IndexOutOfBoundsKnown { span, .. }
            | AnalysisProblem::TypeMustNotBeVoid { span }
            | AnalysisProblem::ReferenceTypeExpected { span, .. }
            | AnalysisProblem::ArrayTypeExpected { span, .. }
            | AnalysisProblem::ReturnTypeMustBeVoid { span, .. }
            | AnalysisProblem::BooleanReturnRequired { span, .. }
            | AnalysisProblem::IncompatibleReturnTypes { span, .. }
            | AnalysisProblem::ParametersIncompatible { span, .. }
            | AnalysisProblem::NotIdenticalTypes { span, .. }
            | AnalysisProblem::WrongArity { span, .. }
            | AnalysisProblem::NoParameters { span }
            | AnalysisProblem::LeadingIntRequired { span, .. }
            | AnalysisProblem::TableSwitchNoCases { span }
            | AnalysisProblem::MissingCleanupParameters { span }
            | AnalysisProblem::CleanupParametersMismatch { span, .. }
            | AnalysisProblem::ExceptionParameterExpected { span, .. }
            | AnalysisProblem::ReorderLengthMismatch { span, .. }
            | AnalysisProblem::ReorderIndexOutOfBounds { span, .. }
            | AnalysisProblem::NotAPowerOfTwo { span, .. }
            | AnalysisProblem::SizeMustBeMultipleOfAlignment { span, .. }
            | AnalysisProblem::MemberAlignmentMismatch { span, .. }
            | AnalysisProblem::SizeOverflow { span }
            | AnalysisProblem::DereferenceWithoutTarget { span }
            | AnalysisProblem::PathElementMismatch { span, .. }
            | AnalysisProblem::UnknownGroupName { span, .. }
            | AnalysisProblem::SequenceIndexOutOfBounds { span, .. }
            | AnalysisProblem::RedundantInvocationBehavior { span }
            | AnalysisProblem::RedundantDropReturn { span }
            | AnalysisProblem::RedundantConstantZero { span }
            | AnalysisProblem::UnsupportedViewHandleComponent { span, .. }
            | AnalysisProblem::FilterParametersNotAllowed { span }
            | AnalysisProblem::FilterTooManyParameters { span }
            | AnalysisProblem::FilterParameterExpected { span, .. }
            | AnalysisProblem::FilterParameterMismatch { span, .. }
            | AnalysisProblem::StepMustNotBeZero { span }
            | AnalysisProblem::PathTargetNotValueLayout { span } => *span,
        }
    }
}
