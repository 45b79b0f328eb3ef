//! The abstract interpreter.
//!
//! One [`Interpreter`] analyzes one body: it walks the blocks in
//! reverse postorder, threads variable facts through the SSA form, and
//! evaluates every call into a tracked API through the handler table.
//! Handlers are ordinary functions keyed by owner and method name; a
//! recognized owner with an unknown method degrades to the domain's
//! `Top` and is noted once in the fact table.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use miette::SourceSpan;

use crate::facts::FactTable;
use crate::ir::{
    Body, CallExpr, ConstantValue, Domain, ExprData, ExprId, ExprKind, Instruction, JavaType,
    Owner, Primitive, TypeOracle, VarId, VariableKind,
};
use crate::lattice::Lattice;
use crate::problems::AnalysisProblem;
use crate::ssa::{BlockId, CfgError, PhiId, SsaConstruction, Value};
use crate::types::{
    FunctionDescriptorType, LatticeValue, MemoryLayoutType, MethodHandleType, PathElementType,
    Type, VarHandleType,
};

mod foreign;
mod initializer;
mod lookup;
mod merger;
mod method_type;
mod transform;

type Handler = fn(&mut Interpreter<'_>, &CallExpr, ExprId, BlockId) -> Option<LatticeValue>;

lazy_static! {
    static ref HANDLERS: HashMap<(Owner, String), Handler> = {
        let mut table: HashMap<(Owner, String), Handler> = HashMap::new();
        let mut add = |owner: Owner, method: &str, handler: Handler| {
            table.insert((owner, method.to_string()), handler);
        };

        add(Owner::MethodType, "methodType", method_type::method_type);
        add(
            Owner::MethodType,
            "genericMethodType",
            method_type::generic_method_type,
        );
        add(
            Owner::MethodType,
            "appendParameterTypes",
            method_type::append_parameter_types,
        );
        add(
            Owner::MethodType,
            "insertParameterTypes",
            method_type::insert_parameter_types,
        );
        add(
            Owner::MethodType,
            "dropParameterTypes",
            method_type::drop_parameter_types,
        );
        add(
            Owner::MethodType,
            "changeParameterType",
            method_type::change_parameter_type,
        );
        add(
            Owner::MethodType,
            "changeReturnType",
            method_type::change_return_type,
        );
        add(Owner::MethodType, "erase", method_type::erase);
        add(Owner::MethodType, "generic", method_type::generic);
        add(Owner::MethodType, "wrap", method_type::wrap);
        add(Owner::MethodType, "unwrap", method_type::unwrap);

        add(Owner::MethodHandle, "asFixedArity", transform::as_fixed_arity);
        add(Owner::MethodHandle, "asType", transform::as_type);
        add(Owner::MethodHandle, "bindTo", transform::bind_to);
        add(Owner::MethodHandle, "withVarargs", transform::with_varargs);
        add(Owner::MethodHandle, "type", transform::handle_type);

        add(
            Owner::VarHandle,
            "withInvokeBehavior",
            transform::with_invoke_behavior,
        );
        add(
            Owner::VarHandle,
            "withInvokeExactBehavior",
            transform::with_invoke_exact_behavior,
        );

        add(Owner::Lookup, "findConstructor", lookup::find_constructor);
        add(Owner::Lookup, "findGetter", lookup::find_getter);
        add(Owner::Lookup, "findSetter", lookup::find_setter);
        add(Owner::Lookup, "findStaticGetter", lookup::find_static_getter);
        add(Owner::Lookup, "findStaticSetter", lookup::find_static_setter);
        add(Owner::Lookup, "findStatic", lookup::find_static);
        add(Owner::Lookup, "findVirtual", lookup::find_virtual);
        add(Owner::Lookup, "findSpecial", lookup::find_special);
        add(Owner::Lookup, "findVarHandle", lookup::find_var_handle);
        add(
            Owner::Lookup,
            "findStaticVarHandle",
            lookup::find_static_var_handle,
        );

        add(
            Owner::MethodHandles,
            "arrayConstructor",
            initializer::array_constructor,
        );
        add(
            Owner::MethodHandles,
            "arrayElementGetter",
            initializer::array_element_getter,
        );
        add(
            Owner::MethodHandles,
            "arrayElementSetter",
            initializer::array_element_setter,
        );
        add(
            Owner::MethodHandles,
            "arrayElementVarHandle",
            initializer::array_element_var_handle,
        );
        add(Owner::MethodHandles, "arrayLength", initializer::array_length);
        add(
            Owner::MethodHandles,
            "byteArrayViewVarHandle",
            initializer::byte_array_view_var_handle,
        );
        add(
            Owner::MethodHandles,
            "byteBufferViewVarHandle",
            initializer::byte_buffer_view_var_handle,
        );
        add(Owner::MethodHandles, "constant", initializer::constant);
        add(Owner::MethodHandles, "empty", initializer::empty);
        add(Owner::MethodHandles, "identity", initializer::identity);
        add(Owner::MethodHandles, "invoker", initializer::invoker);
        add(Owner::MethodHandles, "exactInvoker", initializer::invoker);
        add(
            Owner::MethodHandles,
            "spreadInvoker",
            initializer::spread_invoker,
        );
        add(
            Owner::MethodHandles,
            "throwException",
            initializer::throw_exception,
        );
        add(Owner::MethodHandles, "zero", initializer::zero);
        add(
            Owner::MethodHandles,
            "varHandleInvoker",
            initializer::var_handle_invoker,
        );
        add(
            Owner::MethodHandles,
            "varHandleExactInvoker",
            initializer::var_handle_exact_invoker,
        );

        add(Owner::MethodHandles, "catchException", merger::catch_exception);
        add(
            Owner::MethodHandles,
            "collectArguments",
            merger::collect_arguments,
        );
        add(Owner::MethodHandles, "countedLoop", merger::counted_loop);
        add(Owner::MethodHandles, "doWhileLoop", merger::do_while_loop);
        add(Owner::MethodHandles, "whileLoop", merger::while_loop);
        add(Owner::MethodHandles, "dropArguments", merger::drop_arguments);
        add(Owner::MethodHandles, "dropReturn", merger::drop_return);
        add(
            Owner::MethodHandles,
            "explicitCastArguments",
            merger::explicit_cast_arguments,
        );
        add(Owner::MethodHandles, "filterArguments", merger::filter_arguments);
        add(
            Owner::MethodHandles,
            "filterReturnValue",
            merger::filter_return_value,
        );
        add(Owner::MethodHandles, "foldArguments", merger::fold_arguments);
        add(Owner::MethodHandles, "guardWithTest", merger::guard_with_test);
        add(Owner::MethodHandles, "insertArguments", merger::insert_arguments);
        add(
            Owner::MethodHandles,
            "permuteArguments",
            merger::permute_arguments,
        );
        add(Owner::MethodHandles, "tableSwitch", merger::table_switch);
        add(Owner::MethodHandles, "tryFinally", merger::try_finally);

        add(Owner::MemoryLayout, "withName", foreign::with_name);
        add(Owner::MemoryLayout, "withoutName", foreign::without_name);
        add(Owner::MemoryLayout, "withOrder", foreign::with_order);
        add(
            Owner::MemoryLayout,
            "withByteAlignment",
            foreign::with_byte_alignment,
        );
        add(
            Owner::MemoryLayout,
            "withTargetLayout",
            foreign::with_target_layout,
        );
        add(
            Owner::MemoryLayout,
            "withoutTargetLayout",
            foreign::without_target_layout,
        );
        add(Owner::MemoryLayout, "structLayout", foreign::struct_layout);
        add(Owner::MemoryLayout, "unionLayout", foreign::union_layout);
        add(Owner::MemoryLayout, "sequenceLayout", foreign::sequence_layout);
        add(Owner::MemoryLayout, "paddingLayout", foreign::padding_layout);
        add(Owner::MemoryLayout, "varHandle", foreign::var_handle);
        add(Owner::MemoryLayout, "scaleHandle", foreign::scale_handle);
        add(
            Owner::MemoryLayout,
            "arrayElementVarHandle",
            foreign::array_element_var_handle,
        );

        add(Owner::PathElement, "sequenceElement", foreign::sequence_element);
        add(Owner::PathElement, "groupElement", foreign::group_element);
        add(
            Owner::PathElement,
            "dereferenceElement",
            foreign::dereference_element,
        );

        add(Owner::FunctionDescriptor, "of", foreign::descriptor_of);
        add(Owner::FunctionDescriptor, "ofVoid", foreign::descriptor_of_void);
        add(
            Owner::FunctionDescriptor,
            "dropReturnLayout",
            foreign::drop_return_layout,
        );
        add(
            Owner::FunctionDescriptor,
            "appendArgumentLayouts",
            foreign::append_argument_layouts,
        );
        add(
            Owner::FunctionDescriptor,
            "changeReturnLayout",
            foreign::change_return_layout,
        );
        add(
            Owner::FunctionDescriptor,
            "insertArgumentLayouts",
            foreign::insert_argument_layouts,
        );
        add(Owner::FunctionDescriptor, "toMethodType", foreign::to_method_type);

        add(Owner::Linker, "downcallHandle", foreign::downcall_handle);

        table
    };
}

/// Methods we recognize but cannot say anything useful about. They
/// produce the domain's `Top` without an unsupported-call note.
fn is_imprecise(owner: Owner, method: &str) -> bool {
    match owner {
        Owner::MethodType => method == "fromMethodDescriptorString",
        Owner::MethodHandles => {
            matches!(method, "dropArgumentsToMatch" | "loop" | "iteratedLoop")
        }
        _ => false,
    }
}

/// Methods whose result carries no tracked type, such as accessors
/// returning plain values or calls merely consuming a handle.
fn is_neutral(owner: Owner, method: &str) -> bool {
    if matches!(
        method,
        "toString"
            | "equals"
            | "hashCode"
            | "getClass"
            | "clone"
            | "finalize"
            | "notify"
            | "notifyAll"
            | "wait"
    ) {
        return true;
    }
    match owner {
        Owner::MethodType => matches!(
            method,
            "describeConstable"
                | "descriptorString"
                | "hasPrimitives"
                | "hasWrappers"
                | "lastParameterType"
                | "parameterArray"
                | "parameterCount"
                | "parameterList"
                | "parameterType"
                | "toMethodDescriptorString"
        ),
        Owner::MethodHandle => matches!(
            method,
            "describeConstable" | "invoke" | "invokeExact" | "invokeWithArguments"
        ),
        Owner::VarHandle => matches!(
            method,
            "accessModeType"
                | "coordinateTypes"
                | "describeConstable"
                | "hasInvokeExactBehavior"
                | "isAccessModeSupported"
                | "toMethodHandle"
                | "varType"
        ),
        Owner::Lookup => matches!(
            method,
            "accessClass"
                | "defineClass"
                | "defineHiddenClass"
                | "defineHiddenClassWithClassData"
                | "dropLookupMode"
                | "ensureInitialized"
                | "findClass"
                | "hasFullPrivilegeAccess"
                | "hasPrivateAccess"
                | "in"
                | "lookupClass"
                | "lookupModes"
                | "previousLookupClass"
                | "revealDirect"
                | "unreflect"
                | "unreflectConstructor"
                | "unreflectGetter"
                | "unreflectSetter"
                | "unreflectSpecial"
                | "unreflectVarHandle"
        ),
        Owner::MethodHandles => matches!(
            method,
            "classData" | "classDataAt" | "lookup" | "privateLookupIn" | "publicLookup"
                | "reflectAs"
        ),
        Owner::MemoryLayout => matches!(
            method,
            "byteAlignment"
                | "byteOffset"
                | "byteOffsetHandle"
                | "byteSize"
                | "describeConstable"
                | "elementCount"
                | "memberLayouts"
                | "name"
                | "order"
                | "select"
                | "sliceHandle"
                | "targetLayout"
        ),
        Owner::FunctionDescriptor => {
            matches!(method, "argumentLayouts" | "describeConstable" | "returnLayout")
        }
        Owner::PathElement | Owner::Linker => false,
        Owner::Unrelated => true,
    }
}

pub struct Interpreter<'a> {
    body: &'a Body,
    oracle: &'a dyn TypeOracle,
    ssa: SsaConstruction<LatticeValue>,
    facts: FactTable,
    /// Flow-insensitive facts for stable fields, joined across writes.
    field_facts: HashMap<VarId, LatticeValue>,
    /// Expressions currently being resolved; breaks resolution cycles
    /// through self-referential assignments.
    in_progress: HashSet<ExprId>,
}

impl<'a> Interpreter<'a> {
    pub fn new(body: &'a Body, oracle: &'a dyn TypeOracle) -> Result<Self, CfgError> {
        Ok(Interpreter {
            body,
            oracle,
            ssa: SsaConstruction::build(&body.flow)?,
            facts: FactTable::default(),
            field_facts: HashMap::new(),
            in_progress: HashSet::new(),
        })
    }

    /// Interprets the whole body and returns the collected facts.
    pub fn run(mut self) -> FactTable {
        for block in self.ssa.traversal_order() {
            for index in self.ssa.instructions(block).to_vec() {
                match self.body.flow.instructions[index] {
                    Instruction::Read { var, expr } => self.on_read(var, expr, block),
                    Instruction::Write { var, rhs } => self.on_write(var, rhs, block),
                    Instruction::Other => {}
                }
            }
        }
        self.facts
    }

    fn on_read(&mut self, var: VarId, expr: ExprId, block: BlockId) {
        let Some(domain) = self.domain_of(expr) else {
            return;
        };
        match self.body.vars.get(var).kind {
            VariableKind::Parameter | VariableKind::UnstableField => {
                self.facts.set(expr, LatticeValue::top_of(domain));
                return;
            }
            VariableKind::Local | VariableKind::StableField => {}
        }
        match self.ssa.read_variable(var, block) {
            Some(Value::Holder(value)) => self.facts.set(expr, value),
            Some(Value::Phi(phi)) => {
                if let Some(folded) = self.fold_phi(phi) {
                    self.facts.set(expr, folded);
                }
            }
            None => {
                if let Some(fact) = self.field_facts.get(&var) {
                    self.facts.set(expr, fact.clone());
                }
            }
        }
    }

    fn on_write(&mut self, var: VarId, rhs: ExprId, block: BlockId) {
        let Some(value) = self.resolve(rhs, block) else {
            return;
        };
        self.ssa.write_variable(var, block, Value::Holder(value.clone()));
        if self.body.vars.get(var).kind == VariableKind::StableField {
            let joined = match self.field_facts.get(&var) {
                Some(existing) => existing.join(&value),
                None => value,
            };
            self.field_facts.insert(var, joined);
        }
    }

    /// Joins all concrete values reachable through a phi. Phis may be
    /// mutually recursive through loop back edges, hence the visited
    /// set; an operandless cycle yields no fact.
    fn fold_phi(&mut self, phi: PhiId) -> Option<LatticeValue> {
        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![phi];
        while let Some(phi) = pending.pop() {
            if !visited.insert(phi) {
                continue;
            }
            for operand in self.ssa.phi_operands(phi) {
                match operand {
                    Value::Holder(value) => leaves.push(value.clone()),
                    Value::Phi(inner) => pending.push(*inner),
                }
            }
        }
        leaves.into_iter().reduce(|a, b| a.join(&b))
    }

    /// The fact for `expr`, computing and memoizing it on first use.
    pub(crate) fn resolve(&mut self, expr: ExprId, block: BlockId) -> Option<LatticeValue> {
        if let Some(fact) = self.facts.get(expr) {
            return Some(fact.clone());
        }
        let data = self.expr(expr);
        let domain = Domain::of_type(data.static_type.as_ref()?)?;
        if !self.in_progress.insert(expr) {
            return None;
        }
        let value = match &data.kind {
            ExprKind::Call(call) => self.interpret_call(call, expr, block, domain),
            ExprKind::VarRef(var) => self.resolve_variable(*var, domain, block),
            ExprKind::FieldConstant { class, name } => foreign::field_constant(class, name),
            ExprKind::Leaf => None,
        };
        self.in_progress.remove(&expr);
        if let Some(value) = &value {
            self.facts.set(expr, value.clone());
        }
        value
    }

    fn resolve_variable(
        &mut self,
        var: VarId,
        domain: Domain,
        block: BlockId,
    ) -> Option<LatticeValue> {
        match self.body.vars.get(var).kind {
            VariableKind::Parameter | VariableKind::UnstableField => {
                Some(LatticeValue::top_of(domain))
            }
            VariableKind::StableField => match self.ssa.read_variable(var, block) {
                Some(Value::Holder(value)) => Some(value),
                _ => self.field_facts.get(&var).cloned(),
            },
            // Phis are only folded in on_read; folding here could
            // recurse back into the expression being resolved.
            VariableKind::Local => match self.ssa.read_variable(var, block) {
                Some(Value::Holder(value)) => Some(value),
                _ => None,
            },
        }
    }

    fn interpret_call(
        &mut self,
        call: &CallExpr,
        at: ExprId,
        block: BlockId,
        domain: Domain,
    ) -> Option<LatticeValue> {
        if let Some(handler) = HANDLERS.get(&(call.owner, call.method.clone())) {
            return handler(self, call, at, block);
        }
        if is_imprecise(call.owner, &call.method) {
            return Some(LatticeValue::top_of(domain));
        }
        if is_neutral(call.owner, &call.method) {
            return None;
        }
        self.facts.note_unsupported(call.owner, &call.method);
        Some(LatticeValue::top_of(domain))
    }

    // --- accessors shared by the handler modules ---

    pub(crate) fn expr(&self, id: ExprId) -> &'a ExprData {
        self.body.exprs.get(id)
    }

    pub(crate) fn oracle(&self) -> &'a dyn TypeOracle {
        self.oracle
    }

    pub(crate) fn span(&self, id: ExprId) -> SourceSpan {
        self.expr(id).span.into()
    }

    pub(crate) fn report(&mut self, at: ExprId, problem: AnalysisProblem) {
        self.facts.report(at, problem);
    }

    /// Records a problem and degrades to `Top`.
    pub(crate) fn problem<T: Lattice>(&mut self, at: ExprId, problem: AnalysisProblem) -> T {
        self.report(at, problem);
        T::top()
    }

    pub(crate) fn static_type(&self, id: ExprId) -> Option<&'a JavaType> {
        self.expr(id).static_type.as_ref()
    }

    fn domain_of(&self, id: ExprId) -> Option<Domain> {
        Domain::of_type(self.static_type(id)?)
    }

    pub(crate) fn constant_i32(&self, id: ExprId) -> Option<i32> {
        match self.expr(id).constant {
            Some(ConstantValue::Int(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn constant_i64(&self, id: ExprId) -> Option<i64> {
        match self.expr(id).constant {
            Some(ConstantValue::Int(value)) => Some(value as i64),
            Some(ConstantValue::Long(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn constant_str(&self, id: ExprId) -> Option<&'a str> {
        match &self.expr(id).constant {
            Some(ConstantValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// The type named by a class-literal argument, or `Top` if the
    /// argument is not a compile-time constant.
    pub(crate) fn as_type(&self, id: ExprId) -> Type {
        match &self.expr(id).constant {
            Some(ConstantValue::Class(java_type)) => Type::Exact(java_type.clone()),
            _ => Type::Top,
        }
    }

    /// A non-negative constant int. Reports negative constants; an
    /// unknown value is silently `None`.
    pub(crate) fn non_negative_int(&mut self, id: ExprId) -> Option<i64> {
        let value = self.constant_i64(id)?;
        if value < 0 {
            let span = self.span(id);
            self.report(id, AnalysisProblem::NegativeArgument { value, span });
            return None;
        }
        Some(value)
    }

    pub(crate) fn non_void_type(&mut self, id: ExprId) -> Type {
        let ty = self.as_type(id);
        if ty == Type::VOID {
            let span = self.span(id);
            return self.problem(id, AnalysisProblem::TypeMustNotBeVoid { span });
        }
        ty
    }

    pub(crate) fn reference_type(&mut self, id: ExprId) -> Type {
        let ty = self.as_type(id);
        if ty.is_primitive().is_yes() {
            let span = self.span(id);
            let found = ty.to_string();
            return self.problem(id, AnalysisProblem::ReferenceTypeExpected { found, span });
        }
        ty
    }

    pub(crate) fn array_type(&mut self, id: ExprId) -> Type {
        let ty = self.as_type(id);
        if let Some(exact) = ty.exact() {
            if exact.component().is_none() {
                let span = self.span(id);
                let found = ty.to_string();
                return self.problem(id, AnalysisProblem::ArrayTypeExpected { found, span });
            }
        }
        ty
    }

    pub(crate) fn out_of_bounds<T: Lattice>(
        &mut self,
        size: Option<usize>,
        at: ExprId,
        index: i64,
    ) -> T {
        let span = self.span(at);
        let problem = match size {
            Some(size) => AnalysisProblem::IndexOutOfBoundsKnown { index, size, span },
            None => AnalysisProblem::IndexOutOfBounds { index, span },
        };
        self.problem(at, problem)
    }

    pub(crate) fn handle_type(&mut self, id: ExprId, block: BlockId) -> Option<MethodHandleType> {
        match self.resolve(id, block)? {
            LatticeValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub(crate) fn var_handle_type(&mut self, id: ExprId, block: BlockId) -> Option<VarHandleType> {
        match self.resolve(id, block)? {
            LatticeValue::VarHandle(var_handle) => Some(var_handle),
            _ => None,
        }
    }

    pub(crate) fn layout_type(&mut self, id: ExprId, block: BlockId) -> Option<MemoryLayoutType> {
        match self.resolve(id, block)? {
            LatticeValue::Layout(layout) => Some(layout),
            _ => None,
        }
    }

    pub(crate) fn path_type(&mut self, id: ExprId, block: BlockId) -> Option<PathElementType> {
        match self.resolve(id, block)? {
            LatticeValue::Path(path) => Some(path),
            _ => None,
        }
    }

    pub(crate) fn descriptor_type(
        &mut self,
        id: ExprId,
        block: BlockId,
    ) -> Option<FunctionDescriptorType> {
        match self.resolve(id, block)? {
            LatticeValue::Descriptor(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub(crate) fn qualifier_handle(
        &mut self,
        call: &CallExpr,
        block: BlockId,
    ) -> Option<MethodHandleType> {
        self.handle_type(call.qualifier?, block)
    }

    pub(crate) fn qualifier_layout(
        &mut self,
        call: &CallExpr,
        block: BlockId,
    ) -> Option<MemoryLayoutType> {
        self.layout_type(call.qualifier?, block)
    }

    pub(crate) fn qualifier_descriptor(
        &mut self,
        call: &CallExpr,
        block: BlockId,
    ) -> Option<FunctionDescriptorType> {
        self.descriptor_type(call.qualifier?, block)
    }
}

pub(crate) fn handle(value: MethodHandleType) -> Option<LatticeValue> {
    Some(LatticeValue::Handle(value))
}

pub(crate) fn var_handle(value: VarHandleType) -> Option<LatticeValue> {
    Some(LatticeValue::VarHandle(value))
}

pub(crate) fn layout(value: MemoryLayoutType) -> Option<LatticeValue> {
    Some(LatticeValue::Layout(value))
}

pub(crate) fn path(value: PathElementType) -> Option<LatticeValue> {
    Some(LatticeValue::Path(value))
}

pub(crate) fn descriptor(value: FunctionDescriptorType) -> Option<LatticeValue> {
    Some(LatticeValue::Descriptor(value))
}

/// The `void.class` literal used by handlers comparing against `void`.
pub(crate) fn void_type() -> JavaType {
    JavaType::Primitive(Primitive::Void)
}

pub(crate) fn int_type() -> JavaType {
    JavaType::Primitive(Primitive::Int)
}

pub(crate) fn boolean_type() -> JavaType {
    JavaType::Primitive(Primitive::Boolean)
}

pub(crate) fn object_type() -> Type {
    Type::object("java.lang.Object")
}

pub(crate) fn memory_segment_type() -> Type {
    Type::object("java.lang.foreign.MemorySegment")
}
