//! Host-facing intermediate representation.
//!
//! The analysis is embedded in a larger tool that already resolved the
//! source language: it hands us a flat arena of expressions, a list of
//! instructions with explicit control-flow edges, and a variable table.
//! Everything here is deliberately minimal; only reads, writes and the
//! call shapes the interpreter understands are represented, the rest is
//! [`Instruction::Other`].

use miette::SourceSpan;

/// Primitive Java types, including `void` for return positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl Primitive {
    pub fn display_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    /// The wrapper class a boxing conversion produces.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "java.lang.Boolean",
            Primitive::Byte => "java.lang.Byte",
            Primitive::Char => "java.lang.Character",
            Primitive::Short => "java.lang.Short",
            Primitive::Int => "java.lang.Integer",
            Primitive::Long => "java.lang.Long",
            Primitive::Float => "java.lang.Float",
            Primitive::Double => "java.lang.Double",
            Primitive::Void => "java.lang.Void",
        }
    }
}

/// A fully resolved Java type as the host frontend sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(Primitive),
    /// A class or interface, by fully qualified name.
    Object(String),
    Array(Box<JavaType>),
}

impl JavaType {
    pub fn object(name: impl Into<String>) -> Self {
        JavaType::Object(name.into())
    }

    pub fn array_of(component: JavaType) -> Self {
        JavaType::Array(Box::new(component))
    }

    pub fn component(&self) -> Option<&JavaType> {
        match self {
            JavaType::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JavaType::Primitive(Primitive::Void))
    }

    /// Erasure towards `java.lang.Object` for reference types.
    pub fn erased(&self) -> JavaType {
        if self.is_primitive() {
            self.clone()
        } else {
            JavaType::object("java.lang.Object")
        }
    }

    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            JavaType::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Source-level short name, used for printing inferred signatures.
    pub fn display_name(&self) -> String {
        match self {
            JavaType::Primitive(primitive) => primitive.display_name().to_string(),
            JavaType::Object(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
            JavaType::Array(component) => format!("{}[]", component.display_name()),
        }
    }
}

impl std::fmt::Display for JavaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Subtyping and convertibility questions are answered by the host,
/// which has the real class hierarchy. The analysis only asks, it never
/// guesses.
pub trait TypeOracle {
    /// Whether `source` is assignable to `target` without conversion.
    fn is_assignable_from(&self, target: &JavaType, source: &JavaType) -> bool;

    /// Whether a method-handle type conversion (widening, boxing,
    /// reference cast) from `source` to `target` exists.
    fn is_convertible_from(&self, target: &JavaType, source: &JavaType) -> bool;
}

/// Structural fallback used when no richer hierarchy is available:
/// equality, the `Object` supertype, boxing, and primitive widening.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOracle;

impl TypeOracle for DefaultOracle {
    fn is_assignable_from(&self, target: &JavaType, source: &JavaType) -> bool {
        if target == source {
            return true;
        }
        !source.is_primitive() && target == &JavaType::object("java.lang.Object")
    }

    fn is_convertible_from(&self, target: &JavaType, source: &JavaType) -> bool {
        if self.is_assignable_from(target, source) {
            return true;
        }
        match (target, source) {
            (JavaType::Primitive(t), JavaType::Primitive(s)) => {
                *t != Primitive::Void && *s != Primitive::Void
            }
            (JavaType::Object(name), JavaType::Primitive(p)) => {
                name == p.boxed_name() || name == "java.lang.Object"
            }
            (JavaType::Primitive(p), JavaType::Object(name)) => name == p.boxed_name(),
            _ => false,
        }
    }
}

/// Index of an expression in its [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Index of a variable in the body's [`Variables`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

/// Source range of an expression, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

/// Compile-time constant value of an expression, when the host frontend
/// could fold one.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Bool(bool),
    Str(String),
    /// A class literal such as `int.class` or `String.class`.
    Class(JavaType),
}

/// The receiving API of a call, pre-classified by the host from the
/// resolved method's declaring class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    MethodType,
    MethodHandles,
    MethodHandle,
    VarHandle,
    Lookup,
    MemoryLayout,
    PathElement,
    FunctionDescriptor,
    Linker,
    /// Any other declaring class; such calls are never interpreted.
    Unrelated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub owner: Owner,
    pub method: String,
    /// Receiver expression for instance calls.
    pub qualifier: Option<ExprId>,
    pub args: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Call(CallExpr),
    /// A read of a variable; paired with a [`Instruction::Read`].
    VarRef(VarId),
    /// A static field constant such as `ValueLayout.JAVA_INT`,
    /// identified by declaring class and field name.
    FieldConstant { class: String, name: String },
    /// Literals, casts, and anything else the interpreter treats as
    /// opaque apart from `constant` and `static_type`.
    Leaf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprData {
    pub kind: ExprKind,
    /// The host frontend's static type for this expression.
    pub static_type: Option<JavaType>,
    pub constant: Option<ConstantValue>,
    pub span: Span,
}

/// Flat arena of expressions; `ExprId`s index into it.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    exprs: Vec<ExprData>,
}

impl ExprArena {
    pub fn alloc(&mut self, data: ExprData) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(data);
        id
    }

    pub fn get(&self, id: ExprId) -> &ExprData {
        &self.exprs[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// How a variable behaves under data flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Ordinary local, tracked precisely through the SSA form.
    Local,
    /// Method parameter; its value is unconstrained on entry.
    Parameter,
    /// Effectively final field: all writes in scope are joined into one
    /// flow-insensitive fact.
    StableField,
    /// Mutable or foreign storage; reads always yield `Top`.
    UnstableField,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub kind: VariableKind,
    pub var_type: Option<JavaType>,
}

#[derive(Debug, Clone, Default)]
pub struct Variables {
    vars: Vec<Variable>,
}

impl Variables {
    pub fn alloc(&mut self, variable: Variable) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(variable);
        id
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }
}

/// One linearized instruction of the analyzed body.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `expr` observes the current value of `var`.
    Read { var: VarId, expr: ExprId },
    /// `var` is assigned the value of `rhs`.
    Write { var: VarId, rhs: ExprId },
    /// An instruction with no effect on tracked state.
    Other,
}

/// Linearized instructions plus explicit successor edges between their
/// indices. Fallthrough edges are included.
#[derive(Debug, Clone, Default)]
pub struct ControlFlow {
    pub instructions: Vec<Instruction>,
    pub edges: Vec<(usize, usize)>,
}

/// Everything the interpreter needs about one method body.
#[derive(Debug, Clone)]
pub struct Body {
    pub exprs: ExprArena,
    pub flow: ControlFlow,
    pub vars: Variables,
}

/// The inference domain a Java type belongs to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    MethodHandle,
    VarHandle,
    MemoryLayout,
    PathElement,
    FunctionDescriptor,
}

impl Domain {
    /// Classifies a static type by fully qualified name. `MethodType`
    /// and `MethodHandle` share a domain since both are described by a
    /// signature.
    pub fn of_type(java_type: &JavaType) -> Option<Domain> {
        let name = java_type.qualified_name()?;
        match name {
            "java.lang.invoke.MethodType" | "java.lang.invoke.MethodHandle" => {
                Some(Domain::MethodHandle)
            }
            "java.lang.invoke.VarHandle" => Some(Domain::VarHandle),
            "java.lang.foreign.FunctionDescriptor" => Some(Domain::FunctionDescriptor),
            "java.lang.foreign.MemoryLayout.PathElement"
            | "java.lang.foreign.MemoryLayout$PathElement" => Some(Domain::PathElement),
            _ if name.starts_with("java.lang.foreign.") && name.contains("Layout") => {
                Some(Domain::MemoryLayout)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn domain_classification() {
        assert_eq!(
            Domain::of_type(&JavaType::object("java.lang.invoke.MethodType")),
            Some(Domain::MethodHandle)
        );
        assert_eq!(
            Domain::of_type(&JavaType::object("java.lang.foreign.ValueLayout.OfInt")),
            Some(Domain::MemoryLayout)
        );
        assert_eq!(
            Domain::of_type(&JavaType::object("java.lang.String")),
            None
        );
        assert_eq!(Domain::of_type(&JavaType::Primitive(Primitive::Int)), None);
    }

    #[test]
    fn default_oracle_conversions() {
        let oracle = DefaultOracle;
        let int = JavaType::Primitive(Primitive::Int);
        let long = JavaType::Primitive(Primitive::Long);
        let integer = JavaType::object("java.lang.Integer");
        let object = JavaType::object("java.lang.Object");
        assert!(oracle.is_convertible_from(&long, &int));
        assert!(oracle.is_convertible_from(&integer, &int));
        assert!(oracle.is_convertible_from(&int, &integer));
        assert!(oracle.is_assignable_from(&object, &integer));
        assert!(!oracle.is_assignable_from(&int, &long));
        assert!(!oracle.is_convertible_from(&JavaType::Primitive(Primitive::Void), &int));
    }

    #[test]
    fn display_names() {
        assert_eq!(JavaType::object("java.lang.String").display_name(), "String");
        assert_eq!(
            JavaType::array_of(JavaType::Primitive(Primitive::Int)).display_name(),
            "int[]"
        );
    }
}
