//! Static inference of `MethodHandle`, `VarHandle`, `MemoryLayout` and
//! `FunctionDescriptor` signatures.
//!
//! The host frontend hands this crate a resolved procedure body: a flat
//! expression arena, a linearized instruction list with explicit
//! control-flow edges, and a variable table. [`analyze_body`] builds an
//! SSA form over the flow graph, abstractly interprets every call into
//! the tracked `java.lang.invoke` and `java.lang.foreign` APIs over a
//! family of bounded join-semilattices, and returns a [`FactTable`]
//! mapping expressions to inferred signatures plus the problems found
//! on the way (mismatched combinator shapes, out-of-bounds indices,
//! misaligned layouts, and the like) as `miette` diagnostics.
//!
//! Imprecision is never an error: anything the analysis cannot prove
//! degrades to the `Top` element of its domain. At worst a body yields
//! no facts.

pub mod facts;
pub mod interp;
pub mod ir;
pub mod lattice;
pub mod list;
pub mod path;
pub mod problems;
pub mod ssa;
pub mod types;

pub use facts::FactTable;
pub use interp::Interpreter;
pub use problems::AnalysisProblem;
pub use ssa::CfgError;
pub use types::LatticeValue;

use ir::{Body, TypeOracle};

/// Analyzes one body and returns the collected facts.
///
/// Bodies are independent; the caller owns aggregation across bodies
/// and invalidation on edits. Fails only when the handed control flow
/// is inconsistent, which callers treat as "not analyzable right now".
pub fn analyze_body(body: &Body, oracle: &dyn TypeOracle) -> Result<FactTable, CfgError> {
    Ok(Interpreter::new(body, oracle)?.run())
}

#[cfg(test)]
mod tests;
