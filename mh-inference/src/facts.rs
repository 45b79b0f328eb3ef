//! The per-body result table the host queries after analysis.

use indexmap::{IndexMap, IndexSet};

use crate::ir::{ExprId, Owner};
use crate::problems::AnalysisProblem;
use crate::types::LatticeValue;

/// Facts, problems and unsupported-call notes keyed by expression.
///
/// At most one problem is kept per expression; a later report replaces
/// an earlier one, matching the order in which handlers refine their
/// verdicts.
#[derive(Debug, Default)]
pub struct FactTable {
    facts: IndexMap<ExprId, LatticeValue>,
    problems: IndexMap<ExprId, AnalysisProblem>,
    unsupported: IndexSet<(Owner, String)>,
}

impl FactTable {
    pub fn get(&self, expr: ExprId) -> Option<&LatticeValue> {
        self.facts.get(&expr)
    }

    pub fn set(&mut self, expr: ExprId, value: LatticeValue) {
        self.facts.insert(expr, value);
    }

    pub fn problem_for(&self, expr: ExprId) -> Option<&AnalysisProblem> {
        self.problems.get(&expr)
    }

    pub fn report(&mut self, expr: ExprId, problem: AnalysisProblem) {
        self.problems.insert(expr, problem);
    }

    pub fn problems(&self) -> impl Iterator<Item = (ExprId, &AnalysisProblem)> {
        self.problems.iter().map(|(&expr, problem)| (expr, problem))
    }

    /// Records a call the interpreter has no semantics for. Returns
    /// whether this owner/method pair is new, so the host can warn
    /// once per method instead of once per call site.
    pub fn note_unsupported(&mut self, owner: Owner, method: &str) -> bool {
        self.unsupported.insert((owner, method.to_string()))
    }

    pub fn unsupported_calls(&self) -> impl Iterator<Item = &(Owner, String)> {
        self.unsupported.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::SourceSpan;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_reported_problem_wins() {
        let mut facts = FactTable::default();
        let expr = ExprId(0);
        let span = SourceSpan::from((0, 1));
        facts.report(expr, AnalysisProblem::TypeMustNotBeVoid { span });
        facts.report(
            expr,
            AnalysisProblem::NegativeArgument { value: -1, span },
        );
        assert_eq!(
            facts.problem_for(expr),
            Some(&AnalysisProblem::NegativeArgument { value: -1, span })
        );
    }

    #[test]
    fn unsupported_calls_are_deduplicated() {
        let mut facts = FactTable::default();
        assert!(facts.note_unsupported(Owner::MethodHandles, "loop"));
        assert!(!facts.note_unsupported(Owner::MethodHandles, "loop"));
        assert_eq!(facts.unsupported_calls().count(), 1);
    }
}
