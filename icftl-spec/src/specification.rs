use crate::constraint::Constraint;
use crate::expression::{ExpressionKind, PredicateExpressionKind};
use icftl_scfg::Predicate;
use icftl_utils::{Error, Id, IcftlResult};

/// A single `forall variable: predicate` quantifier, chained either to a
/// further quantifier or to the constraint that closes the specification.
#[derive(Clone, Debug)]
pub struct Forall {
    pub variable: Id,
    pub predicate: Predicate,
    pub next: ForallNext,
}

#[derive(Clone, Debug)]
pub enum ForallNext {
    Quantifier(Box<Forall>),
    Constraint(Constraint),
}

/// A complete iCFTL specification: one or more quantifiers followed by a
/// constraint.
#[derive(Clone, Debug)]
pub struct Specification {
    root: Forall,
}

impl Specification {
    pub fn root(&self) -> &Forall {
        &self.root
    }

    /// The `(variable, predicate)` sequence in quantifier order, obtained by
    /// walking the chain until the terminal `Constraint` is reached.
    pub fn quantifier_sequence(&self) -> Vec<(Id, Predicate)> {
        let mut out = Vec::new();
        let mut current = &self.root;
        loop {
            out.push((current.variable, current.predicate));
            match &current.next {
                ForallNext::Quantifier(inner) => current = inner,
                ForallNext::Constraint(_) => break,
            }
        }
        out
    }

    /// Every quantified variable name, outer to inner.
    pub fn variables(&self) -> Vec<Id> {
        self.quantifier_sequence().into_iter().map(|(v, _)| v).collect()
    }

    /// Each quantified variable's [`ExpressionKind`], derived from the
    /// predicate that bound it (`future(...)` defers transparently since
    /// [`PredicateExpressionKind`] only inspects the wrapped
    /// `changes`/`calls` predicate).
    pub fn variable_to_expression_kind(&self) -> Vec<(Id, ExpressionKind)> {
        self.quantifier_sequence()
            .into_iter()
            .map(|(v, p)| (v, p.expression_kind()))
            .collect()
    }

    pub fn constraint(&self) -> &Constraint {
        let mut current = &self.root;
        loop {
            match &current.next {
                ForallNext::Quantifier(inner) => current = inner,
                ForallNext::Constraint(c) => return c,
            }
        }
    }

    /// Every function name referenced by a quantifier's `.during(...)` or by
    /// a predicate embedded in a `next(p)` expression anywhere in the
    /// constraint, deduplicated; this is the set of functions the analyzer
    /// needs an SCFG for before this specification can be resolved.
    pub fn function_names_used(&self) -> Vec<Id> {
        use itertools::Itertools;
        self.quantifier_sequence()
            .into_iter()
            .map(|(_, p)| p.during_function)
            .chain(crate::constraint::function_names_used_in_expressions(
                self.constraint(),
            ))
            .unique()
            .collect()
    }
}

/// Fluent builder mirroring `Specification().forall(...).forall(...).check(...)`.
#[derive(Default)]
pub struct SpecificationBuilder {
    quantifiers: Vec<(Id, Predicate)>,
}

impl SpecificationBuilder {
    pub fn new() -> Self {
        SpecificationBuilder::default()
    }

    /// Add a quantifier. Every quantifier after the first must be
    /// `future`-qualified, since only the first quantifier has no previous
    /// binding to measure reachability from.
    pub fn forall(mut self, variable: Id, predicate: Predicate) -> IcftlResult<Self> {
        if !self.quantifiers.is_empty() && !predicate.future {
            return Err(Error::malformed_specification(format!(
                "quantifier for `{variable}` is not the first in the chain and must be wrapped in future(...)"
            )));
        }
        self.quantifiers.push((variable, predicate));
        Ok(self)
    }

    /// Close the specification with a constraint, validating that every
    /// variable the constraint references was actually bound by a
    /// quantifier.
    pub fn check(self, constraint: Constraint) -> IcftlResult<Specification> {
        if self.quantifiers.is_empty() {
            return Err(Error::malformed_specification(
                "specification has no quantifiers",
            ));
        }
        let bound: Vec<Id> = self.quantifiers.iter().map(|(v, _)| *v).collect();
        for used in constraint.variables_used() {
            if !bound.contains(&used) {
                return Err(Error::undefined_variable(used));
            }
        }
        Ok(Specification {
            root: build_chain(self.quantifiers, constraint),
        })
    }
}

fn build_chain(mut quantifiers: Vec<(Id, Predicate)>, constraint: Constraint) -> Forall {
    let (variable, predicate) = quantifiers.remove(0);
    if quantifiers.is_empty() {
        Forall {
            variable,
            predicate,
            next: ForallNext::Constraint(constraint),
        }
    } else {
        let inner = build_chain(quantifiers, constraint);
        Forall {
            variable,
            predicate,
            next: ForallNext::Quantifier(Box::new(inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{AtomicConstraint, Comparison};
    use crate::expression::Expression;

    #[test]
    fn single_quantifier_spec_builds() {
        let v = Id::new("v");
        let f = Id::new("f");
        let pred = Predicate::changes(Id::new("x"), f);
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(v)],
            comparison: Comparison::Lt,
            constant: 10.0,
            absolute_difference: false,
        });
        let spec = SpecificationBuilder::new()
            .forall(v, pred)
            .unwrap()
            .check(constraint)
            .unwrap();
        assert_eq!(spec.quantifier_sequence().len(), 1);
        assert_eq!(spec.function_names_used(), vec![f]);
        assert_eq!(spec.variables(), vec![v]);
        assert_eq!(
            spec.variable_to_expression_kind(),
            vec![(v, ExpressionKind::ConcreteState)]
        );
    }

    #[test]
    fn function_names_used_includes_functions_embedded_in_next() {
        let v = Id::new("v");
        let f = Id::new("f");
        let other = Id::new("other");
        let pred = Predicate::changes(Id::new("x"), f);
        let constraint = Expression::concrete_state(v)
            .next(Predicate::calls(Id::new("g"), other))
            .less_than(10.0)
            .unwrap();
        let spec = SpecificationBuilder::new()
            .forall(v, pred)
            .unwrap()
            .check(constraint)
            .unwrap();
        let mut used = spec.function_names_used();
        used.sort_by_key(|id| id.as_str());
        assert_eq!(used, vec![f, other]);
    }

    #[test]
    fn calls_predicate_binds_a_transition_kind_variable() {
        let v = Id::new("v");
        let f = Id::new("f");
        let pred = Predicate::calls(Id::new("g"), f);
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::transition(v)],
            comparison: Comparison::Lt,
            constant: 10.0,
            absolute_difference: false,
        });
        let spec = SpecificationBuilder::new()
            .forall(v, pred)
            .unwrap()
            .check(constraint)
            .unwrap();
        assert_eq!(
            spec.variable_to_expression_kind(),
            vec![(v, ExpressionKind::Transition)]
        );
    }

    #[test]
    fn second_quantifier_without_future_is_rejected() {
        let f = Id::new("f");
        let builder = SpecificationBuilder::new()
            .forall(Id::new("v1"), Predicate::changes(Id::new("x"), f))
            .unwrap();
        let err = builder.forall(Id::new("v2"), Predicate::changes(Id::new("y"), f));
        assert!(err.is_err());
    }

    #[test]
    fn constraint_referencing_unbound_variable_is_rejected() {
        let f = Id::new("f");
        let builder = SpecificationBuilder::new()
            .forall(Id::new("v1"), Predicate::changes(Id::new("x"), f))
            .unwrap();
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(Id::new("not_bound"))],
            comparison: Comparison::Lt,
            constant: 1.0,
            absolute_difference: false,
        });
        assert!(builder.check(constraint).is_err());
    }
}
