//! The comparison-building surface: `.equals(c)`
//! plus `less_than`/`greater_than` sugar for `<`/`>` against a numeric
//! constant (Rust has no useful overload of `<`/`>` that could return a
//! [`Constraint`] rather than `bool`, so the fluent methods stand in for the
//! DSL's infix operators), and a `timeBetween(a, b)` free function matching
//! the `timeBetween(state, state)` combinator.
//!
//! `AtomicConstraint.expressions` is always exactly one entry (`Normal`) or
//! two (`Mixed`), a physical invariant the rest of the analyzer and
//! planner rely on. `Expression::Duration`/`Expression::TimeBetween` are
//! single-expression algebra forms with a `measurement_count()` of two, so
//! this module expands them into their equivalent two-operand shape
//! (`duration(t)` becomes `[t.before(), t.after()]`, `time_between(a, b)`
//! becomes `[a, b]`) at the moment a comparison closes the atom, rather
//! than carrying the wrapping node all the way into the stored constraint.

use crate::expression::ExpressionKind;
use crate::constraint::{AtomicConstraint, Comparison, Constraint};
use crate::expression::Expression;
use icftl_utils::{Error, IcftlResult};

fn expand(expr: Expression) -> IcftlResult<(Vec<Expression>, bool)> {
    match expr {
        Expression::Duration(transition) => {
            let start = transition.clone().before();
            let end = transition.after();
            Ok((vec![start, end], true))
        }
        Expression::TimeBetween(a, b) => {
            // `timeBetween` is only meaningful between two concrete-state
            // expressions; a transition has no single point in time to
            // compare.
            if a.effective_kind() != Some(ExpressionKind::ConcreteState)
                || b.effective_kind() != Some(ExpressionKind::ConcreteState)
            {
                return Err(Error::malformed_specification(
                    "timeBetween(...) requires both arguments to be concrete-state expressions",
                ));
            }
            Ok((vec![*a, *b], true))
        }
        other => Ok((vec![other], false)),
    }
}

fn build(expr: Expression, comparison: Comparison, constant: f64) -> IcftlResult<Constraint> {
    let (expressions, absolute_difference) = expand(expr)?;
    Ok(Constraint::Atom(AtomicConstraint {
        expressions,
        comparison,
        constant,
        absolute_difference,
    }))
}

impl Expression {
    /// `X < c`.
    pub fn less_than(self, constant: f64) -> IcftlResult<Constraint> {
        build(self, Comparison::Lt, constant)
    }

    /// `X <= c`.
    pub fn at_most(self, constant: f64) -> IcftlResult<Constraint> {
        build(self, Comparison::Le, constant)
    }

    /// `X > c`.
    pub fn greater_than(self, constant: f64) -> IcftlResult<Constraint> {
        build(self, Comparison::Gt, constant)
    }

    /// `X >= c`.
    pub fn at_least(self, constant: f64) -> IcftlResult<Constraint> {
        build(self, Comparison::Ge, constant)
    }

    /// `X.equals(c)`.
    pub fn equals(self, constant: f64) -> IcftlResult<Constraint> {
        build(self, Comparison::Eq, constant)
    }
}

/// `timeBetween(a, b) < constant`-style sugar, building the mixed atom
/// directly rather than going through [`Expression::time_between`] (which
/// exists for the cases where a literal `TimeBetween` expression value is
/// wanted, e.g. to feed the same `expand` normalization another comparison
/// shares).
pub fn time_between(a: Expression, b: Expression, comparison: Comparison, constant: f64) -> IcftlResult<Constraint> {
    build(a.time_between(b), comparison, constant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::AtomKind;
    use icftl_utils::Id;

    #[test]
    fn duration_comparison_expands_to_mixed_before_after_pair() {
        let t = Expression::transition(Id::new("c"));
        let constraint = t.duration().less_than(1.0).unwrap();
        match constraint {
            Constraint::Atom(a) => {
                assert_eq!(a.kind(), AtomKind::Mixed);
                assert_eq!(a.expressions.len(), 2);
                assert!(matches!(a.expressions[0], Expression::Before(_)));
                assert!(matches!(a.expressions[1], Expression::After(_)));
            }
            _ => panic!("expected atom"),
        }
    }

    #[test]
    fn time_between_builds_mixed_atom_with_absolute_difference() {
        let q = Expression::concrete_state(Id::new("q"));
        let t = Expression::transition(Id::new("t")).before();
        let constraint = time_between(q, t, Comparison::Lt, 4.2).unwrap();
        match constraint {
            Constraint::Atom(a) => {
                assert_eq!(a.kind(), AtomKind::Mixed);
                assert!(a.absolute_difference);
            }
            _ => panic!("expected atom"),
        }
    }

    #[test]
    fn plain_value_comparison_is_a_normal_atom() {
        let x = Expression::concrete_state(Id::new("x")).value(Id::new("v"));
        let constraint = x.less_than(10.0).unwrap();
        match constraint {
            Constraint::Atom(a) => assert_eq!(a.kind(), AtomKind::Normal),
            _ => panic!("expected atom"),
        }
    }

    #[test]
    fn time_between_rejects_a_bare_transition_operand() {
        let q = Expression::concrete_state(Id::new("q"));
        let t = Expression::transition(Id::new("t"));
        assert!(time_between(q, t, Comparison::Lt, 4.2).is_err());
    }
}
