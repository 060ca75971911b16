use icftl_scfg::{Predicate, PredicateKind};
use icftl_utils::Id;

/// Whether an [`Expression`]'s base variable denotes a concrete program
/// state or a transition between two consecutive states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
    ConcreteState,
    Transition,
}

/// Extension trait giving [`icftl_scfg::Predicate`] an `expression_kind()`
/// query: a variable bound by `changes(...)` is a concrete-state variable, a
/// variable bound by `calls(...)` is a transition variable. `future(...)`
/// defers transparently since it only adds a reachability constraint, never
/// changing the wrapped predicate's underlying kind.
pub trait PredicateExpressionKind {
    fn expression_kind(&self) -> ExpressionKind;
}

impl PredicateExpressionKind for Predicate {
    fn expression_kind(&self) -> ExpressionKind {
        match self.kind {
            PredicateKind::Changes(_) => ExpressionKind::ConcreteState,
            PredicateKind::Calls(_) => ExpressionKind::Transition,
        }
    }
}

/// An expression built from a quantified variable, optionally composed with
/// temporal operators.
///
/// `next`/`before`/`after` each take one measurement (they relocate which
/// concrete state/transition is being referred to, but the final evaluated
/// quantity is still a single value); `duration` and `timeBetween` each
/// combine two measurements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Variable { name: Id, kind: ExpressionKind },
    /// `E.next(p)`: the nearest symbolic state/transition forward of `E`
    /// that satisfies predicate `p`, which is independent of whatever
    /// predicate originally bound `E`'s base variable — `q.next(calls('g')
    /// .during(f))` looks forward for a call to `g`, even though `q` itself
    /// was bound by a `changes(...)` predicate.
    Next(Box<Expression>, Predicate),
    Before(Box<Expression>),
    After(Box<Expression>),
    /// The duration of a transition expression: time of the transition's
    /// second concrete state minus the first.
    Duration(Box<Expression>),
    /// The absolute time between two (generally unrelated) expressions'
    /// concrete states.
    TimeBetween(Box<Expression>, Box<Expression>),
    /// `X(v)`: the value of program variable `v` in the concrete state
    /// denoted by `X`.
    Value { state: Box<Expression>, variable: Id },
    /// `X(v).length()`: the length of that same value. Always wraps a
    /// [`Expression::Value`]; the distinction from a plain `Value` is
    /// purely in which host accessor the planner emits.
    Length(Box<Expression>),
}

impl Expression {
    pub fn concrete_state(name: Id) -> Self {
        Expression::Variable {
            name,
            kind: ExpressionKind::ConcreteState,
        }
    }

    pub fn transition(name: Id) -> Self {
        Expression::Variable {
            name,
            kind: ExpressionKind::Transition,
        }
    }

    /// `E.next(p)`: locate the nearest qualifying site forward of `E`
    /// according to predicate `p`.
    pub fn next(self, predicate: Predicate) -> Self {
        Expression::Next(Box::new(self), predicate)
    }

    pub fn before(self) -> Self {
        Expression::Before(Box::new(self))
    }

    pub fn after(self) -> Self {
        Expression::After(Box::new(self))
    }

    pub fn duration(self) -> Self {
        Expression::Duration(Box::new(self))
    }

    pub fn time_between(self, other: Expression) -> Self {
        Expression::TimeBetween(Box::new(self), Box::new(other))
    }

    /// `X(v)`: the value of program variable `variable` in the concrete
    /// state `self` denotes.
    pub fn value(self, variable: Id) -> Self {
        Expression::Value {
            state: Box::new(self),
            variable,
        }
    }

    /// `X(v).length()`. Only meaningful chained off [`Expression::value`].
    pub fn length(self) -> Self {
        Expression::Length(Box::new(self))
    }

    /// The quantified variable this expression is ultimately built from,
    /// found by peeling away temporal operators and measurement accessors.
    /// `TimeBetween` has no single base variable; callers that need one per
    /// side should recurse into its operands directly.
    pub fn base_variable(&self) -> Option<(Id, ExpressionKind)> {
        match self {
            Expression::Variable { name, kind } => Some((*name, *kind)),
            Expression::Next(e, _)
            | Expression::Before(e)
            | Expression::After(e)
            | Expression::Duration(e)
            | Expression::Value { state: e, .. }
            | Expression::Length(e) => e.base_variable(),
            Expression::TimeBetween(..) => None,
        }
    }

    /// Every predicate embedded in this expression via `.next(p)`, at any
    /// depth; used by [`crate::Specification::function_names_used`] to
    /// surface functions referenced only inside a `next` rather than by a
    /// quantifier's own `.during(...)`.
    pub fn embedded_predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        self.collect_embedded_predicates(&mut out);
        out
    }

    fn collect_embedded_predicates(&self, out: &mut Vec<Predicate>) {
        match self {
            Expression::Variable { .. } => {}
            Expression::Next(inner, predicate) => {
                out.push(*predicate);
                inner.collect_embedded_predicates(out);
            }
            Expression::Before(inner)
            | Expression::After(inner)
            | Expression::Duration(inner)
            | Expression::Value { state: inner, .. }
            | Expression::Length(inner) => inner.collect_embedded_predicates(out),
            Expression::TimeBetween(a, b) => {
                a.collect_embedded_predicates(out);
                b.collect_embedded_predicates(out);
            }
        }
    }

    /// The kind of concrete thing this expression ultimately denotes once
    /// every temporal operator has been applied — distinct from
    /// [`Expression::base_variable`]'s kind, since `before`/`after` turn a
    /// *transition* variable into a *concrete-state* expression (`T.before()`
    /// is the state the transition started from), and `next(p)` takes its
    /// kind from `p` rather than from the expression it was applied to (a
    /// `changes(...)` predicate yields a concrete state, a `calls(...)`
    /// predicate yields a transition — mirroring how a quantifier variable's
    /// own kind is determined by which predicate bound it). `None` for
    /// `duration`/`timeBetween`, which denote a scalar, not a state or
    /// transition.
    pub fn effective_kind(&self) -> Option<ExpressionKind> {
        match self {
            Expression::Variable { kind, .. } => Some(*kind),
            Expression::Before(_) | Expression::After(_) => Some(ExpressionKind::ConcreteState),
            Expression::Next(_, predicate) => Some(predicate.expression_kind()),
            Expression::Value { state: inner, .. } | Expression::Length(inner) => inner.effective_kind(),
            Expression::Duration(_) | Expression::TimeBetween(..) => None,
        }
    }

    /// Whether evaluating this expression at runtime requires exactly one
    /// measurement (a "normal" atom) or two (a "mixed" atom, as with
    /// `duration`/`timeBetween`).
    pub fn measurement_count(&self) -> usize {
        match self {
            Expression::Duration(_) | Expression::TimeBetween(..) => 2,
            Expression::Variable { .. }
            | Expression::Next(..)
            | Expression::Before(_)
            | Expression::After(_)
            | Expression::Value { .. }
            | Expression::Length(_) => 1,
        }
    }
}

/// The ordered sequence of temporal operators composing an expression,
/// outermost first, derived by peeling the expression tree from the
/// outside in. The analyzer walks this sequence to know, in order, which
/// further SCFG traversal step each layer requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalOperator {
    Next(Predicate),
    Before,
    After,
    Duration,
    TimeBetween,
}

pub fn derive_sequence_of_temporal_operators(expr: &Expression) -> Vec<TemporalOperator> {
    let mut out = Vec::new();
    derive_rec(expr, &mut out);
    out
}

fn derive_rec(expr: &Expression, out: &mut Vec<TemporalOperator>) {
    match expr {
        Expression::Variable { .. } => {}
        Expression::Next(inner, predicate) => {
            out.push(TemporalOperator::Next(*predicate));
            derive_rec(inner, out);
        }
        Expression::Before(inner) => {
            out.push(TemporalOperator::Before);
            derive_rec(inner, out);
        }
        Expression::After(inner) => {
            out.push(TemporalOperator::After);
            derive_rec(inner, out);
        }
        Expression::Duration(inner) => {
            out.push(TemporalOperator::Duration);
            derive_rec(inner, out);
        }
        Expression::TimeBetween(..) => {
            out.push(TemporalOperator::TimeBetween);
        }
        // Measurement accessors carry no temporal operator themselves; the
        // sequence comes entirely from the state expression they wrap.
        Expression::Value { state: inner, .. } | Expression::Length(inner) => derive_rec(inner, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peels_operators_outside_in() {
        let predicate = Predicate::changes(Id::new("y"), Id::new("f"));
        let e = Expression::concrete_state(Id::new("x")).next(predicate).before();
        let seq = derive_sequence_of_temporal_operators(&e);
        assert_eq!(seq, vec![TemporalOperator::Before, TemporalOperator::Next(predicate)]);
    }

    #[test]
    fn embedded_predicate_is_collected_from_next() {
        let predicate = Predicate::calls(Id::new("g"), Id::new("f"));
        let e = Expression::concrete_state(Id::new("x")).next(predicate);
        assert_eq!(e.embedded_predicates(), vec![predicate]);
    }

    #[test]
    fn duration_and_time_between_need_two_measurements() {
        let t = Expression::transition(Id::new("x"));
        assert_eq!(t.clone().duration().measurement_count(), 2);
        assert_eq!(
            t.clone().time_between(Expression::transition(Id::new("y"))).measurement_count(),
            2
        );
        assert_eq!(t.measurement_count(), 1);
    }
}
