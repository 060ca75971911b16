use crate::expression::Expression;
use icftl_utils::Id;
use std::collections::HashMap;

/// Whether an atomic constraint needs one measurement (`Normal`) or two
/// (`Mixed`, for `duration`/`timeBetween` comparisons) before it can be
/// checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomKind {
    Normal,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// An atomic (non-decomposable) constraint: either a single expression
/// compared against a constant (`Normal`), or two expressions compared
/// against each other (`Mixed`); the `timeBetween(a, b) < k` shape uses
/// the latter with `abs(m1 - m0)` as its left-hand side, matching the
/// original's `TimeBetweenLessThanConstant` semantics.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicConstraint {
    pub expressions: Vec<Expression>,
    pub comparison: Comparison,
    pub constant: f64,
    pub absolute_difference: bool,
}

/// Outcome of checking an atomic constraint once all of its measurements
/// are available. `Pending` means not all measurements have arrived yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriBool {
    Pending,
    True,
    False,
}

impl AtomicConstraint {
    pub fn kind(&self) -> AtomKind {
        let needs_two = self.expressions.len() == 2
            || self.expressions.iter().any(|e| e.measurement_count() == 2);
        if needs_two {
            AtomKind::Mixed
        } else {
            AtomKind::Normal
        }
    }

    pub fn expression(&self, subatom_index: usize) -> &Expression {
        &self.expressions[subatom_index]
    }

    /// Evaluate this atom given whatever measurements (keyed by subatom
    /// index) have been recorded so far.
    pub fn check(&self, measurements: &HashMap<usize, f64>) -> TriBool {
        match self.kind() {
            AtomKind::Normal => match measurements.get(&0) {
                Some(m) => {
                    if self.comparison.apply(*m, self.constant) {
                        TriBool::True
                    } else {
                        TriBool::False
                    }
                }
                None => TriBool::Pending,
            },
            AtomKind::Mixed => {
                let (Some(m0), Some(m1)) = (measurements.get(&0), measurements.get(&1)) else {
                    return TriBool::Pending;
                };
                let lhs = if self.absolute_difference {
                    (m1 - m0).abs()
                } else {
                    m1 - m0
                };
                if self.comparison.apply(lhs, self.constant) {
                    TriBool::True
                } else {
                    TriBool::False
                }
            }
        }
    }
}

/// A quantifier-free formula over atomic constraints.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Atom(AtomicConstraint),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Box<Constraint>),
}

impl Constraint {
    pub fn and(parts: Vec<Constraint>) -> icftl_utils::IcftlResult<Self> {
        if parts.is_empty() {
            return Err(icftl_utils::Error::incomplete_constraint(
                "conjunction built with no operands",
            ));
        }
        Ok(Constraint::And(parts))
    }

    pub fn or(parts: Vec<Constraint>) -> icftl_utils::IcftlResult<Self> {
        if parts.is_empty() {
            return Err(icftl_utils::Error::incomplete_constraint(
                "disjunction built with no operands",
            ));
        }
        Ok(Constraint::Or(parts))
    }

    /// Atomic constraints in the order a stack-based depth-first traversal
    /// of the formula visits them; this order defines `atom_index` for the
    /// rest of the framework.
    pub fn get_atomic_constraints(&self) -> Vec<&AtomicConstraint> {
        let mut stack = vec![self];
        let mut out = Vec::new();
        while let Some(node) = stack.pop() {
            match node {
                Constraint::Atom(a) => out.push(a),
                Constraint::And(parts) | Constraint::Or(parts) => {
                    for p in parts.iter().rev() {
                        stack.push(p);
                    }
                }
                Constraint::Not(inner) => stack.push(inner),
            }
        }
        out
    }

    /// Every variable name referenced anywhere in this constraint's
    /// expressions, deduplicated.
    pub fn variables_used(&self) -> Vec<Id> {
        use itertools::Itertools;
        let mut out = Vec::new();
        for atom in self.get_atomic_constraints() {
            for expr in &atom.expressions {
                collect_variables(expr, &mut out);
            }
        }
        out.into_iter().unique().collect()
    }
}

fn collect_variables(expr: &Expression, out: &mut Vec<Id>) {
    match expr {
        Expression::Variable { name, .. } => out.push(*name),
        Expression::Next(e, _)
        | Expression::Before(e)
        | Expression::After(e)
        | Expression::Duration(e)
        | Expression::Value { state: e, .. }
        | Expression::Length(e) => collect_variables(e, out),
        Expression::TimeBetween(a, b) => {
            collect_variables(a, out);
            collect_variables(b, out);
        }
    }
}

/// Every function name referenced by `.during(...)` anywhere in `constraint`,
/// whether on a quantifier's own predicate (collected separately by
/// [`crate::Specification::function_names_used`]) or embedded in a `next(p)`
/// expression — see [`Expression::embedded_predicates`].
pub fn function_names_used_in_expressions(constraint: &Constraint) -> Vec<Id> {
    let mut out = Vec::new();
    for atom in constraint.get_atomic_constraints() {
        for expr in &atom.expressions {
            for predicate in expr.embedded_predicates() {
                out.push(predicate.during_function);
            }
        }
    }
    out
}

/// Push a logical negation down to the atoms of `constraint` via De Morgan's
/// laws, cancelling double negation along the way. Used by the `one_is_true`
/// sugar (`¬(¬A ∧ ¬B) = A ∨ B`) and directly by callers wanting `Not`
/// pre-distributed rather than wrapping the whole tree.
pub fn not_true(constraint: Constraint) -> Constraint {
    match constraint {
        Constraint::And(parts) => Constraint::Or(parts.into_iter().map(not_true).collect()),
        Constraint::Or(parts) => Constraint::And(parts.into_iter().map(not_true).collect()),
        Constraint::Not(inner) => *inner,
        atom @ Constraint::Atom(_) => Constraint::Not(Box::new(atom)),
    }
}

/// `all_are_true([a, b, c])` sugar for a flat conjunction.
pub fn all_are_true(parts: Vec<Constraint>) -> icftl_utils::IcftlResult<Constraint> {
    Constraint::and(parts)
}

/// `one_is_true([a, b, c])` sugar for a flat disjunction.
pub fn one_is_true(parts: Vec<Constraint>) -> icftl_utils::IcftlResult<Constraint> {
    Constraint::or(parts)
}
