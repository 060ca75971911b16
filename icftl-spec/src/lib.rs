mod comparison;
mod configuration;
mod constraint;
mod expression;
mod specification;

pub use comparison::time_between;
pub use configuration::Configuration;
pub use constraint::{
    all_are_true, function_names_used_in_expressions, not_true, one_is_true, AtomKind,
    AtomicConstraint, Comparison, Constraint, TriBool,
};
pub use expression::{
    derive_sequence_of_temporal_operators, Expression, ExpressionKind, PredicateExpressionKind,
    TemporalOperator,
};
pub use specification::{Forall, ForallNext, Specification, SpecificationBuilder};

pub use icftl_scfg::{Predicate, PredicateKind};
