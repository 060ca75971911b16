use crate::constraint::Constraint;

/// A formula configuration: the three-valued lattice a constraint's
/// evaluation state lives in while the monitor is still collecting
/// measurements. `Atom(index)` indexes into the owning constraint's
/// `get_atomic_constraints()` list. Once a real truth value is derived for
/// a subtree it replaces that subtree and monitoring never revisits it,
/// i.e. values monotonically move `pending -> true | false` and never back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Configuration {
    True,
    False,
    Atom(usize),
    And(Vec<Configuration>),
    Or(Vec<Configuration>),
    Not(Box<Configuration>),
}

impl Constraint {
    /// Build the initial (fully pending) configuration tree for this
    /// constraint, tagging every atom leaf with its `atom_index` in
    /// `get_atomic_constraints()` order.
    pub fn instantiate(&self) -> Configuration {
        let mut next_index = 0usize;
        instantiate_rec(self, &mut next_index)
    }
}

fn instantiate_rec(constraint: &Constraint, next_index: &mut usize) -> Configuration {
    match constraint {
        Constraint::Atom(_) => {
            let idx = *next_index;
            *next_index += 1;
            Configuration::Atom(idx)
        }
        Constraint::And(parts) => {
            Configuration::And(parts.iter().map(|p| instantiate_rec(p, next_index)).collect())
        }
        Constraint::Or(parts) => {
            Configuration::Or(parts.iter().map(|p| instantiate_rec(p, next_index)).collect())
        }
        Constraint::Not(inner) => Configuration::Not(Box::new(instantiate_rec(inner, next_index))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{AtomicConstraint, Comparison};
    use crate::expression::Expression;
    use icftl_utils::Id;

    fn atom(c: f64) -> Constraint {
        Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(Id::new("x"))],
            comparison: Comparison::Lt,
            constant: c,
            absolute_difference: false,
        })
    }

    #[test]
    fn instantiate_tags_atoms_in_traversal_order() {
        let c = Constraint::And(vec![atom(1.0), Constraint::Not(Box::new(atom(2.0)))]);
        let config = c.instantiate();
        match config {
            Configuration::And(parts) => {
                assert_eq!(parts[0], Configuration::Atom(0));
                assert_eq!(parts[1], Configuration::Not(Box::new(Configuration::Atom(1))));
            }
            _ => panic!("expected And"),
        }
    }
}
