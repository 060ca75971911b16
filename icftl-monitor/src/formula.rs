//! Three-valued, short-circuiting formula-tree evaluation. Rather than
//! dispatching on node identity to find the atom a measurement targets, we
//! dispatch on the `atom_index` every [`Configuration::Atom`] leaf was
//! tagged with at `Constraint::instantiate` time, since values here don't
//! carry a stable identity across clones.

use icftl_spec::{AtomicConstraint, Configuration, TriBool};
use std::collections::HashMap;

/// Update `config` with a freshly observed measurement for `atom_index`,
/// given the atom's own (already updated) subatom measurement map.
///
/// Once a node resolves to [`Configuration::True`]/[`Configuration::False`]
/// it is a leaf with no further children to recurse into, so repeated
/// calls can never move it backwards. The formula-configuration lattice's
/// monotonicity falls directly out of the recursion shape rather than
/// needing a separate guard.
pub fn update_with_measurement(
    config: Configuration,
    atoms: &[AtomicConstraint],
    atom_index: usize,
    subatom_measurements: &HashMap<usize, f64>,
) -> Configuration {
    match config {
        Configuration::True => Configuration::True,
        Configuration::False => Configuration::False,
        Configuration::Atom(idx) => {
            if idx != atom_index {
                return Configuration::Atom(idx);
            }
            match atoms[idx].check(subatom_measurements) {
                TriBool::True => Configuration::True,
                TriBool::False => Configuration::False,
                TriBool::Pending => Configuration::Atom(idx),
            }
        }
        Configuration::And(parts) => {
            let updated: Vec<Configuration> = parts
                .into_iter()
                .map(|p| update_with_measurement(p, atoms, atom_index, subatom_measurements))
                .collect();
            if updated.iter().any(|p| matches!(p, Configuration::False)) {
                Configuration::False
            } else if updated.iter().all(|p| matches!(p, Configuration::True)) {
                Configuration::True
            } else {
                Configuration::And(updated)
            }
        }
        Configuration::Or(parts) => {
            let updated: Vec<Configuration> = parts
                .into_iter()
                .map(|p| update_with_measurement(p, atoms, atom_index, subatom_measurements))
                .collect();
            if updated.iter().any(|p| matches!(p, Configuration::True)) {
                Configuration::True
            } else if updated.iter().all(|p| matches!(p, Configuration::False)) {
                Configuration::False
            } else {
                Configuration::Or(updated)
            }
        }
        Configuration::Not(inner) => {
            match update_with_measurement(*inner, atoms, atom_index, subatom_measurements) {
                Configuration::True => Configuration::False,
                Configuration::False => Configuration::True,
                other => Configuration::Not(Box::new(other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icftl_spec::{Comparison, Expression};
    use icftl_utils::Id;

    fn atom(constant: f64) -> AtomicConstraint {
        AtomicConstraint {
            expressions: vec![Expression::concrete_state(Id::new("x")).value(Id::new("v"))],
            comparison: Comparison::Lt,
            constant,
            absolute_difference: false,
        }
    }

    #[test]
    fn single_atom_resolves_on_first_matching_measurement() {
        let atoms = vec![atom(10.0)];
        let config = Configuration::Atom(0);
        let mut measurements = HashMap::new();
        measurements.insert(0usize, 7.0);
        let updated = update_with_measurement(config, &atoms, 0, &measurements);
        assert_eq!(updated, Configuration::True);
    }

    #[test]
    fn conjunction_short_circuits_on_first_false_conjunct() {
        let atoms = vec![atom(10.0), atom(1.0)];
        let config = Configuration::And(vec![Configuration::Atom(0), Configuration::Atom(1)]);
        let mut measurements = HashMap::new();
        measurements.insert(0usize, 11.0);
        let updated = update_with_measurement(config, &atoms, 0, &measurements);
        assert_eq!(updated, Configuration::False);
    }

    #[test]
    fn conjunction_stays_pending_until_every_conjunct_resolves() {
        let atoms = vec![atom(10.0), atom(10.0)];
        let config = Configuration::And(vec![Configuration::Atom(0), Configuration::Atom(1)]);
        let mut measurements = HashMap::new();
        measurements.insert(0usize, 1.0);
        let config = update_with_measurement(config, &atoms, 0, &measurements);
        assert_eq!(config, Configuration::And(vec![Configuration::True, Configuration::Atom(1)]));
    }

    #[test]
    fn false_node_is_a_leaf_and_further_updates_are_no_ops() {
        let atoms = vec![atom(10.0)];
        let config = Configuration::False;
        let measurements = HashMap::new();
        assert_eq!(update_with_measurement(config, &atoms, 0, &measurements), Configuration::False);
    }

    #[test]
    fn negation_flips_once_operand_resolves() {
        let atoms = vec![atom(10.0)];
        let config = Configuration::Not(Box::new(Configuration::Atom(0)));
        let mut measurements = HashMap::new();
        measurements.insert(0usize, 11.0); // 11 < 10 is false, so Not(false) = true
        let updated = update_with_measurement(config, &atoms, 0, &measurements);
        assert_eq!(updated, Configuration::True);
    }
}
