//! A single binding/formula-tree pair. One `BindingState` exists per
//! partially- or fully-bound tuple of quantified variables discovered at a
//! given map index; it owns the timestamp sequence that *is* the binding
//! plus the formula's evolving three-valued configuration.

use crate::formula::update_with_measurement;
use icftl_spec::{AtomicConstraint, Configuration, Constraint};
use std::collections::HashMap;
use std::time::Instant;

/// `{atom_index: {subatom_index: measurement}}`, keyed so idempotent
/// re-application (a measurement instrument firing twice for the same
/// site) is a simple "insert if absent".
pub type MeasurementDictionary = HashMap<usize, HashMap<usize, f64>>;

#[derive(Debug)]
pub struct BindingState {
    timestamps: Vec<Instant>,
    atoms: Vec<AtomicConstraint>,
    configuration: Configuration,
    measurements: MeasurementDictionary,
}

impl BindingState {
    /// Start a new binding with its first (and possibly only) timestamp,
    /// against `constraint`'s freshly instantiated (fully pending)
    /// configuration tree.
    pub fn new(first_timestamp: Instant, constraint: &Constraint) -> Self {
        BindingState {
            timestamps: vec![first_timestamp],
            atoms: constraint.get_atomic_constraints().into_iter().cloned().collect(),
            configuration: constraint.instantiate(),
            measurements: HashMap::new(),
        }
    }

    /// How many variables this binding currently covers, i.e. the
    /// `variable_index` a trigger must match to extend it.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[Instant] {
        &self.timestamps
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.configuration, Configuration::True | Configuration::False)
    }

    /// Branch a new binding off this one for the next quantifier's
    /// timestamp, leaving `self` untouched: a partial binding may be
    /// extended by more than one qualifying `future` site, so each
    /// extension is a sibling rather than a mutation. Only valid when
    /// `variable_index == self.len()`; the caller (the monitor's trigger
    /// handler) is responsible for that check since it is the one
    /// deciding which bindings a trigger applies to.
    ///
    /// `is_relevant(atom_index, subatom_index)` decides which entries of
    /// the measurement dictionary carry over: only measurements whose
    /// atom's base variable was already bound (position below the one
    /// just triggered) are copied, so a premature measurement recorded
    /// against this partial binding before it forked doesn't leak into a
    /// sibling it no longer describes.
    pub fn fork(&self, timestamp: Instant, is_relevant: &dyn Fn(usize, usize) -> bool) -> BindingState {
        let mut timestamps = self.timestamps.clone();
        timestamps.push(timestamp);

        let mut measurements: MeasurementDictionary = HashMap::new();
        for (&atom_index, subatoms) in &self.measurements {
            for (&subatom_index, &value) in subatoms {
                if is_relevant(atom_index, subatom_index) {
                    measurements
                        .entry(atom_index)
                        .or_default()
                        .insert(subatom_index, value);
                }
            }
        }

        BindingState {
            timestamps,
            atoms: self.atoms.clone(),
            configuration: self.configuration.clone(),
            measurements,
        }
    }

    /// Apply a measurement for `(atom_index, subatom_index)`, idempotently:
    /// a repeat delivery of the same measurement is a no-op, matching the
    /// original's "insert if absent" guard.
    pub fn update_with_measurement(&mut self, measurement: f64, atom_index: usize, subatom_index: usize) {
        let subatoms = self.measurements.entry(atom_index).or_default();
        if subatoms.contains_key(&subatom_index) {
            return;
        }
        subatoms.insert(subatom_index, measurement);

        let subatom_measurements = subatoms.clone();
        let config = std::mem::replace(&mut self.configuration, Configuration::False);
        self.configuration = update_with_measurement(config, &self.atoms, atom_index, &subatom_measurements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icftl_spec::{Comparison, Expression};
    use icftl_utils::Id;

    fn lt_constraint(constant: f64) -> Constraint {
        Constraint::Atom(icftl_spec::AtomicConstraint {
            expressions: vec![Expression::concrete_state(Id::new("x")).value(Id::new("v"))],
            comparison: Comparison::Lt,
            constant,
            absolute_difference: false,
        })
    }

    #[test]
    fn new_binding_starts_pending_with_one_timestamp() {
        let constraint = lt_constraint(10.0);
        let state = BindingState::new(Instant::now(), &constraint);
        assert_eq!(state.len(), 1);
        assert_eq!(state.configuration(), &Configuration::Atom(0));
        assert!(!state.is_resolved());
    }

    #[test]
    fn measurement_resolves_single_atom_binding() {
        let constraint = lt_constraint(10.0);
        let mut state = BindingState::new(Instant::now(), &constraint);
        state.update_with_measurement(3.0, 0, 0);
        assert_eq!(state.configuration(), &Configuration::True);
        assert!(state.is_resolved());
    }

    #[test]
    fn repeated_measurement_for_same_subatom_is_ignored() {
        let constraint = lt_constraint(10.0);
        let mut state = BindingState::new(Instant::now(), &constraint);
        state.update_with_measurement(3.0, 0, 0);
        state.update_with_measurement(99.0, 0, 0);
        assert_eq!(state.configuration(), &Configuration::True);
    }

    #[test]
    fn fork_grows_the_timestamp_sequence_without_mutating_the_parent() {
        let constraint = lt_constraint(10.0);
        let state = BindingState::new(Instant::now(), &constraint);
        let child = state.fork(Instant::now(), &|_, _| true);
        assert_eq!(state.len(), 1);
        assert_eq!(child.len(), 2);
    }

    #[test]
    fn fork_drops_measurements_not_relevant_to_the_new_position() {
        let constraint = lt_constraint(10.0);
        let mut state = BindingState::new(Instant::now(), &constraint);
        state.update_with_measurement(3.0, 0, 0);
        let child = state.fork(Instant::now(), &|_, _| false);
        // The parent's own configuration already resolved to `true`...
        assert_eq!(state.configuration(), &Configuration::True);
        // ...but the child starts from the same resolved configuration and
        // an empty, filtered-out measurement dictionary.
        assert_eq!(child.configuration(), &Configuration::True);
    }
}
