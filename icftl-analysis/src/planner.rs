use crate::analyser::InstrumentationTree;
use ahash::AHashMap;
use icftl_scfg::{Scfg, Site};
use icftl_spec::{AtomicConstraint, Expression};
use icftl_utils::Id;

/// What a measurement instrument actually captures at its site.
/// The planner derives this from the shape of the atom's expression so the
/// host knows which concrete emit call to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementKind {
    /// `emit_measurement(..., value_of(variable))` just after the statement.
    Value { variable: Id },
    /// `emit_measurement(..., length_of(variable))` just after the statement.
    Length { variable: Id },
    /// A timestamp captured just before the statement runs (the `t_start`
    /// half of a duration instrument, or a bare `T.before()` operand).
    TimestampBefore,
    /// A timestamp captured just after the statement runs (the `t_end`
    /// half of a duration instrument, or a bare `T.after()` operand).
    TimestampAfter,
    /// A bare concrete-state/transition operand with no explicit value
    /// accessor: the measurement is simply when that site was reached,
    /// i.e. the same timestamp already captured for its quantifier trigger.
    Timestamp,
}

fn classify(expr: &Expression) -> MeasurementKind {
    match expr {
        Expression::Value { variable, .. } => MeasurementKind::Value { variable: *variable },
        Expression::Length(inner) => match inner.as_ref() {
            Expression::Value { variable, .. } => MeasurementKind::Length { variable: *variable },
            _ => MeasurementKind::Timestamp,
        },
        Expression::Before(_) => MeasurementKind::TimestampBefore,
        Expression::After(_) => MeasurementKind::TimestampAfter,
        Expression::Variable { .. } | Expression::Next(..) | Expression::Duration(_) | Expression::TimeBetween(..) => {
            MeasurementKind::Timestamp
        }
    }
}

/// What kind of runtime emit call an instrumentation point corresponds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitKind {
    /// Records the timestamp for a quantifier binding.
    Binding { binding_index: usize, variable_index: usize },
    /// Records a measurement for one subatom of one atomic constraint.
    Measurement {
        binding_index: usize,
        atom_index: usize,
        subatom_index: usize,
        measurement: MeasurementKind,
    },
}

/// A single program location that must be instrumented, plus what to emit
/// there.
#[derive(Clone, Copy, Debug)]
pub struct InstrumentationPoint {
    pub function: Id,
    pub line: usize,
    pub kind: EmitKind,
}

/// Turn the analyzer's bindings and instrumentation tree into an ordered
/// list of instrumentation points.
///
/// Points are sorted by line number descending (stable, so equal-line
/// points keep their relative discovery order) which keeps paired
/// begin/end instruments (e.g. a binding emit immediately followed by a
/// measurement emit on the same statement) in a predictable order when a
/// host rewrites a module bottom-to-top so that earlier edits don't shift
/// the line numbers later edits need.
pub fn plan(
    bindings: &[crate::analyser::Binding],
    tree: &InstrumentationTree,
    atoms: &[&AtomicConstraint],
    function_to_scfg: &AHashMap<Id, Scfg>,
) -> Vec<InstrumentationPoint> {
    let mut points = Vec::new();

    for (binding_index, binding) in bindings.iter().enumerate() {
        for (variable_index, (_, site)) in sorted_by_variable(binding).into_iter().enumerate() {
            if let Some(p) = point_for_site(
                function_to_scfg,
                site,
                EmitKind::Binding {
                    binding_index,
                    variable_index,
                },
            ) {
                points.push(p);
            }
        }
    }

    for (&binding_index, per_atom) in tree {
        for (&atom_index, per_subatom) in per_atom {
            let Some(atom) = atoms.get(atom_index) else {
                log::warn!("instrumentation tree referenced unknown atom {atom_index}");
                continue;
            };
            for (&subatom_index, sites) in per_subatom {
                let measurement = atom
                    .expressions
                    .get(subatom_index)
                    .map(classify)
                    .unwrap_or(MeasurementKind::Timestamp);
                for site in sites {
                    if let Some(p) = point_for_site(
                        function_to_scfg,
                        *site,
                        EmitKind::Measurement {
                            binding_index,
                            atom_index,
                            subatom_index,
                            measurement,
                        },
                    ) {
                        points.push(p);
                    }
                }
            }
        }
    }

    points.sort_by_key(|p| std::cmp::Reverse(p.line));
    points
}

fn sorted_by_variable(binding: &crate::analyser::Binding) -> Vec<(Id, Site)> {
    let mut v: Vec<(Id, Site)> = binding.iter().map(|(k, s)| (*k, *s)).collect();
    v.sort_by_key(|(id, _)| id.as_str());
    v
}

fn point_for_site(function_to_scfg: &AHashMap<Id, Scfg>, site: Site, kind: EmitKind) -> Option<InstrumentationPoint> {
    let scfg = function_to_scfg.get(&site.function)?;
    let loc = scfg.get(site.state).kind.loc()?;
    Some(InstrumentationPoint {
        function: site.function,
        line: loc.line,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_points_by_line_descending() {
        let points = vec![
            InstrumentationPoint {
                function: Id::new("f"),
                line: 1,
                kind: EmitKind::Binding {
                    binding_index: 0,
                    variable_index: 0,
                },
            },
            InstrumentationPoint {
                function: Id::new("f"),
                line: 5,
                kind: EmitKind::Binding {
                    binding_index: 0,
                    variable_index: 0,
                },
            },
        ];
        let mut sorted = points;
        sorted.sort_by_key(|p| std::cmp::Reverse(p.line));
        assert_eq!(sorted[0].line, 5);
        assert_eq!(sorted[1].line, 1);
    }

    #[test]
    fn duration_atom_plans_a_timestamp_before_and_after_pair_at_the_same_site() {
        use icftl_ast::{Expr, Function, Location, Stmt};
        use icftl_spec::{Constraint, Predicate, Specification, SpecificationBuilder};

        let f = Id::new("f");
        let function = Function {
            name: f,
            body: vec![Stmt::Expr {
                value: Expr::Call {
                    function: Id::new("g"),
                    args: vec![],
                },
                loc: Location { line: 7 },
            }],
        };
        let mut function_to_scfg = AHashMap::default();
        function_to_scfg.insert(f, Scfg::build(&function));

        let c = Id::new("c");
        let spec: Specification = SpecificationBuilder::new()
            .forall(c, Predicate::calls(Id::new("g"), f))
            .unwrap()
            .check(Expression::transition(c).duration().less_than(1.0).unwrap())
            .unwrap();
        let _ = &spec;

        let atoms_owned: Vec<AtomicConstraint> = match spec.constraint() {
            Constraint::Atom(a) => vec![a.clone()],
            _ => panic!("expected a single atom"),
        };
        let atoms: Vec<&AtomicConstraint> = atoms_owned.iter().collect();

        let analyser = crate::analyser::Analyser::new(&spec, &function_to_scfg).unwrap();
        let (bindings, tree) = analyser.compute_instrumentation_points().unwrap();
        let points = plan(&bindings, &tree, &atoms, &function_to_scfg);

        let measurements: Vec<_> = points
            .iter()
            .filter_map(|p| match p.kind {
                EmitKind::Measurement { measurement, .. } => Some(measurement),
                _ => None,
            })
            .collect();
        assert!(measurements.contains(&MeasurementKind::TimestampBefore));
        assert!(measurements.contains(&MeasurementKind::TimestampAfter));
    }
}
