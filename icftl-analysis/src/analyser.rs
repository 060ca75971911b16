use ahash::AHashMap;
use icftl_scfg::{PredicateKind, SCFGSearcher, Scfg, Site};
use icftl_spec::{Expression, Specification};
use icftl_utils::{Error, Id, IcftlResult};

/// One resolved instance of a specification's quantifier chain: a map from
/// each quantified variable to the symbolic state it was bound to.
pub type Binding = AHashMap<Id, Site>;

/// `binding_index -> atom_index -> subatom_index -> instrumentation sites`.
pub type InstrumentationTree = AHashMap<usize, AHashMap<usize, AHashMap<usize, Vec<Site>>>>;

/// Performs the static analysis that decides, for a specification and a
/// family of symbolic control-flow graphs, which program sites measurements
/// must be taken from at runtime.
pub struct Analyser<'a> {
    specification: &'a Specification,
    function_to_scfg: &'a AHashMap<Id, Scfg>,
    searcher: SCFGSearcher<'a>,
}

impl<'a> Analyser<'a> {
    /// Build an analyser for `specification` against `function_to_scfg`,
    /// failing immediately (a *resolution failure*, per the framework's
    /// error taxonomy) if any function the specification's predicates
    /// reference has no corresponding SCFG.
    pub fn new(specification: &'a Specification, function_to_scfg: &'a AHashMap<Id, Scfg>) -> IcftlResult<Self> {
        let used = specification.function_names_used();
        log::info!("specification uses functions {used:?}");
        for function in &used {
            if !function_to_scfg.contains_key(function) {
                return Err(Error::unknown_function(*function));
            }
        }
        Ok(Analyser {
            specification,
            function_to_scfg,
            searcher: SCFGSearcher::new(function_to_scfg),
        })
    }

    pub fn searcher(&self) -> &SCFGSearcher<'a> {
        &self.searcher
    }

    /// Compute every quantifier binding and, for each one, the
    /// instrumentation tree derived from the specification's constraint.
    pub fn compute_instrumentation_points(&self) -> IcftlResult<(Vec<Binding>, InstrumentationTree)> {
        log::info!("inspecting quantifiers");
        let bindings = self.inspect_quantifiers()?;
        log::info!("inspecting constraints for {} binding(s)", bindings.len());
        let tree = self.inspect_constraints(&bindings)?;
        Ok((bindings, tree))
    }

    /// Recursively resolve the quantifier chain into every tuple of
    /// symbolic states satisfying it, depth-first over the chain.
    fn inspect_quantifiers(&self) -> IcftlResult<Vec<Binding>> {
        let sequence = self.specification.quantifier_sequence();
        let lists = self.recurse_on_quantifier(&sequence, 0, &[])?;
        let mut bindings = Vec::with_capacity(lists.len());
        for list in lists {
            let mut map = Binding::default();
            for (i, (variable, _)) in sequence.iter().enumerate() {
                map.insert(*variable, list[i]);
            }
            bindings.push(map);
        }
        Ok(bindings)
    }

    fn recurse_on_quantifier(
        &self,
        sequence: &[(Id, icftl_spec::Predicate)],
        index: usize,
        current: &[Site],
    ) -> IcftlResult<Vec<Vec<Site>>> {
        let (_, predicate) = &sequence[index];
        let previous = current.last().copied();
        let candidates = self.searcher.find_symbolic_states(predicate, previous);
        if candidates.is_empty() {
            log::warn!(
                "predicate for quantifier {index} (during `{}`) matched no symbolic states",
                predicate.during_function
            );
        }

        let extended: Vec<Vec<Site>> = candidates
            .into_iter()
            .map(|site| {
                let mut v = current.to_vec();
                v.push(site);
                v
            })
            .collect();

        if index == sequence.len() - 1 {
            return Ok(extended);
        }

        let mut out = Vec::new();
        for list in extended {
            out.extend(self.recurse_on_quantifier(sequence, index + 1, &list)?);
        }
        Ok(out)
    }

    fn inspect_constraints(&self, bindings: &[Binding]) -> IcftlResult<InstrumentationTree> {
        let atoms = self.specification.constraint().get_atomic_constraints();
        let mut tree = InstrumentationTree::default();
        for (binding_index, binding) in bindings.iter().enumerate() {
            let mut per_atom = AHashMap::default();
            for (atom_index, atom) in atoms.iter().enumerate() {
                let mut per_subatom = AHashMap::default();
                for (subatom_index, expr) in atom.expressions.iter().enumerate() {
                    let sites = self.resolve_expression(expr, binding)?;
                    per_subatom.insert(subatom_index, sites);
                }
                per_atom.insert(atom_index, per_subatom);
            }
            tree.insert(binding_index, per_atom);
        }
        Ok(tree)
    }

    /// Resolve an expression to the symbolic state(s) a measurement for it
    /// must be taken at, by peeling off temporal operators from the
    /// outside in and re-querying the SCFG searcher at each layer.
    fn resolve_expression(&self, expr: &Expression, binding: &Binding) -> IcftlResult<Vec<Site>> {
        match expr {
            Expression::Variable { name, .. } => {
                let site = binding.get(name).ok_or_else(|| Error::undefined_variable(*name))?;
                Ok(vec![*site])
            }
            Expression::Next(inner, predicate) => self.step_next(inner, predicate, binding),
            // Per the searcher's contract, `before`/`after` of a
            // transition do not traverse the SCFG at all: they return the
            // transition's own bound site unchanged, and it is the
            // instrumentation planner that decides whether to capture a
            // timestamp just before or just after that site's statement.
            Expression::Before(inner) | Expression::After(inner) => self.resolve_expression(inner, binding),
            Expression::Duration(inner) => {
                // A transition's duration is derived from the two
                // timestamps of the transition's own bound site; no further
                // SCFG traversal is needed.
                self.resolve_expression(inner, binding)
            }
            Expression::TimeBetween(a, b) => {
                let mut sites = self.resolve_expression(a, binding)?;
                sites.extend(self.resolve_expression(b, binding)?);
                Ok(sites)
            }
            // Measurement accessors identify no new site of their own; the
            // site is wherever the state expression they wrap resolves to.
            Expression::Value { state: inner, .. } | Expression::Length(inner) => self.resolve_expression(inner, binding),
        }
    }

    /// `E.next(p)`: traverses forward from `E`'s resolved site(s) to the
    /// nearest site satisfying `p`, which governs the traversal
    /// independently of whatever predicate bound `E`'s own base variable —
    /// `.next(predicate)` always takes an explicit predicate argument.
    fn step_next(
        &self,
        inner: &Expression,
        predicate: &icftl_spec::Predicate,
        binding: &Binding,
    ) -> IcftlResult<Vec<Site>> {
        let sites = self.resolve_expression(inner, binding)?;
        if !self.function_to_scfg.contains_key(&predicate.during_function) {
            return Err(Error::unknown_function(predicate.during_function));
        }

        let mut out = Vec::new();
        for site in sites {
            let next = match predicate.kind {
                PredicateKind::Changes(sym) => self.searcher.next_states_changing(sym, site),
                PredicateKind::Calls(f) => self.searcher.next_states_calling(f, site),
            };
            out.extend(next);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icftl_ast::{Expr as AstExpr, Function, Location, Stmt};
    use icftl_spec::{AtomicConstraint, Comparison, Constraint, Predicate};

    fn loc(line: usize) -> Location {
        Location { line }
    }

    fn build_map() -> AHashMap<Id, Scfg> {
        let f = Function {
            name: Id::new("f"),
            body: vec![
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("x"))],
                    value: AstExpr::Literal,
                    loc: loc(1),
                },
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("y"))],
                    value: AstExpr::Literal,
                    loc: loc(2),
                },
            ],
        };
        let mut map = AHashMap::default();
        map.insert(f.name, Scfg::build(&f));
        map
    }

    #[test]
    fn unknown_function_in_a_predicate_is_a_resolution_failure_at_construction() {
        let map = build_map();
        let v = Id::new("v");
        let predicate = Predicate::changes(Id::new("x"), Id::new("does_not_exist"));
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(v)],
            comparison: Comparison::Lt,
            constant: 100.0,
            absolute_difference: false,
        });
        let spec = icftl_spec::SpecificationBuilder::new()
            .forall(v, predicate)
            .unwrap()
            .check(constraint)
            .unwrap();

        assert!(Analyser::new(&spec, &map).is_err());
    }

    #[test]
    fn single_quantifier_single_binding() {
        let map = build_map();
        let f = Id::new("f");
        let v = Id::new("v");
        let predicate = Predicate::changes(Id::new("x"), f);
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(v)],
            comparison: Comparison::Lt,
            constant: 100.0,
            absolute_difference: false,
        });
        let spec = icftl_spec::SpecificationBuilder::new()
            .forall(v, predicate)
            .unwrap()
            .check(constraint)
            .unwrap();

        let analyser = Analyser::new(&spec, &map).unwrap();
        let (bindings, tree) = analyser.compute_instrumentation_points().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(tree[&0][&0][&0].len(), 1);
    }

    #[test]
    fn next_expression_resolves_forward_to_next_matching_change() {
        let f = Id::new("f");
        let function = Function {
            name: f,
            body: vec![
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("x"))],
                    value: AstExpr::Literal,
                    loc: loc(1),
                },
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("y"))],
                    value: AstExpr::Literal,
                    loc: loc(2),
                },
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("x"))],
                    value: AstExpr::Literal,
                    loc: loc(3),
                },
            ],
        };
        let mut map = AHashMap::default();
        map.insert(f, Scfg::build(&function));

        let v = Id::new("v");
        let predicate = Predicate::changes(Id::new("x"), f);
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(v).next(icftl_spec::Predicate::changes(Id::new("x"), f))],
            comparison: Comparison::Lt,
            constant: 100.0,
            absolute_difference: false,
        });
        let spec = icftl_spec::SpecificationBuilder::new()
            .forall(v, predicate)
            .unwrap()
            .check(constraint)
            .unwrap();

        let analyser = Analyser::new(&spec, &map).unwrap();
        let (bindings, tree) = analyser.compute_instrumentation_points().unwrap();
        // v binds only to the first x-changing state (line 1); `next`
        // should locate the second one (line 3).
        assert_eq!(bindings.len(), 1);
        let sites = &tree[&0][&0][&0];
        assert_eq!(sites.len(), 1);
    }

    /// `q` is bound by a `changes` predicate, but `q.next(calls('g').during(F))`
    /// must look forward for
    /// the next *call* site, not the next change site — exercising that
    /// `next`'s predicate is independent of the one that bound its operand.
    #[test]
    fn next_with_a_different_predicate_than_the_binding_looks_for_calls() {
        let f = Id::new("F");
        let function = Function {
            name: f,
            body: vec![
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("a"))],
                    value: AstExpr::Literal,
                    loc: loc(1),
                },
                Stmt::Assign {
                    targets: vec![AstExpr::Name(Id::new("a"))],
                    value: AstExpr::Literal,
                    loc: loc(2),
                },
                Stmt::Expr {
                    value: AstExpr::Call {
                        function: Id::new("g"),
                        args: vec![],
                    },
                    loc: loc(3),
                },
            ],
        };
        let mut map = AHashMap::default();
        map.insert(f, Scfg::build(&function));

        let q = Id::new("q");
        let binding_predicate = Predicate::changes(Id::new("a"), f);
        let next_predicate = Predicate::calls(Id::new("g"), f);
        let constraint = Constraint::Atom(AtomicConstraint {
            expressions: vec![Expression::concrete_state(q).next(next_predicate).duration()],
            comparison: Comparison::Lt,
            constant: 1.0,
            absolute_difference: true,
        });
        let spec = icftl_spec::SpecificationBuilder::new()
            .forall(q, binding_predicate)
            .unwrap()
            .check(constraint)
            .unwrap();

        assert_eq!(spec.function_names_used(), vec![f]);
        let analyser = Analyser::new(&spec, &map).unwrap();
        let (bindings, tree) = analyser.compute_instrumentation_points().unwrap();
        // q binds to both `a`-changing states (line 1 and line 2); for each,
        // `next(calls('g'))` must resolve to the single call site at line 3,
        // not to the other `a`-changing state.
        assert_eq!(bindings.len(), 2);
        for binding_index in 0..bindings.len() {
            let before_sites = &tree[&binding_index][&0][&0];
            let after_sites = &tree[&binding_index][&0][&1];
            assert_eq!(before_sites.len(), 1);
            assert_eq!(after_sites.len(), 1);
            assert_eq!(before_sites[0], after_sites[0]);
        }
    }
}
