use crate::builder::Scfg;
use crate::state::SymbolicStateId;
use ahash::AHashMap;
use icftl_utils::Id;

/// A symbolic state qualified by the function whose SCFG it belongs to:
/// the unit a [`SCFGSearcher`] hands back, since a bare [`SymbolicStateId`]
/// is only meaningful relative to one [`Scfg`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Site {
    pub function: Id,
    pub state: SymbolicStateId,
}

/// The kind of condition an atomic predicate resolves to a set of symbolic
/// states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredicateKind {
    Changes(Id),
    Calls(Id),
}

/// `changes(v).during(f)` / `calls(g).during(f)`, optionally wrapped in
/// `future(...)` to additionally require reachability from the previous
/// quantifier's binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub during_function: Id,
    pub future: bool,
}

impl Predicate {
    pub fn changes(variable: Id, during_function: Id) -> Self {
        Predicate {
            kind: PredicateKind::Changes(variable),
            during_function,
            future: false,
        }
    }

    pub fn calls(function: Id, during_function: Id) -> Self {
        Predicate {
            kind: PredicateKind::Calls(function),
            during_function,
            future: false,
        }
    }

    pub fn future(mut self) -> Self {
        self.future = true;
        self
    }
}

/// Resolves predicates against a map from function name to that function's
/// symbolic control-flow graph.
pub struct SCFGSearcher<'a> {
    function_to_scfg: &'a AHashMap<Id, Scfg>,
}

impl<'a> SCFGSearcher<'a> {
    pub fn new(function_to_scfg: &'a AHashMap<Id, Scfg>) -> Self {
        SCFGSearcher { function_to_scfg }
    }

    /// Resolve `predicate` to the set of qualifying sites, optionally
    /// restricted by reachability from `previous`.
    pub fn find_symbolic_states(&self, predicate: &Predicate, previous: Option<Site>) -> Vec<Site> {
        let Some(scfg) = self.function_to_scfg.get(&predicate.during_function) else {
            log::warn!(
                "predicate referenced unknown function `{}`",
                predicate.during_function
            );
            return Vec::new();
        };

        let candidates = match predicate.kind {
            PredicateKind::Changes(v) => scfg.states_changing(v),
            PredicateKind::Calls(g) => scfg.states_calling(g),
        };

        if !predicate.future {
            return candidates
                .into_iter()
                .map(|state| Site {
                    function: predicate.during_function,
                    state,
                })
                .collect();
        }

        match previous {
            // Same function as the previous binding: restrict to states
            // reachable from it.
            Some(prev) if prev.function == predicate.during_function => candidates
                .into_iter()
                .filter(|s| scfg.is_reachable_from(*s, prev.state))
                .map(|state| Site {
                    function: predicate.during_function,
                    state,
                })
                .collect(),
            // Different function, or no previous binding yet: a
            // cross-function reachability query has no SCFG to run it
            // against, so every candidate in the target function qualifies.
            _ => candidates
                .into_iter()
                .map(|state| Site {
                    function: predicate.during_function,
                    state,
                })
                .collect(),
        }
    }

    /// The next sites changing `symbol`, reachable by descending from
    /// `from`'s children within its own function's SCFG.
    pub fn next_states_changing(&self, symbol: Id, from: Site) -> Vec<Site> {
        let Some(scfg) = self.function_to_scfg.get(&from.function) else {
            return Vec::new();
        };
        scfg.next_states_changing(symbol, from.state)
            .into_iter()
            .map(|state| Site {
                function: from.function,
                state,
            })
            .collect()
    }

    pub fn next_states_calling(&self, function: Id, from: Site) -> Vec<Site> {
        let Some(scfg) = self.function_to_scfg.get(&from.function) else {
            return Vec::new();
        };
        scfg.next_states_calling(function, from.state)
            .into_iter()
            .map(|state| Site {
                function: from.function,
                state,
            })
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use icftl_ast::{Expr, Function, Location, Stmt};

    fn loc(line: usize) -> Location {
        Location { line }
    }

    fn demo_map() -> AHashMap<Id, Scfg> {
        let f = Function {
            name: Id::new("f"),
            body: vec![
                Stmt::Assign {
                    targets: vec![Expr::Name(Id::new("x"))],
                    value: Expr::Literal,
                    loc: loc(1),
                },
                Stmt::Expr {
                    value: Expr::Call {
                        function: Id::new("g"),
                        args: vec![],
                    },
                    loc: loc(2),
                },
            ],
        };
        let mut map = AHashMap::default();
        map.insert(f.name, Scfg::build(&f));
        map
    }

    #[test]
    fn resolves_changes_predicate_within_function() {
        let map = demo_map();
        let searcher = SCFGSearcher::new(&map);
        let pred = Predicate::changes(Id::new("x"), Id::new("f"));
        let sites = searcher.find_symbolic_states(&pred, None);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].function, Id::new("f"));
    }

    #[test]
    fn resolves_calls_predicate() {
        let map = demo_map();
        let searcher = SCFGSearcher::new(&map);
        let pred = Predicate::calls(Id::new("g"), Id::new("f"));
        let sites = searcher.find_symbolic_states(&pred, None);
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn future_restricts_to_reachable_states_in_same_function() {
        let map = demo_map();
        let searcher = SCFGSearcher::new(&map);
        let changes_x = Predicate::changes(Id::new("x"), Id::new("f"));
        let first = searcher.find_symbolic_states(&changes_x, None);
        let calls_g = Predicate::calls(Id::new("g"), Id::new("f")).future();
        let second = searcher.find_symbolic_states(&calls_g, Some(first[0]));
        assert_eq!(second.len(), 1);
    }
}
