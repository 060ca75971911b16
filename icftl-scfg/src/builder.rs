use crate::state::{SymbolicStateData, SymbolicStateId, SymbolicStateKind};
use ahash::AHashSet;
use icftl_ast::{Expr, Function, Stmt};
use icftl_utils::Id;

/// An arena-allocated symbolic control-flow graph for a single function.
///
/// Nodes are addressed by stable [`SymbolicStateId`] indices rather than
/// linked via `Rc`/`RefCell`, since loops introduce back-edges that would
/// otherwise require cyclic ownership.
#[derive(Clone, Debug)]
pub struct Scfg {
    pub(crate) arena: Vec<SymbolicStateData>,
    entry: SymbolicStateId,
}

impl Scfg {
    /// Build the symbolic control-flow graph for `function`'s body.
    pub fn build(function: &Function) -> Self {
        log::debug!("building SCFG for function `{}`", function.name);
        let mut scfg = Scfg {
            arena: Vec::new(),
            entry: SymbolicStateId(0),
        };
        let (first, _last) = scfg.build_stmt_list(&function.body);
        scfg.entry = first;
        scfg
    }

    pub fn entry(&self) -> SymbolicStateId {
        self.entry
    }

    pub fn get(&self, id: SymbolicStateId) -> &SymbolicStateData {
        &self.arena[id.0]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All state ids in the graph, in arena (insertion) order.
    pub fn states(&self) -> impl Iterator<Item = SymbolicStateId> + '_ {
        (0..self.arena.len()).map(SymbolicStateId)
    }

    fn push(&mut self, kind: SymbolicStateKind) -> SymbolicStateId {
        let id = SymbolicStateId(self.arena.len());
        self.arena.push(SymbolicStateData::new(kind));
        id
    }

    fn link(&mut self, from: SymbolicStateId, to: SymbolicStateId) {
        self.arena[from.0].children.push(to);
        self.arena[to.0].parents.push(from);
    }

    /// Build the chain of states for a statement list, returning the first
    /// state and every state that can be the *last* one executed (plural
    /// because a trailing branch may have more than one exit edge collapsed
    /// into a single merge node, which is itself the sole "last" state).
    fn build_stmt_list(&mut self, stmts: &[Stmt]) -> (SymbolicStateId, SymbolicStateId) {
        if stmts.is_empty() {
            let id = self.push(SymbolicStateKind::Empty);
            return (id, id);
        }
        let mut first = None;
        let mut prev: Option<SymbolicStateId> = None;
        for stmt in stmts {
            let (stmt_first, stmt_last) = self.build_stmt(stmt);
            if first.is_none() {
                first = Some(stmt_first);
            }
            if let Some(p) = prev {
                self.link(p, stmt_first);
            }
            prev = Some(stmt_last);
        }
        (first.unwrap(), prev.unwrap())
    }

    fn build_stmt(&mut self, stmt: &Stmt) -> (SymbolicStateId, SymbolicStateId) {
        match stmt {
            Stmt::Assign {
                targets,
                value,
                loc,
            } => {
                let mut symbols: Vec<Id> = Vec::new();
                for t in targets {
                    symbols.extend(t.names());
                }
                let calls = value.called_functions();
                let id = self.push(SymbolicStateKind::Statement {
                    symbols,
                    calls,
                    loc: *loc,
                });
                (id, id)
            }
            Stmt::Expr { value, loc } => {
                let symbols = value.names();
                let calls = value.called_functions();
                let id = self.push(SymbolicStateKind::Statement {
                    symbols,
                    calls,
                    loc: *loc,
                });
                (id, id)
            }
            Stmt::If {
                body, orelse, loc, ..
            } => self.build_conditional(body, orelse, *loc),
            Stmt::For {
                target, body, loc, ..
            } => self.build_for(target, body, *loc),
            Stmt::While { body, loc, .. } => self.build_while(body, *loc),
            Stmt::Try {
                body,
                handlers,
                loc,
                ..
            } => self.build_try(body, handlers, *loc),
        }
    }

    fn build_conditional(
        &mut self,
        body: &[Stmt],
        orelse: &[Stmt],
        _loc: icftl_ast::Location,
    ) -> (SymbolicStateId, SymbolicStateId) {
        let entry = self.push(SymbolicStateKind::ConditionalEntry);
        let exit = self.push(SymbolicStateKind::ConditionalExit);

        let (body_first, body_last) = self.build_stmt_list(body);
        self.link(entry, body_first);
        self.link(body_last, exit);

        if orelse.is_empty() {
            // No synthetic else node: the entry links directly to the exit.
            self.link(entry, exit);
        } else {
            let (orelse_first, orelse_last) = self.build_stmt_list(orelse);
            self.link(entry, orelse_first);
            self.link(orelse_last, exit);
        }

        (entry, exit)
    }

    fn build_for(
        &mut self,
        target: &Expr,
        body: &[Stmt],
        loc: icftl_ast::Location,
    ) -> (SymbolicStateId, SymbolicStateId) {
        let symbols = target.names();
        let entry = self.push(SymbolicStateKind::ForLoopEntry { symbols, loc });
        let exit = self.push(SymbolicStateKind::ForLoopExit);

        let (body_first, body_last) = self.build_stmt_list(body);
        self.link(entry, body_first);
        self.link(body_last, entry); // back-edge: loop repeats
        self.link(entry, exit); // loop may terminate without another iteration

        (entry, exit)
    }

    fn build_while(
        &mut self,
        body: &[Stmt],
        _loc: icftl_ast::Location,
    ) -> (SymbolicStateId, SymbolicStateId) {
        let entry = self.push(SymbolicStateKind::WhileLoopEntry);
        let exit = self.push(SymbolicStateKind::WhileLoopExit);

        let (body_first, body_last) = self.build_stmt_list(body);
        self.link(entry, body_first);
        self.link(body_last, entry);
        self.link(entry, exit);

        (entry, exit)
    }

    fn build_try(
        &mut self,
        body: &[Stmt],
        handlers: &[Vec<Stmt>],
        _loc: icftl_ast::Location,
    ) -> (SymbolicStateId, SymbolicStateId) {
        let entry = self.push(SymbolicStateKind::TryEntry);
        let exit = self.push(SymbolicStateKind::TryExit);

        let (body_first, body_last) = self.build_stmt_list(body);
        self.link(entry, body_first);
        self.link(body_last, exit);

        // An exception may occur at any point within the try body, so every
        // handler is reachable directly from the entry.
        for handler in handlers {
            let (h_first, h_last) = self.build_stmt_list(handler);
            self.link(entry, h_first);
            self.link(h_last, exit);
        }

        (entry, exit)
    }

    // ----- queries -----

    /// Every state whose statement may change `symbol`.
    pub fn states_changing(&self, symbol: Id) -> Vec<SymbolicStateId> {
        self.states()
            .filter(|id| self.get(*id).kind.symbols().contains(&symbol))
            .collect()
    }

    /// Every state whose statement calls `function`.
    pub fn states_calling(&self, function: Id) -> Vec<SymbolicStateId> {
        self.states()
            .filter(|id| self.get(*id).kind.calls().contains(&function))
            .collect()
    }

    /// Every state reachable from `from`, excluding `from` itself, via a
    /// breadth-first traversal of the `children` adjacency.
    pub fn reachable(&self, from: SymbolicStateId) -> Vec<SymbolicStateId> {
        let mut visited: AHashSet<SymbolicStateId> = AHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        visited.insert(from);
        queue.push_back(from);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for &child in self.get(current).children() {
                if visited.insert(child) {
                    out.push(child);
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// States reachable from `from` that also change `symbol`.
    pub fn reachable_states_changing(&self, symbol: Id, from: SymbolicStateId) -> Vec<SymbolicStateId> {
        self.reachable(from)
            .into_iter()
            .filter(|id| self.get(*id).kind.symbols().contains(&symbol))
            .collect()
    }

    /// Whether `target` is reachable from `from`.
    pub fn is_reachable_from(&self, target: SymbolicStateId, from: SymbolicStateId) -> bool {
        self.reachable(from).contains(&target)
    }

    /// The next states changing `symbol` reachable by descending from
    /// `from`'s children, stopping descent at the first matching
    /// `Statement`-like state found along each path.
    ///
    /// A single global `encountered` set (rather than a per-path visited
    /// list) guards every recursive call, so the traversal terminates even
    /// when a back-edge revisits a state that does not itself match.
    pub fn next_states_changing(&self, symbol: Id, from: SymbolicStateId) -> Vec<SymbolicStateId> {
        let mut encountered: AHashSet<SymbolicStateId> = AHashSet::default();
        let mut out = Vec::new();
        for &child in self.get(from).children() {
            self.next_states_changing_rec(symbol, child, &mut encountered, &mut out);
        }
        out
    }

    /// The next states calling `function`, symmetric to
    /// [`Scfg::next_states_changing`] but filtering on called functions
    /// rather than changed symbols.
    pub fn next_states_calling(&self, function: Id, from: SymbolicStateId) -> Vec<SymbolicStateId> {
        let mut encountered: AHashSet<SymbolicStateId> = AHashSet::default();
        let mut out = Vec::new();
        for &child in self.get(from).children() {
            self.next_states_calling_rec(function, child, &mut encountered, &mut out);
        }
        out
    }

    fn next_states_calling_rec(
        &self,
        function: Id,
        current: SymbolicStateId,
        encountered: &mut AHashSet<SymbolicStateId>,
        out: &mut Vec<SymbolicStateId>,
    ) {
        if !encountered.insert(current) {
            return;
        }
        let data = self.get(current);
        if data.kind.calls().contains(&function) {
            out.push(current);
            return;
        }
        for &child in data.children() {
            self.next_states_calling_rec(function, child, encountered, out);
        }
    }

    fn next_states_changing_rec(
        &self,
        symbol: Id,
        current: SymbolicStateId,
        encountered: &mut AHashSet<SymbolicStateId>,
        out: &mut Vec<SymbolicStateId>,
    ) {
        if !encountered.insert(current) {
            return;
        }
        let data = self.get(current);
        if data.kind.is_statement_like() && data.kind.symbols().contains(&symbol) {
            out.push(current);
            return;
        }
        for &child in data.children() {
            self.next_states_changing_rec(symbol, child, encountered, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icftl_ast::{Location, Stmt};

    fn loc(line: usize) -> Location {
        Location { line }
    }

    fn assign(name: &str, line: usize) -> Stmt {
        Stmt::Assign {
            targets: vec![Expr::Name(Id::new(name))],
            value: Expr::Literal,
            loc: loc(line),
        }
    }

    #[test]
    fn linear_chain_links_statements_in_order() {
        let f = Function {
            name: Id::new("f"),
            body: vec![assign("x", 1), assign("y", 2)],
        };
        let scfg = Scfg::build(&f);
        assert_eq!(scfg.len(), 2);
        let first = scfg.entry();
        assert_eq!(scfg.get(first).children().len(), 1);
        let x_states = scfg.states_changing(Id::new("x"));
        let y_states = scfg.states_changing(Id::new("y"));
        assert_eq!(x_states.len(), 1);
        assert_eq!(y_states.len(), 1);
        assert!(scfg.is_reachable_from(y_states[0], x_states[0]));
    }

    #[test]
    fn conditional_with_empty_else_merges_directly() {
        let f = Function {
            name: Id::new("f"),
            body: vec![Stmt::If {
                test: Expr::Literal,
                body: vec![assign("x", 2)],
                orelse: vec![],
                loc: loc(1),
            }],
        };
        let scfg = Scfg::build(&f);
        let entry = scfg.entry();
        // entry has two children: the body's first statement, and the exit directly.
        assert_eq!(scfg.get(entry).children().len(), 2);
    }

    #[test]
    fn for_loop_has_back_edge_and_terminates_next_states_changing() {
        let f = Function {
            name: Id::new("f"),
            body: vec![
                Stmt::For {
                    target: Expr::Name(Id::new("i")),
                    iter: Expr::Literal,
                    body: vec![assign("acc", 2)],
                    loc: loc(1),
                },
                assign("done", 3),
            ],
        };
        let scfg = Scfg::build(&f);
        let entry = scfg.entry();
        // should terminate despite the back-edge
        let next_acc = scfg.next_states_changing(Id::new("acc"), entry);
        assert_eq!(next_acc.len(), 1);
        let next_done = scfg.next_states_changing(Id::new("done"), entry);
        assert_eq!(next_done.len(), 1);
    }
}
