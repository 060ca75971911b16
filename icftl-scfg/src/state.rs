use icftl_ast::Location;
use icftl_utils::Id;
use smallvec::SmallVec;

/// Index of a [`SymbolicStateData`] within its owning [`crate::Scfg`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolicStateId(pub(crate) usize);

/// The payload of a symbolic state, matching the taxonomy used throughout
/// the specification model and analyzer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolicStateKind {
    /// A symbolic state with no associated statement; used for the single
    /// entry state of a function with an empty body, and in place of a
    /// synthetic merge node where none is needed.
    Empty,
    /// A state corresponding to a single statement. `symbols` names every
    /// symbol the statement may change; `calls` names every function the
    /// statement's expression invokes.
    Statement {
        symbols: Vec<Id>,
        calls: Vec<Id>,
        loc: Location,
    },
    ConditionalEntry,
    ConditionalExit,
    /// The head of a `for` loop. Also a statement-like state: entering the
    /// loop binds the loop variable(s), named in `symbols`.
    ForLoopEntry { symbols: Vec<Id>, loc: Location },
    ForLoopExit,
    WhileLoopEntry,
    WhileLoopExit,
    TryEntry,
    TryExit,
}

impl SymbolicStateKind {
    /// Whether this state changes any symbols at all, i.e. whether it can
    /// ever satisfy a `changes(v)` predicate.
    pub fn is_statement_like(&self) -> bool {
        matches!(
            self,
            SymbolicStateKind::Statement { .. } | SymbolicStateKind::ForLoopEntry { .. }
        )
    }

    pub fn symbols(&self) -> &[Id] {
        match self {
            SymbolicStateKind::Statement { symbols, .. } => symbols,
            SymbolicStateKind::ForLoopEntry { symbols, .. } => symbols,
            _ => &[],
        }
    }

    pub fn calls(&self) -> &[Id] {
        match self {
            SymbolicStateKind::Statement { calls, .. } => calls,
            _ => &[],
        }
    }

    pub fn loc(&self) -> Option<icftl_ast::Location> {
        match self {
            SymbolicStateKind::Statement { loc, .. } => Some(*loc),
            SymbolicStateKind::ForLoopEntry { loc, .. } => Some(*loc),
            _ => None,
        }
    }
}

/// A node in a [`crate::Scfg`]: a symbolic state plus the adjacency lists
/// that make the graph navigable in both directions, keeping an
/// `add_child`/`add_parent` pairing consistent on every edge insertion.
#[derive(Clone, Debug)]
pub struct SymbolicStateData {
    pub kind: SymbolicStateKind,
    pub(crate) children: SmallVec<[SymbolicStateId; 4]>,
    pub(crate) parents: SmallVec<[SymbolicStateId; 4]>,
}

impl SymbolicStateData {
    pub fn new(kind: SymbolicStateKind) -> Self {
        SymbolicStateData {
            kind,
            children: SmallVec::new(),
            parents: SmallVec::new(),
        }
    }

    pub fn children(&self) -> &[SymbolicStateId] {
        &self.children
    }

    pub fn parents(&self) -> &[SymbolicStateId] {
        &self.parents
    }

    pub fn is_statement_symbolic_state(&self) -> bool {
        self.kind.is_statement_like()
    }
}
