mod builder;
mod search;
mod state;

pub use builder::Scfg;
pub use search::{Predicate, PredicateKind, SCFGSearcher, Site};
pub use state::{SymbolicStateData, SymbolicStateId, SymbolicStateKind};
