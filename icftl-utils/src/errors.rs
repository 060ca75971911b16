//! Errors raised while building a specification or resolving it against a
//! symbolic control-flow graph.

use crate::Id;

/// Convenience wrapper for success or a meaningful setup-time error.
pub type IcftlResult<T> = std::result::Result<T, Error>;

/// Errors generated while building specifications and SCFGs, and while
/// statically analyzing a specification against a function map.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{post}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn malformed_specification<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::MalformedSpecification(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn unresolved_predicate<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnresolvedPredicate(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn unknown_function(name: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnknownFunction(name)),
            post_msg: None,
        }
    }

    pub fn undefined_variable(name: Id) -> Self {
        Self {
            kind: Box::new(ErrorKind::UndefinedVariable(name)),
            post_msg: None,
        }
    }

    pub fn incomplete_constraint<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::IncompleteConstraint(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Misc(msg.to_string())),
            post_msg: None,
        }
    }
}

#[derive(Clone)]
enum ErrorKind {
    /// The specification tree violates a structural invariant (e.g. a
    /// `future` missing on a non-outermost quantifier).
    MalformedSpecification(String),
    /// A predicate could not be resolved to any symbolic state.
    UnresolvedPredicate(String),
    /// A function name used in a specification has no corresponding SCFG.
    UnknownFunction(Id),
    /// A quantified variable was referenced before being bound.
    UndefinedVariable(Id),
    /// A conjunction/disjunction/negation was built with missing operands.
    IncompleteConstraint(String),
    /// Miscellaneous error message.
    Misc(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            MalformedSpecification(msg) => write!(f, "Malformed specification: {msg}"),
            UnresolvedPredicate(msg) => write!(f, "Unresolved predicate: {msg}"),
            UnknownFunction(name) => write!(f, "Unknown function: {name}"),
            UndefinedVariable(name) => write!(f, "Undefined variable: {name}"),
            IncompleteConstraint(msg) => write!(f, "Incomplete constraint: {msg}"),
            Misc(msg) => write!(f, "{msg}"),
        }
    }
}
