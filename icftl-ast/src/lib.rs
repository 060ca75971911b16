//! The statement-tree data model the symbolic control-flow graph builder
//! consumes.
//!
//! This crate does not parse source code: it only fixes the shape a front
//! end (of any source language) must reify its program into before
//! [`icftl_scfg`](../icftl_scfg/index.html) can build a control-flow graph
//! from it. A real front end is treated as an external collaborator, per
//! the framework's scope.

use icftl_utils::Id;

/// A source location, used only to label instrumentation points; it plays
/// no role in any of the framework's decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
}

/// An expression appearing on the right-hand side of an assignment, as the
/// sole content of an expression statement, or as a loop/conditional guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// A bare name reference, e.g. `x`.
    Name(Id),
    /// A call `f(args...)`.
    Call { function: Id, args: Vec<Expr> },
    /// A literal constant; contributes no symbols.
    Literal,
    /// Any other compound expression (binary/unary operators, attribute
    /// access, etc) that is not itself name- or call-bearing at the top
    /// level, but whose operands must still be walked for symbol
    /// extraction.
    Compound(Vec<Expr>),
}

impl Expr {
    /// Pre-order walk collecting every [`Id`] referenced as a bare name
    /// anywhere in this expression, used for bare expression statements.
    pub fn names(&self) -> Vec<Id> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut Vec<Id>) {
        match self {
            Expr::Name(id) => out.push(*id),
            Expr::Call { args, .. } => {
                for a in args {
                    a.collect_names(out);
                }
            }
            Expr::Compound(parts) => {
                for p in parts {
                    p.collect_names(out);
                }
            }
            Expr::Literal => {}
        }
    }

    /// Function names this expression calls, at any depth.
    pub fn called_functions(&self) -> Vec<Id> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls(&self, out: &mut Vec<Id>) {
        match self {
            Expr::Call { function, args } => {
                out.push(*function);
                for a in args {
                    a.collect_calls(out);
                }
            }
            Expr::Compound(parts) => {
                for p in parts {
                    p.collect_calls(out);
                }
            }
            Expr::Name(_) | Expr::Literal => {}
        }
    }
}

/// A single statement in the target program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `target = value`. `target` names the symbols it binds (simple names,
    /// tuple-unpacking targets, attribute targets all contribute their
    /// name-bearing sub-trees).
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        loc: Location,
    },
    /// A bare expression statement, most commonly a call for side effect.
    Expr { value: Expr, loc: Location },
    /// `if test: body else: orelse`.
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        loc: Location,
    },
    /// `for target in iter: body`.
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        loc: Location,
    },
    /// `while test: body`.
    While {
        test: Expr,
        body: Vec<Stmt>,
        loc: Location,
    },
    /// `try: body except ...: handlers`.
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Vec<Stmt>>,
        loc: Location,
    },
}

impl Stmt {
    pub fn loc(&self) -> Location {
        match self {
            Stmt::Assign { loc, .. }
            | Stmt::Expr { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Try { loc, .. } => *loc,
        }
    }
}

/// A function body: a sequence of statements, together with the name it is
/// bound to in the function map the rest of the framework indexes by.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Id,
    pub body: Vec<Stmt>,
}
