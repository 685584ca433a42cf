//! Statement AST nodes

use super::{Expr, Span, Spanned};
use serde::{Deserialize, Serialize};

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression evaluated for its side effects
    Expression(Spanned<Expr>),

    /// print expr;
    Print(Spanned<Expr>),

    /// var name = initializer; (initializer defaults to nil)
    Var {
        name: String,
        initializer: Option<Spanned<Expr>>,
    },

    /// { statements } in a child scope
    Block(Vec<Spanned<Stmt>>),

    /// if (condition) then_branch else else_branch
    If {
        condition: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        else_branch: Option<Box<Spanned<Stmt>>>,
    },

    /// while (condition) body
    While {
        condition: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    /// for (initializer; condition; increment) body
    ///
    /// Initializer, condition and increment run in the statement's own
    /// child scope; the body block scopes each iteration.
    For {
        initializer: Option<Box<Spanned<Stmt>>>,
        condition: Option<Spanned<Expr>>,
        increment: Option<Spanned<Expr>>,
        body: Box<Spanned<Stmt>>,
    },

    /// fun name(params) { body }
    Function(FunDecl),

    /// return expr; (expr defaults to nil)
    Return(Option<Spanned<Expr>>),

    /// class Name < Superclass { methods }
    Class {
        name: String,
        superclass: Option<Spanned<String>>,
        methods: Vec<FunDecl>,
    },
}

/// Function declaration, also used for class methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}
