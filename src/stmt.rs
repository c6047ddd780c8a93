use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration: named functions, lambdas (no name),
/// methods, and getters (no parameter list) all share this shape.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
    pub is_getter: bool,
}

#[derive(Debug)]
pub enum Stmt {
    Expression(Expr),

    // let a = 1, b, c = f();
    Let {
        declarations: Vec<(Token, Option<Expr>)>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Break {
        keyword: Token,
    },

    Continue {
        keyword: Token,
    },

    // Desugaring aid for 'for' loops: consumes a continue signal so the
    // increment that follows it in the surrounding block still runs.
    TryCatchContinue {
        body: Box<Stmt>,
    },

    Class {
        name: Token,
        superclass: Option<Expr>,
        instance_methods: Vec<Rc<FunctionDecl>>,
        class_methods: Vec<Rc<FunctionDecl>>,
    },
}
