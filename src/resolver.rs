//! Static resolution pass for the Flint interpreter.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<String,bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function.
//! 2. **Enforce static rules**: reports errors such as redeclaration in the
//!    same scope, reading a variable in its own initializer, invalid `return`
//!    outside functions, `break`/`continue` outside loops, and illegal use of
//!    `this` or `super` outside of class methods.
//! 3. **Record binding distances**: for every variable occurrence
//!    (`Expr::Variable`, `Expr::Assign`, `Expr::This`, `Expr::Super`), calls
//!    back into the interpreter to note whether it is a local (and at what
//!    depth) or a global.  This enables the runtime to perform O(1) lookups
//!    by climbing exactly the right number of environment frames.
//!
//! Diagnostics accumulate across the whole tree; the caller decides whether
//! to gate execution on them.

use crate::error::FlintError;
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// What kind of callable are we inside?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Lambda,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    errors: Vec<FlintError>,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements, returning every diagnostic found.
    pub fn resolve(mut self, statements: &[Stmt]) -> Vec<FlintError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
        self.errors
    }

    fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        self.errors.push(FlintError::resolve(line, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Class {
                name,
                superclass,
                instance_methods,
                class_methods,
            } => {
                // 1. Self‑inheritance guard
                if let Some(Expr::Variable {
                    name: super_name, ..
                }) = superclass
                {
                    if super_name.lexeme == name.lexeme {
                        self.error(super_name.line, "A class can't inherit from itself.");
                    }
                }

                // 2. Declare & define the class name so methods can refer to it
                self.declare(name);
                self.define(name);

                // 3. Save and enter the class context
                let enclosing_class: ClassType = self.current_class;

                self.current_class = if superclass.is_some() {
                    ClassType::Subclass
                } else {
                    ClassType::Class
                };

                // 4. If there is a superclass, resolve it and bind `super`
                if let Some(super_expr) = superclass {
                    self.resolve_expr(super_expr);

                    self.begin_scope();
                    self.scopes
                        .last_mut()
                        .unwrap()
                        .insert("super".to_string(), true);
                }

                // 5. Open the implicit `this` scope for methods
                self.begin_scope();
                self.scopes
                    .last_mut()
                    .unwrap()
                    .insert("this".to_string(), true);

                // 6. Resolve each method in its own function context
                for method in class_methods.iter().chain(instance_methods.iter()) {
                    let kind: FunctionType = match &method.name {
                        Some(m_name) if m_name.lexeme == "init" => FunctionType::Initializer,
                        _ => FunctionType::Method,
                    };

                    self.resolve_function(method, kind);
                }

                // 7. Close the `this` scope, then the `super` scope if open
                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                // 8. Restore the outer class context
                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Let { declarations } => {
                // 1. Declare every name first so no initializer in the list
                //    can read a sibling (or itself) before it exists
                for (name, _initializer) in declarations {
                    self.declare(name);
                }

                // 2. Resolve initializers, then mark each name defined
                for (name, initializer) in declarations {
                    if let Some(expr) = initializer {
                        self.resolve_expr(expr);
                    }
                    self.define(name);
                }
            }

            Stmt::Function(declaration) => {
                if let Some(name) = &declaration.name {
                    // Declare & define up front to allow recursion
                    self.declare(name);
                    self.define(name);
                }

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::TryCatchContinue { body } => {
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                // 1. Ensure we're inside a function or method
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "Can't return from outside a function.");
                }

                // 2. In an initializer, only a bare `return;` is allowed
                if self.current_function == FunctionType::Initializer && value.is_some() {
                    self.error(keyword.line, "Can't return a value from an initializer.");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    self.error(keyword.line, "'break' used outside of a loop.");
                }
            }

            Stmt::Continue { keyword } => {
                if self.loop_depth == 0 {
                    self.error(keyword.line, "'continue' used outside of a loop.");
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {
                // Literals have no sub‑expressions
            }

            Expr::Grouping { expression } => {
                self.resolve_expr(expression);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { name, id } => {
                // Prevent reading a variable in its own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(
                            name.line,
                            format!(
                                "Cannot read local variable '{}' in its own initializer.",
                                name.lexeme
                            ),
                        );
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { name, value, id } => {
                // Resolve the right‑hand side first, then bind the assignment
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Lambda { function } => {
                self.resolve_function(function, FunctionType::Lambda);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::This { keyword, id } => {
                // 'this' only valid inside class methods
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Cannot use 'this' outside of a class.");
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::Super { keyword, id, .. } => {
                // 1. Disallow outside any class
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Cannot use 'super' outside of a class.");
                }
                // 2. Disallow in a class with no superclass
                else if self.current_class != ClassType::Subclass {
                    self.error(
                        keyword.line,
                        "Cannot use 'super' in a class with no superclass.",
                    );
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Array { elements } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            Expr::GetIndex { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }

            Expr::SetIndex {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    ///
    /// `kind` distinguishes plain functions, lambdas, methods, and
    /// initializers.
    fn resolve_function(&mut self, declaration: &Rc<FunctionDecl>, kind: FunctionType) {
        // 1. Getters only make sense as class members
        if declaration.is_getter && kind != FunctionType::Method {
            let line: usize = declaration.name.as_ref().map(|n| n.line).unwrap_or(0);
            self.error(line, "Use of a getter outside of a class.");
        }

        // 2. Save the enclosing contexts so we can restore them later.
        //    A loop outside the function must not legitimise a `break`
        //    inside it.
        let enclosing: FunctionType = self.current_function;
        let enclosing_loop_depth: usize = self.loop_depth;

        self.current_function = kind;
        self.loop_depth = 0;

        // 3. Begin a new lexical scope for the parameters & body.
        self.begin_scope();

        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        // 4. Restore the previous contexts.
        self.current_function = enclosing;
        self.loop_depth = enclosing_loop_depth;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        // In a local scope, ensure no duplicate declarations.  Globals may
        // redeclare freely.
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(FlintError::resolve(
                    name.line,
                    format!(
                        "Variable '{}' already declared in this scope.",
                        name.lexeme
                    ),
                ));
                return;
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at the depth of the nearest
    /// enclosing scope that declares it.  Names found in no scope are
    /// globals and get no entry.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
