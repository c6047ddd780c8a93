use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::array::FlintArray;
use crate::class::FlintClass;
use crate::environment::Environment;
use crate::error::FlintError;
use crate::expr::{Expr, ExprId, LiteralExpr};
use crate::function::FlintFunction;
use crate::native::{register_globals, OutputSink};
use crate::stmt::{FunctionDecl, Stmt};
use crate::string::FlintString;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Out-of-band signal unwinding the execution stack.  `Return` is caught at
/// function boundaries, `Break`/`Continue` at the enclosing loop (or the
/// for-loop's continue catcher).  A signal nobody catches degrades to a
/// runtime error; it must never reach the user as-is.
pub enum Unwind {
    Error(FlintError),
    Return(Value),
    Break { line: usize },
    Continue { line: usize },
}

impl From<FlintError> for Unwind {
    fn from(e: FlintError) -> Self {
        Unwind::Error(e)
    }
}

type ExecResult = Result<(), Unwind>;
type EvalResult = Result<Value, Unwind>;

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: OutputSink,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Builds an interpreter writing through the given sink; tests hand in
    /// a buffer to observe `print` output.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let output: OutputSink = Rc::new(RefCell::new(output));

        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));
        register_globals(&mut globals.borrow_mut(), Rc::clone(&output));

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Records a resolved binding distance for an expression.  Called by the
    /// resolver; names it never records are globals.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Recording local {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    pub fn output(&self) -> OutputSink {
        Rc::clone(&self.output)
    }

    /// Executes a program.  A runtime error aborts the statement it occurred
    /// in, gets reported to stderr, and execution moves on to the next
    /// top-level statement.  Returns whether the whole run was clean.
    pub fn interpret(&mut self, statements: &[Stmt]) -> bool {
        let mut clean: bool = true;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => {
                    eprintln!("{}", e);
                    clean = false;
                }

                Err(Unwind::Return(_)) => {
                    eprintln!(
                        "{}",
                        FlintError::runtime(0, "'return' used outside of a function.")
                    );
                    clean = false;
                }

                Err(Unwind::Break { line }) => {
                    eprintln!(
                        "{}",
                        FlintError::runtime(line, "'break' used outside of a loop.")
                    );
                    clean = false;
                }

                Err(Unwind::Continue { line }) => {
                    eprintln!(
                        "{}",
                        FlintError::runtime(line, "'continue' used outside of a loop.")
                    );
                    clean = false;
                }
            }
        }

        clean
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Let { declarations } => {
                for (name, initializer) in declarations {
                    let value: Value = match initializer {
                        Some(expr) => self.evaluate(expr)?,
                        None => Value::Null,
                    };

                    self.environment.borrow_mut().define(&name.lexeme, value);
                }

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment: Rc<RefCell<Environment>> = Rc::new(RefCell::new(
                    Environment::with_enclosing(Rc::clone(&self.environment)),
                ));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}

                        Err(Unwind::Break { .. }) => break,

                        Err(Unwind::Continue { .. }) => continue,

                        Err(other) => return Err(other),
                    }
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function: Rc<FlintFunction> = FlintFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                let name: &Token = declaration
                    .name
                    .as_ref()
                    .expect("named function declaration without a name");

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(function));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nothing,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Break { keyword } => Err(Unwind::Break { line: keyword.line }),

            Stmt::Continue { keyword } => Err(Unwind::Continue { line: keyword.line }),

            Stmt::TryCatchContinue { body } => match self.execute(body) {
                // Consume the signal so the for-loop increment still runs.
                Err(Unwind::Continue { .. }) => Ok(()),

                other => other,
            },

            Stmt::Class {
                name,
                superclass,
                instance_methods,
                class_methods,
            } => self.execute_class(name, superclass, instance_methods, class_methods),
        }
    }

    /// Runs statements inside the given environment, restoring the previous
    /// one on every exit path, signalled unwinds included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> ExecResult {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        self.environment = environment;

        let mut result: ExecResult = Ok(());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                result = Err(e);
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: &Option<Expr>,
        instance_methods: &[Rc<FunctionDecl>],
        class_methods: &[Rc<FunctionDecl>],
    ) -> ExecResult {
        let superclass: Option<Rc<FlintClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(FlintError::runtime(name.line, "Superclass must be a class.").into())
                }
            },

            None => None,
        };

        // Placeholder binding so methods can close over the class name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Null);

        // Methods capture the scope where 'super' (if any) is bound.
        let method_closure: Rc<RefCell<Environment>> = match &superclass {
            Some(superclass) => {
                let mut environment: Environment =
                    Environment::with_enclosing(Rc::clone(&self.environment));
                environment.define("super", Value::Class(Rc::clone(superclass)));
                Rc::new(RefCell::new(environment))
            }

            None => Rc::clone(&self.environment),
        };

        let mut instance_table: HashMap<String, Rc<FlintFunction>> = HashMap::new();
        for declaration in instance_methods {
            let method_name: String = declaration
                .name
                .as_ref()
                .expect("class method without a name")
                .lexeme
                .clone();

            let is_initializer: bool = method_name == "init";

            instance_table.insert(
                method_name,
                FlintFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&method_closure),
                    is_initializer,
                ),
            );
        }

        let mut class_table: HashMap<String, Rc<FlintFunction>> = HashMap::new();
        for declaration in class_methods {
            let method_name: String = declaration
                .name
                .as_ref()
                .expect("class method without a name")
                .lexeme
                .clone();

            class_table.insert(
                method_name,
                FlintFunction::new(Rc::clone(declaration), Rc::clone(&method_closure), false),
            );
        }

        let class: Rc<FlintClass> = FlintClass::new(
            name.lexeme.clone(),
            superclass,
            instance_table,
            class_table,
        );

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal { value } => Ok(match value {
                LiteralExpr::Nothing => Value::Nothing,
                LiteralExpr::Bool(b) => Value::Bool(*b),
                LiteralExpr::Number(n) => Value::Number(*n),
                LiteralExpr::Str(s) => Value::Str(FlintString::new(s.clone())),
            }),

            Expr::Grouping { expression } => self.evaluate(expression),

            Expr::Unary { op, right } => self.evaluate_unary(op, right),

            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),

            Expr::Logical { left, op, right } => {
                let left_val: Value = self.evaluate(left)?;

                // Short-circuit: hand back the deciding operand untouched.
                if op.token_type == TokenType::OR {
                    if left_val.is_truthy() {
                        return Ok(left_val);
                    }
                } else if !left_val.is_truthy() {
                    return Ok(left_val);
                }

                self.evaluate(right)
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { name, id } => self.look_up_variable(name, *id),

            Expr::Assign { name, value, id } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        self.environment.borrow_mut().assign_at(
                            *distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Lambda { function } => Ok(Value::Function(FlintFunction::new(
                Rc::clone(function),
                Rc::clone(&self.environment),
                false,
            ))),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee, args, paren)
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Str(s) => Ok(s.get_builtin(name)?),

                    Value::Array(a) => Ok(a.get_builtin(name)?),

                    Value::Class(c) => Ok(c.get(name)?),

                    Value::Instance(i) => Ok(i.get(name, self)?),

                    _ => Err(FlintError::runtime(
                        name.line,
                        "Only instances, strings, or arrays have properties.",
                    )
                    .into()),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;
                        instance.set(name, value.clone());
                        Ok(value)
                    }

                    _ => Err(FlintError::runtime(name.line, "Only instances have fields.").into()),
                }
            }

            Expr::This { keyword, id } => self.look_up_variable(keyword, *id),

            Expr::Super {
                keyword,
                method,
                id,
            } => self.evaluate_super(keyword, method, *id),

            Expr::Array { elements } => {
                let mut values: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }

                Ok(Value::Array(FlintArray::new(values)))
            }

            Expr::GetIndex {
                object,
                index,
                bracket,
            } => self.evaluate_get_index(object, index, bracket),

            Expr::SetIndex {
                object,
                index,
                value,
                bracket,
            } => self.evaluate_set_index(object, index, value, bracket),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> EvalResult {
        let value: Value = self.evaluate(right)?;

        match op.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(FlintError::runtime(op.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => Err(FlintError::runtime(op.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> EvalResult {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match op.token_type {
            // The comma operator evaluates both sides, yields the right.
            TokenType::COMMA => Ok(right_val),

            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                _ if matches!(left_val, Value::Str(_)) || matches!(right_val, Value::Str(_)) => {
                    let concatenated: String = format!("{}{}", left_val, right_val);
                    Ok(Value::Str(FlintString::new(concatenated)))
                }

                _ => Err(FlintError::runtime(
                    op.line,
                    "Operands to '+' must be both numbers or at least one string.",
                )
                .into()),
            },

            TokenType::MINUS => {
                let (a, b) = self.number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = self.number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = self.number_operands(op, &left_val, &right_val)?;

                if b == 0.0 {
                    return Err(FlintError::runtime(op.line, "Division by zero.").into());
                }

                Ok(Value::Number(a / b))
            }

            TokenType::MODULO => {
                let (a, b) = self.number_operands(op, &left_val, &right_val)?;

                if b == 0.0 {
                    return Err(FlintError::runtime(op.line, "Division by zero.").into());
                }

                Ok(Value::Number(a % b))
            }

            TokenType::GREATER => self.compare(op, &left_val, &right_val, |o| {
                o == std::cmp::Ordering::Greater
            }),

            TokenType::GREATER_EQUAL => self.compare(op, &left_val, &right_val, |o| {
                o != std::cmp::Ordering::Less
            }),

            TokenType::LESS => {
                self.compare(op, &left_val, &right_val, |o| o == std::cmp::Ordering::Less)
            }

            TokenType::LESS_EQUAL => self.compare(op, &left_val, &right_val, |o| {
                o != std::cmp::Ordering::Greater
            }),

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(FlintError::runtime(op.line, "Invalid binary operator.").into()),
        }
    }

    /// Ordering comparisons work on two numbers or two strings.
    fn compare(
        &self,
        op: &Token,
        left: &Value,
        right: &Value,
        decide: fn(std::cmp::Ordering) -> bool,
    ) -> EvalResult {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
                Some(ordering) => Ok(Value::Bool(decide(ordering))),
                None => Ok(Value::Bool(false)),
            },

            (Value::Str(a), Value::Str(b)) => {
                let ordering = a.text.borrow().cmp(&b.text.borrow());
                Ok(Value::Bool(decide(ordering)))
            }

            _ => Err(FlintError::runtime(
                op.line,
                "Operands must be two numbers or two strings.",
            )
            .into()),
        }
    }

    fn number_operands(
        &self,
        op: &Token,
        left: &Value,
        right: &Value,
    ) -> Result<(f64, f64), Unwind> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),

            _ => Err(FlintError::runtime(op.line, "Operands must be numbers.").into()),
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> EvalResult {
        match callee {
            Value::Function(function) => {
                self.check_arity(function.arity(), args.len(), paren)?;
                Ok(function.call(self, args)?)
            }

            Value::Native(native) => {
                self.check_arity(native.arity, args.len(), paren)?;
                Ok(native.call(&args, paren)?)
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), args.len(), paren)?;
                Ok(class.call(self, args)?)
            }

            _ => {
                Err(FlintError::runtime(paren.line, "Can only call functions and classes.").into())
            }
        }
    }

    fn check_arity(&self, arity: i32, got: usize, paren: &Token) -> Result<(), Unwind> {
        if arity != -1 && got != arity as usize {
            return Err(FlintError::runtime(
                paren.line,
                format!("Function expects {} arguments but got {}.", arity, got),
            )
            .into());
        }

        Ok(())
    }

    fn evaluate_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> EvalResult {
        let distance: usize = *self
            .locals
            .get(&id)
            .expect("unresolved 'super' expression reached the evaluator");

        let superclass: Value = self.environment.borrow().get_at(distance, "super");
        let superclass: Rc<FlintClass> = match superclass {
            Value::Class(class) => class,
            _ => {
                return Err(
                    FlintError::runtime(keyword.line, "'super' is not bound to a class.").into(),
                )
            }
        };

        // 'this' sits one scope inside the one holding 'super'.
        let object: Value = self.environment.borrow().get_at(distance - 1, "this");

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(object))),

            None => Err(FlintError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    fn evaluate_get_index(&mut self, object: &Expr, index: &Expr, bracket: &Token) -> EvalResult {
        let object: Value = self.evaluate(object)?;
        let index: Value = self.evaluate(index)?;

        match object {
            Value::Array(array) => {
                let index: usize = self.index_operand(&index, bracket)?;
                let elements = array.elements.borrow();

                if index >= elements.len() {
                    return Err(
                        FlintError::runtime(bracket.line, "Array index out of bounds.").into(),
                    );
                }

                Ok(elements[index].clone())
            }

            Value::Str(string) => {
                let index: usize = self.index_operand(&index, bracket)?;
                let text = string.text.borrow();

                match text.chars().nth(index) {
                    Some(c) => Ok(Value::Str(FlintString::new(c.to_string()))),

                    None => {
                        Err(FlintError::runtime(bracket.line, "String index out of bounds.").into())
                    }
                }
            }

            _ => Err(FlintError::runtime(bracket.line, "Only arrays or strings can be indexed.")
                .into()),
        }
    }

    fn evaluate_set_index(
        &mut self,
        object: &Expr,
        index: &Expr,
        value: &Expr,
        bracket: &Token,
    ) -> EvalResult {
        let object: Value = self.evaluate(object)?;
        let index_val: Value = self.evaluate(index)?;
        let value: Value = self.evaluate(value)?;

        match object {
            Value::Array(array) => {
                let index: usize = self.index_operand(&index_val, bracket)?;
                let mut elements = array.elements.borrow_mut();

                if index >= elements.len() {
                    return Err(
                        FlintError::runtime(bracket.line, "Array index out of bounds.").into(),
                    );
                }

                elements[index] = value.clone();
                Ok(value)
            }

            _ => Err(FlintError::runtime(
                bracket.line,
                "Only arrays support indexed assignment.",
            )
            .into()),
        }
    }

    fn index_operand(&self, index: &Value, bracket: &Token) -> Result<usize, Unwind> {
        match index {
            Value::Number(n) if *n >= 0.0 => Ok(n.trunc() as usize),

            Value::Number(_) => {
                Err(FlintError::runtime(bracket.line, "Array index out of bounds.").into())
            }

            _ => Err(FlintError::runtime(bracket.line, "Index must be a number.").into()),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> EvalResult {
        match self.locals.get(&id) {
            Some(distance) => Ok(self.environment.borrow().get_at(*distance, &name.lexeme)),

            None => Ok(self.globals.borrow().get(&name.lexeme, name.line)?),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
