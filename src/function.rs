use std::cell::RefCell;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::{FlintError, Result};
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user-declared function: the shared declaration plus the environment it
/// captured.  Bound methods share the declaration but carry a fresh closure
/// with `this` predefined.
pub struct FlintFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl FlintFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Rc<Self> {
        Rc::new(Self {
            declaration,
            closure,
            is_initializer,
        })
    }

    pub fn arity(&self) -> i32 {
        self.declaration.params.len() as i32
    }

    /// Produces a copy of this function whose closure has `this` bound to
    /// the given instance.
    pub fn bind(&self, instance: Value) -> Rc<FlintFunction> {
        let mut environment: Environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", instance);

        FlintFunction::new(
            Rc::clone(&self.declaration),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }

    /// Runs the body in a fresh environment enclosing the closure.  A return
    /// signal is caught here; initializers always surface `this` instead.
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
        let environment: Rc<RefCell<Environment>> = Rc::new(RefCell::new(
            Environment::with_enclosing(Rc::clone(&self.closure)),
        ));

        for (param, arg) in self.declaration.params.iter().zip(args) {
            environment.borrow_mut().define(&param.lexeme, arg);
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {}

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    return Ok(self.closure.borrow().get_at(0, "this"));
                }
                return Ok(value);
            }

            // A loop signal crossing a call boundary has escaped its loop.
            Err(Unwind::Break { line }) => {
                return Err(FlintError::runtime(line, "'break' used outside of a loop."));
            }

            Err(Unwind::Continue { line }) => {
                return Err(FlintError::runtime(
                    line,
                    "'continue' used outside of a loop.",
                ));
            }

            Err(Unwind::Error(e)) => return Err(e),
        }

        if self.is_initializer {
            return Ok(self.closure.borrow().get_at(0, "this"));
        }

        Ok(Value::Nothing)
    }
}
