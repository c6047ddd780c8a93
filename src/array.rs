use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{FlintError, Result};
use crate::native::NativeFunction;
use crate::token::Token;
use crate::value::Value;

/// Shared array object with interior mutability; `push`/`pop` and indexed
/// stores all go through the same `RefCell`.
pub struct FlintArray {
    pub elements: RefCell<Vec<Value>>,
}

impl FlintArray {
    pub fn new(elements: Vec<Value>) -> Rc<Self> {
        Rc::new(Self {
            elements: RefCell::new(elements),
        })
    }

    /// Looks up a built-in array method, already bound to this array.
    pub fn get_builtin(self: Rc<Self>, name: &Token) -> Result<Value> {
        match name.lexeme.as_str() {
            "push" => {
                let receiver: Rc<FlintArray> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "push",
                    1,
                    move |args, _paren| {
                        receiver.elements.borrow_mut().push(args[0].clone());
                        Ok(Value::Nothing)
                    },
                )))
            }

            "pop" => {
                let receiver: Rc<FlintArray> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "pop",
                    0,
                    move |_args, paren| {
                        receiver.elements.borrow_mut().pop().ok_or_else(|| {
                            FlintError::runtime(paren.line, "Cannot pop from empty array.")
                        })
                    },
                )))
            }

            "length" => {
                let receiver: Rc<FlintArray> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "length",
                    0,
                    move |_args, _paren| {
                        Ok(Value::Number(receiver.elements.borrow().len() as f64))
                    },
                )))
            }

            _ => Err(FlintError::runtime(
                name.line,
                format!("array has no function named {}.", name.lexeme),
            )),
        }
    }
}
