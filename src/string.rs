use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{FlintError, Result};
use crate::native::NativeFunction;
use crate::token::Token;
use crate::value::Value;

/// Shared string object.  The text sits behind a `RefCell` because
/// `lower()`/`upper()` rewrite it in place and hand the same object back.
pub struct FlintString {
    pub text: RefCell<String>,
}

impl FlintString {
    pub fn new<S: Into<String>>(text: S) -> Rc<Self> {
        Rc::new(Self {
            text: RefCell::new(text.into()),
        })
    }

    /// Looks up a built-in string method, already bound to this string.
    pub fn get_builtin(self: Rc<Self>, name: &Token) -> Result<Value> {
        match name.lexeme.as_str() {
            "lower" => {
                let receiver: Rc<FlintString> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "lower",
                    0,
                    move |_args, _paren| {
                        let lowered: String = receiver.text.borrow().to_lowercase();
                        *receiver.text.borrow_mut() = lowered;
                        Ok(Value::Str(Rc::clone(&receiver)))
                    },
                )))
            }

            "upper" => {
                let receiver: Rc<FlintString> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "upper",
                    0,
                    move |_args, _paren| {
                        let raised: String = receiver.text.borrow().to_uppercase();
                        *receiver.text.borrow_mut() = raised;
                        Ok(Value::Str(Rc::clone(&receiver)))
                    },
                )))
            }

            "length" => {
                let receiver: Rc<FlintString> = Rc::clone(&self);
                Ok(Value::Native(NativeFunction::new(
                    "length",
                    0,
                    move |_args, _paren| {
                        Ok(Value::Number(receiver.text.borrow().len() as f64))
                    },
                )))
            }

            _ => Err(FlintError::runtime(
                name.line,
                format!("string has no function {}.", name.lexeme),
            )),
        }
    }
}
