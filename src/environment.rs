use crate::error::{FlintError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope: a name→value map plus an optional link to the scope
/// that encloses it.  Blocks, function calls, and method binds each open one.
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Binds a name in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Walks outward until the name is found.  A binding still holding its
    /// declaration placeholder (`null`/`nothing`) reads as undefined.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            match value {
                Value::Nothing | Value::Null => Err(FlintError::runtime(
                    line,
                    format!("Variable '{}' is undefined.", name),
                )),
                _ => Ok(value.clone()),
            }
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(FlintError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(FlintError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Reads a name exactly `distance` scopes out.  Only valid for names the
    /// resolver bound at that depth; a name missing from the target scope
    /// reads as `nothing`.
    pub fn get_at(&self, distance: usize, name: &str) -> Value {
        if distance == 0 {
            self.values.get(name).cloned().unwrap_or(Value::Nothing)
        } else {
            self.enclosing
                .as_ref()
                .expect("resolved scope depth walks past the outermost environment")
                .borrow()
                .get_at(distance - 1, name)
        }
    }

    /// Writes a name exactly `distance` scopes out; same contract as
    /// [`Environment::get_at`].
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) {
        if distance == 0 {
            self.values.insert(name.to_string(), value);
        } else {
            self.enclosing
                .as_ref()
                .expect("resolved scope depth walks past the outermost environment")
                .borrow_mut()
                .assign_at(distance - 1, name, value);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
