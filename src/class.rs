use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{FlintError, Result};
use crate::function::FlintFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// A class object: method tables plus an optional superclass.  Classes are
/// also callable; calling one constructs an instance and runs `init`.
pub struct FlintClass {
    pub name: String,
    pub superclass: Option<Rc<FlintClass>>,
    instance_methods: HashMap<String, Rc<FlintFunction>>,
    class_methods: HashMap<String, Rc<FlintFunction>>,
}

impl FlintClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<FlintClass>>,
        instance_methods: HashMap<String, Rc<FlintFunction>>,
        class_methods: HashMap<String, Rc<FlintFunction>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name,
            superclass,
            instance_methods,
            class_methods,
        })
    }

    /// Method lookup, walking the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<FlintFunction>> {
        if let Some(method) = self.instance_methods.get(name) {
            return Some(Rc::clone(method));
        }

        if let Some(superclass) = &self.superclass {
            return superclass.find_method(name);
        }

        None
    }

    /// Property access on the class object itself: only class (static)
    /// methods are visible here.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(method) = self.class_methods.get(&name.lexeme) {
            return Ok(Value::Function(Rc::clone(method)));
        }

        Err(FlintError::runtime(
            name.line,
            format!("Undefined static property '{}'.", name.lexeme),
        ))
    }

    /// The class's arity is its initializer's; a class without `init` takes
    /// no arguments.
    pub fn arity(&self) -> i32 {
        match self.find_method("init") {
            Some(initializer) => initializer.arity(),
            None => 0,
        }
    }

    /// Instantiation: build the instance, then bind and run `init` if the
    /// class has one.
    pub fn call(self: Rc<Self>, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
        let instance: Rc<FlintInstance> = FlintInstance::new(Rc::clone(&self));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Value::Instance(Rc::clone(&instance)))
                .call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An object: a pointer to its class and a mutable field map.
pub struct FlintInstance {
    pub class: Rc<FlintClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl FlintInstance {
    pub fn new(class: Rc<FlintClass>) -> Rc<Self> {
        Rc::new(Self {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Property access: fields win over methods.  Methods come back bound to
    /// this instance; getters run immediately and yield their result.
    pub fn get(self: Rc<Self>, name: &Token, interpreter: &mut Interpreter) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            let bound: Rc<FlintFunction> = method.bind(Value::Instance(Rc::clone(&self)));

            if bound.declaration.is_getter {
                return bound.call(interpreter, Vec::new());
            }

            return Ok(Value::Function(bound));
        }

        Err(FlintError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Field write; the field is created if absent.
    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}
