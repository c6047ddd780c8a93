use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::environment::Environment;
use crate::error::{FlintError, Result};
use crate::string::FlintString;
use crate::token::Token;
use crate::value::{stringify_number, Value};

/// Host implementation of a native function.  The closing-paren token comes
/// along for error reporting.
pub type NativeFn = Box<dyn Fn(&[Value], &Token) -> Result<Value>>;

/// A built-in function callable from Flint code.  Arity `-1` marks a
/// variadic; anything else is enforced by the evaluator before the call.
pub struct NativeFunction {
    pub name: String,
    pub arity: i32,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new<S, F>(name: S, arity: i32, func: F) -> Rc<Self>
    where
        S: Into<String>,
        F: Fn(&[Value], &Token) -> Result<Value> + 'static,
    {
        Rc::new(Self {
            name: name.into(),
            arity,
            func: Box::new(func),
        })
    }

    pub fn call(&self, args: &[Value], paren: &Token) -> Result<Value> {
        (self.func)(args, paren)
    }
}

/// Shared sink for everything the language writes; tests swap in a buffer.
pub type OutputSink = Rc<RefCell<Box<dyn Write>>>;

/// Defines the global native functions in the given environment.
pub fn register_globals(globals: &mut Environment, output: OutputSink) {
    info!("Registering native functions in globals");

    globals.define(
        "clock",
        Value::Native(NativeFunction::new("clock", 0, |_args, paren| {
            let timestamp: f64 = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| FlintError::runtime(paren.line, format!("Clock error: {}", e)))?
                .as_secs_f64();

            Ok(Value::Number(timestamp))
        })),
    );

    let sink: OutputSink = Rc::clone(&output);
    globals.define(
        "print",
        Value::Native(NativeFunction::new("print", -1, move |args, _paren| {
            let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();

            let mut out = sink.borrow_mut();
            let _ = writeln!(out, "{}", rendered.join(" "));

            Ok(Value::Nothing)
        })),
    );

    let sink: OutputSink = Rc::clone(&output);
    globals.define(
        "scan",
        Value::Native(NativeFunction::new("scan", -1, move |args, paren| {
            if args.len() > 1 {
                return Err(FlintError::runtime(
                    paren.line,
                    "scan takes at most one argument.",
                ));
            }

            if let Some(prompt) = args.first() {
                let mut out = sink.borrow_mut();
                let _ = write!(out, "{}", prompt);
                let _ = out.flush();
            }

            let mut line: String = String::new();
            std::io::stdin().read_line(&mut line)?;
            let line: &str = line.trim();

            match line.parse::<f64>() {
                Ok(number) => Ok(Value::Number(number)),
                Err(_) => Ok(Value::Str(FlintString::new(line))),
            }
        })),
    );

    globals.define(
        "intDiv",
        Value::Native(NativeFunction::new("intDiv", 2, |args, paren| {
            match (&args[0], &args[1]) {
                (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(FlintError::runtime(
                    paren.line,
                    "Integer division by zero.",
                )),

                (Value::Number(a), Value::Number(b)) => Ok(Value::Number((a / b).trunc())),

                _ => Err(FlintError::runtime(
                    paren.line,
                    "intDiv expects two numbers.",
                )),
            }
        })),
    );

    globals.define(
        "toString",
        Value::Native(NativeFunction::new("toString", 1, |args, paren| {
            match &args[0] {
                Value::Number(n) => Ok(Value::Str(FlintString::new(stringify_number(*n)))),

                _ => Err(FlintError::runtime(paren.line, "toString expects a number.")),
            }
        })),
    );

    globals.define(
        "ord",
        Value::Native(NativeFunction::new("ord", 1, |args, paren| match &args[0] {
            Value::Str(s) => {
                let text = s.text.borrow();
                let mut chars = text.chars();

                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Number(c as u32 as f64)),
                    _ => Err(FlintError::runtime(
                        paren.line,
                        "ord expects a one-character string.",
                    )),
                }
            }

            _ => Err(FlintError::runtime(
                paren.line,
                "ord expects a one-character string.",
            )),
        })),
    );

    globals.define(
        "chr",
        Value::Native(NativeFunction::new("chr", 1, |args, paren| match &args[0] {
            Value::Number(n) if *n >= 0.0 && *n <= 255.0 && n.fract() == 0.0 => {
                let c: char = (*n as u8) as char;
                Ok(Value::Str(FlintString::new(c.to_string())))
            }

            _ => Err(FlintError::runtime(
                paren.line,
                "chr expects a number between 0 and 255.",
            )),
        })),
    );
}
