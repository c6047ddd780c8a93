use std::io::Write;

use log::debug;

use crate::chunk::{Chunk, OpCode};
use crate::error::FlintError;
use crate::value::Value;

/// Outcome of running a chunk to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

/// Stack-based bytecode executor: an instruction pointer, a growable value
/// stack, and a decode loop.
pub struct VM {
    stack: Vec<Value>,
    output: Box<dyn Write>,
}

impl VM {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        VM {
            stack: Vec::new(),
            output,
        }
    }

    pub fn interpret(&mut self, chunk: &Chunk) -> InterpretResult {
        self.stack.clear();
        self.run(chunk)
    }

    fn run(&mut self, chunk: &Chunk) -> InterpretResult {
        let code: &[u8] = chunk.code();
        let mut ip: usize = 0;

        loop {
            if ip >= code.len() {
                // Fell off the end without OP_RETURN.
                return InterpretResult::RuntimeError;
            }

            let instruction_offset: usize = ip;
            let byte: u8 = code[ip];
            ip += 1;

            debug!("VM executing byte {} at offset {}", byte, instruction_offset);

            match OpCode::from_byte(byte) {
                Some(OpCode::Constant) => {
                    let index: usize = code[ip] as usize;
                    ip += 1;

                    self.stack.push(chunk.constants()[index].clone());
                }

                Some(OpCode::ConstantLong) => {
                    let index: usize = code[ip] as usize
                        | (code[ip + 1] as usize) << 8
                        | (code[ip + 2] as usize) << 16;
                    ip += 3;

                    self.stack.push(chunk.constants()[index].clone());
                }

                Some(OpCode::Add) => {
                    match self.binary_numbers(chunk, instruction_offset) {
                        Some((a, b)) => self.stack.push(Value::Number(a + b)),
                        None => return InterpretResult::RuntimeError,
                    };
                }

                Some(OpCode::Sub) => {
                    match self.binary_numbers(chunk, instruction_offset) {
                        Some((a, b)) => self.stack.push(Value::Number(a - b)),
                        None => return InterpretResult::RuntimeError,
                    };
                }

                Some(OpCode::Mul) => {
                    match self.binary_numbers(chunk, instruction_offset) {
                        Some((a, b)) => self.stack.push(Value::Number(a * b)),
                        None => return InterpretResult::RuntimeError,
                    };
                }

                Some(OpCode::Div) => {
                    match self.binary_numbers(chunk, instruction_offset) {
                        Some((a, b)) => {
                            if b == 0.0 {
                                self.report(chunk, instruction_offset, "Division by zero.");
                                return InterpretResult::RuntimeError;
                            }
                            self.stack.push(Value::Number(a / b))
                        }
                        None => return InterpretResult::RuntimeError,
                    };
                }

                Some(OpCode::Negate) => match self.stack.pop() {
                    Some(Value::Number(n)) => self.stack.push(Value::Number(-n)),

                    _ => {
                        self.report(chunk, instruction_offset, "Operand must be a number.");
                        return InterpretResult::RuntimeError;
                    }
                },

                Some(OpCode::Return) => {
                    match self.stack.pop() {
                        Some(value) => {
                            let _ = writeln!(self.output, "{}", value);
                        }
                        None => {
                            self.report(chunk, instruction_offset, "Stack underflow on return.");
                            return InterpretResult::RuntimeError;
                        }
                    }

                    return InterpretResult::Ok;
                }

                None => {
                    self.report(
                        chunk,
                        instruction_offset,
                        format!("Unknown opcode: {}", byte),
                    );
                    return InterpretResult::RuntimeError;
                }
            }
        }
    }

    /// Pops the two arithmetic operands (right first).
    fn binary_numbers(&mut self, chunk: &Chunk, offset: usize) -> Option<(f64, f64)> {
        let right: Option<Value> = self.stack.pop();
        let left: Option<Value> = self.stack.pop();

        match (left, right) {
            (Some(Value::Number(a)), Some(Value::Number(b))) => Some((a, b)),

            _ => {
                self.report(chunk, offset, "Operands must be numbers.");
                None
            }
        }
    }

    fn report<S: Into<String>>(&self, chunk: &Chunk, offset: usize, message: S) {
        eprintln!("{}", FlintError::runtime(chunk.line_at(offset), message));
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
