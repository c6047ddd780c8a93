use std::io::Write;

use crate::chunk::{Chunk, OpCode};

/// Byte-accurate chunk decoder.  Prints each instruction as
/// `OFFSET LINE MNEMONIC [OPERAND 'VALUE']`, with a `|` replacing the line
/// when it matches the previous instruction's.
pub struct Disassembler;

impl Disassembler {
    pub fn disassemble_chunk(&self, chunk: &Chunk, name: &str, out: &mut dyn Write) {
        let _ = writeln!(out, "== {} ==", name);

        let mut offset: usize = 0;
        while offset < chunk.code().len() {
            offset = self.disassemble_instruction(chunk, offset, out);
        }
    }

    /// Decodes one instruction, returning the offset of the next.
    pub fn disassemble_instruction(
        &self,
        chunk: &Chunk,
        offset: usize,
        out: &mut dyn Write,
    ) -> usize {
        let _ = write!(out, "{:04} ", offset);

        if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
            let _ = write!(out, "   | ");
        } else {
            let _ = write!(out, "{:4} ", chunk.line_at(offset));
        }

        let byte: u8 = chunk.code()[offset];

        match OpCode::from_byte(byte) {
            Some(OpCode::Constant) => self.constant_instruction("OP_CONSTANT", chunk, offset, out),

            Some(OpCode::ConstantLong) => {
                self.long_constant_instruction("OP_CONSTANT_LONG", chunk, offset, out)
            }

            Some(OpCode::Add) => self.simple_instruction("OP_ADD", offset, out),

            Some(OpCode::Sub) => self.simple_instruction("OP_SUBTRACT", offset, out),

            Some(OpCode::Mul) => self.simple_instruction("OP_MULTIPLY", offset, out),

            Some(OpCode::Div) => self.simple_instruction("OP_DIVIDE", offset, out),

            Some(OpCode::Negate) => self.simple_instruction("OP_NEGATE", offset, out),

            Some(OpCode::Return) => self.simple_instruction("OP_RETURN", offset, out),

            None => {
                let _ = writeln!(out, "Unknown opcode: {}", byte);
                offset + 1
            }
        }
    }

    fn simple_instruction(&self, name: &str, offset: usize, out: &mut dyn Write) -> usize {
        let _ = writeln!(out, "{}", name);
        offset + 1
    }

    fn constant_instruction(
        &self,
        name: &str,
        chunk: &Chunk,
        offset: usize,
        out: &mut dyn Write,
    ) -> usize {
        let index: usize = chunk.code()[offset + 1] as usize;

        let _ = writeln!(
            out,
            "{:<16}{:>4} '{}'",
            name,
            index,
            chunk.constants()[index]
        );

        offset + 2
    }

    fn long_constant_instruction(
        &self,
        name: &str,
        chunk: &Chunk,
        offset: usize,
        out: &mut dyn Write,
    ) -> usize {
        // 24-bit little-endian operand.
        let index: usize = chunk.code()[offset + 1] as usize
            | (chunk.code()[offset + 2] as usize) << 8
            | (chunk.code()[offset + 3] as usize) << 16;

        let _ = writeln!(
            out,
            "{:<16}{:>4} '{}'",
            name,
            index,
            chunk.constants()[index]
        );

        offset + 4
    }
}
