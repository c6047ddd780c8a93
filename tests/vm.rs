#[cfg(test)]
mod vm_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use flint::chunk::{Chunk, LineStart, OpCode};
    use flint::disassembler::Disassembler;
    use flint::value::Value;
    use flint::vm::{InterpretResult, VM};

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn run_chunk(chunk: &Chunk) -> (String, InterpretResult) {
        let buf = SharedBuf::default();
        let mut vm = VM::with_output(Box::new(buf.clone()));

        let result = vm.interpret(chunk);
        (buf.text(), result)
    }

    // ─── chunk encoding ──────────────────────────────────────────────────

    #[test]
    fn test_short_constant_encoding() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.5), 1);

        assert_eq!(chunk.code(), &[OpCode::Constant as u8, 0]);
        assert_eq!(chunk.constants().len(), 1);
    }

    #[test]
    fn test_long_constant_encoding_is_little_endian() {
        let mut chunk = Chunk::new();

        // Fill the one-byte index space first.
        for i in 0..=255 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write_constant(Value::Number(999.0), 1);

        // Index 256 = 0x000100, stored low byte first.
        assert_eq!(
            chunk.code(),
            &[OpCode::ConstantLong as u8, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_constant_indices_are_insertion_order() {
        let mut chunk = Chunk::new();

        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::Number(2.0)), 1);
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 2);
    }

    // ─── line table ──────────────────────────────────────────────────────

    #[test]
    fn test_line_table_is_run_length_encoded() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.0), 3); // 2 bytes on line 3
        chunk.write_op(OpCode::Add, 3);
        chunk.write_op(OpCode::Return, 7);

        assert_eq!(
            chunk.lines(),
            &[
                LineStart { line: 3, offset: 0 },
                LineStart { line: 7, offset: 3 },
            ]
        );
    }

    #[test]
    fn test_line_lookup_finds_most_recent_change_point() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::Add, 2);
        chunk.write_op(OpCode::Return, 5);

        assert_eq!(chunk.line_at(0), 1);
        assert_eq!(chunk.line_at(1), 1);
        assert_eq!(chunk.line_at(2), 2);
        assert_eq!(chunk.line_at(3), 5);

        // Lines never decrease as offsets grow.
        let lines: Vec<usize> = (0..4).map(|o| chunk.line_at(o)).collect();
        assert!(lines.windows(2).all(|w| w[0] <= w[1]));
    }

    // ─── execution ───────────────────────────────────────────────────────

    #[test]
    fn test_add_two_constants_and_return() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.2), 1);
        chunk.write_constant(Value::Number(3.4), 1);
        chunk.write_op(OpCode::Add, 1);
        chunk.write_op(OpCode::Return, 2);

        let (output, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "4.6\n");
    }

    #[test]
    fn test_subtract_multiply_negate() {
        // -((10 - 4) * 2) = -12
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(10.0), 1);
        chunk.write_constant(Value::Number(4.0), 1);
        chunk.write_op(OpCode::Sub, 1);
        chunk.write_constant(Value::Number(2.0), 1);
        chunk.write_op(OpCode::Mul, 1);
        chunk.write_op(OpCode::Negate, 1);
        chunk.write_op(OpCode::Return, 1);

        let (output, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "-12\n");
    }

    #[test]
    fn test_division() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(7.0), 1);
        chunk.write_constant(Value::Number(2.0), 1);
        chunk.write_op(OpCode::Div, 1);
        chunk.write_op(OpCode::Return, 1);

        let (output, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "3.5\n");
    }

    #[test]
    fn test_division_by_zero_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.0), 1);
        chunk.write_constant(Value::Number(0.0), 1);
        chunk.write_op(OpCode::Div, 1);
        chunk.write_op(OpCode::Return, 1);

        let (_, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::RuntimeError);
    }

    #[test]
    fn test_unknown_opcode_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write(0xff, 1);

        let (_, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::RuntimeError);
    }

    #[test]
    fn test_long_constant_round_trip_through_vm() {
        let mut chunk = Chunk::new();

        for i in 0..=255 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write_constant(Value::Number(123.0), 1);
        chunk.write_op(OpCode::Return, 1);

        let (output, result) = run_chunk(&chunk);

        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(output, "123\n");
    }

    // ─── disassembler ────────────────────────────────────────────────────

    #[test]
    fn test_disassembler_output_format() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::Number(1.2), 123);
        chunk.write_op(OpCode::Add, 123);
        chunk.write_op(OpCode::Return, 124);

        let mut out: Vec<u8> = Vec::new();
        Disassembler.disassemble_chunk(&chunk, "test", &mut out);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "== test ==");
        assert_eq!(lines[1], "0000  123 OP_CONSTANT        0 '1.2'");
        // Same line as the previous instruction shows a pipe.
        assert_eq!(lines[2], "0002    | OP_ADD");
        assert_eq!(lines[3], "0003  124 OP_RETURN");
    }

    #[test]
    fn test_disassembler_decodes_long_constants() {
        let mut chunk = Chunk::new();

        for i in 0..=255 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write_constant(Value::Number(9.0), 1);

        let mut out: Vec<u8> = Vec::new();
        Disassembler.disassemble_chunk(&chunk, "longs", &mut out);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("OP_CONSTANT_LONG 256 '9'"));
    }
}
