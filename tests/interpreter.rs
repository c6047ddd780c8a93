#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use flint::interpreter::Interpreter;
    use flint::parser::Parser;
    use flint::resolver::Resolver;
    use flint::scanner::{scan_all, Scanner};

    /// Cloneable writer so the test can read back what `print` wrote.
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

    /// Full pipeline run; panics on compile-stage errors, returns the
    /// printed lines and whether execution finished without runtime errors.
    fn run_outcome(source: &str) -> (Vec<String>, bool) {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        let (tokens, scan_errors) = scan_all(Scanner::new(source.as_bytes().to_vec()));
        assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

        let (statements, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

        let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);
        assert!(resolve_errors.is_empty(), "resolve errors: {:?}", resolve_errors);

        let clean = interpreter.interpret(&statements);

        let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
        (text.lines().map(str::to_string).collect(), clean)
    }

    fn run(source: &str) -> Vec<String> {
        let (lines, clean) = run_outcome(source);
        assert!(clean, "expected a clean run for {:?}", source);
        lines
    }

    // ─── printing and stringification ────────────────────────────────────

    #[test]
    fn test_string_number_concatenation() {
        assert_eq!(run(r#"print("hi " + 42);"#), vec!["hi 42"]);
    }

    #[test]
    fn test_number_formatting_trims_trailing_zeros() {
        assert_eq!(run("print(5.0);"), vec!["5"]);
        assert_eq!(run("print(2.5);"), vec!["2.5"]);
        assert_eq!(run("print(1.2 + 3.4);"), vec!["4.6"]);
        assert_eq!(run("print(0 - 7);"), vec!["-7"]);
    }

    #[test]
    fn test_print_booleans_and_nothing() {
        assert_eq!(run("print(true); print(false);"), vec!["true", "false"]);
        assert_eq!(run("print(nothing);"), vec!["NOTHING"]);
    }

    // ─── scoping ─────────────────────────────────────────────────────────

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            run("let a = 1; { let a = 2; print(a); } print(a);"),
            vec!["2", "1"]
        );
    }

    #[test]
    fn test_assignment_reaches_enclosing_scope() {
        assert_eq!(
            run("let a = 1; { a = 2; } print(a);"),
            vec!["2"]
        );
    }

    #[test]
    fn test_uninitialized_global_read_is_runtime_error() {
        let (_, clean) = run_outcome("let x; print(x);");
        assert!(!clean);
    }

    // ─── functions and closures ──────────────────────────────────────────

    #[test]
    fn test_recursive_fibonacci() {
        assert_eq!(
            run("func fib(n) { if (n < 2) return n; return fib(n-1) + fib(n-2); } print(fib(10));"),
            vec!["55"]
        );
    }

    #[test]
    fn test_closure_counter() {
        assert_eq!(
            run(
                "func make() { let n = 0; return func () { n = n + 1; return n; }; } \
                 let c = make(); print(c()); print(c()); print(c());"
            ),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn test_lambda_called_through_variable() {
        assert_eq!(
            run("let double = func (n) { return n * 2; }; print(double(21));"),
            vec!["42"]
        );
    }

    #[test]
    fn test_function_without_return_yields_nothing() {
        assert_eq!(run("func f() { 1; } print(f());"), vec!["NOTHING"]);
    }

    #[test]
    fn test_wrong_arity_is_runtime_error() {
        let (_, clean) = run_outcome("func f(a) { return a; } f(1, 2);");
        assert!(!clean);
    }

    #[test]
    fn test_calling_a_number_is_runtime_error() {
        let (_, clean) = run_outcome("let x = 4; x();");
        assert!(!clean);
    }

    // ─── classes ─────────────────────────────────────────────────────────

    #[test]
    fn test_class_init_and_method() {
        assert_eq!(
            run("class A { init(x) { this.x = x; } get() { return this.x; } } print(A(7).get());"),
            vec!["7"]
        );
    }

    #[test]
    fn test_inheritance_and_super() {
        assert_eq!(
            run(
                r#"class A { hi() { return "A"; } } class B < A { hi() { return super.hi() + "B"; } } print(B().hi());"#
            ),
            vec!["AB"]
        );
    }

    #[test]
    fn test_inherited_method_without_override() {
        assert_eq!(
            run(r#"class A { hi() { return "A"; } } class B < A {} print(B().hi());"#),
            vec!["A"]
        );
    }

    #[test]
    fn test_getter_runs_on_property_read() {
        assert_eq!(
            run(
                "class Square { init(s) { this.s = s; } area { return this.s * this.s; } } \
                 print(Square(3).area);"
            ),
            vec!["9"]
        );
    }

    #[test]
    fn test_static_method_on_class_object() {
        assert_eq!(
            run("class Math { class square(n) { return n * n; } } print(Math.square(4));"),
            vec!["16"]
        );
    }

    #[test]
    fn test_bound_method_keeps_this() {
        assert_eq!(
            run(
                "class A { init(x) { this.x = x; } get() { return this.x; } } \
                 let a = A(7); let m = a.get; print(m());"
            ),
            vec!["7"]
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        assert_eq!(
            run(
                "class A { m() { return 1; } } let a = A(); a.m = 2; print(a.m);"
            ),
            vec!["2"]
        );
    }

    #[test]
    fn test_property_on_number_is_runtime_error() {
        let (_, clean) = run_outcome("let n = 1; n.field;");
        assert!(!clean);
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, clean) = run_outcome("let NotAClass = 1; class B < NotAClass {}");
        assert!(!clean);
    }

    // ─── arrays and strings ──────────────────────────────────────────────

    #[test]
    fn test_array_push_index_length() {
        assert_eq!(
            run("let xs = [1, 2, 3]; xs.push(4); print(xs[3]); print(xs.length());"),
            vec!["4", "4"]
        );
    }

    #[test]
    fn test_array_pop_and_indexed_store() {
        assert_eq!(
            run("let xs = [1, 2, 3]; print(xs.pop()); xs[0] = 9; print(xs[0]);"),
            vec!["3", "9"]
        );
    }

    #[test]
    fn test_indexed_store_is_idempotent() {
        assert_eq!(
            run("let xs = [1]; xs[0] = 5; xs[0] = 5; print(xs[0]); print(xs.length());"),
            vec!["5", "1"]
        );
    }

    #[test]
    fn test_array_index_out_of_bounds() {
        let (_, clean) = run_outcome("let xs = [1]; xs[5];");
        assert!(!clean);
    }

    #[test]
    fn test_string_indexing() {
        assert_eq!(run(r#"print("abc"[1]);"#), vec!["b"]);
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(
            run(r#"let s = "AbC"; print(s.lower()); print(s.upper()); print(s.length());"#),
            vec!["abc", "ABC", "3"]
        );
    }

    #[test]
    fn test_lowercasing_is_idempotent() {
        assert_eq!(
            run(r#"let s = "AbC"; print(s.lower().lower() == s.lower());"#),
            vec!["true"]
        );
    }

    // ─── operators ───────────────────────────────────────────────────────

    #[test]
    fn test_modulo_and_division() {
        assert_eq!(run("print(7 % 3); print(7 / 2);"), vec!["1", "3.5"]);
    }

    #[test]
    fn test_division_by_zero_is_runtime_error() {
        let (_, clean) = run_outcome("print(1 / 0);");
        assert!(!clean);

        let (_, clean) = run_outcome("print(1 % 0);");
        assert!(!clean);
    }

    #[test]
    fn test_string_comparison() {
        assert_eq!(
            run(r#"print("a" < "b"); print("b" <= "a");"#),
            vec!["true", "false"]
        );
    }

    #[test]
    fn test_comparing_string_to_number_is_runtime_error() {
        let (_, clean) = run_outcome(r#"print("a" < 1);"#);
        assert!(!clean);
    }

    #[test]
    fn test_logical_operators_return_deciding_operand() {
        assert_eq!(run(r#"print(0 or "x");"#), vec!["x"]);
        assert_eq!(run("print(2 or 3);"), vec!["2"]);
        assert_eq!(run("print(nothing and 1);"), vec!["NOTHING"]);
        assert_eq!(run("print(1 and 2);"), vec!["2"]);
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        assert_eq!(run("print(false and 1 / 0);"), vec!["false"]);
        assert_eq!(run("print(true or 1 / 0);"), vec!["true"]);
    }

    #[test]
    fn test_ternary_evaluates_exactly_one_branch() {
        assert_eq!(run("print(true ? 1 : 1 / 0);"), vec!["1"]);
        assert_eq!(run(r#"print(1 > 2 ? "y" : "n");"#), vec!["n"]);
    }

    #[test]
    fn test_comma_expression_yields_right_value() {
        assert_eq!(run("print((1, 2, 3));"), vec!["3"]);
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(run("print(-5); print(!true); print(!0);"), vec!["-5", "false", "true"]);
    }

    // ─── equality semantics ──────────────────────────────────────────────

    #[test]
    fn test_primitive_equality_is_structural() {
        assert_eq!(
            run("print(1 == 1); print(nothing == nothing); print(true == false);"),
            vec!["true", "true", "false"]
        );
    }

    #[test]
    fn test_object_equality_is_reference_identity() {
        assert_eq!(run(r#"print("a" == "a");"#), vec!["false"]);
        assert_eq!(run(r#"let s = "a"; print(s == s);"#), vec!["true"]);
        assert_eq!(run("print([1] == [1]);"), vec!["false"]);
        assert_eq!(run("let xs = [1]; let ys = xs; print(xs == ys);"), vec!["true"]);
        assert_eq!(run("class A {} print(A() == A());"), vec!["false"]);
        assert_eq!(run("class A {} let a = A(); print(a == a);"), vec!["true"]);
    }

    // ─── control flow ────────────────────────────────────────────────────

    #[test]
    fn test_while_with_break() {
        assert_eq!(
            run("let i = 0; while (true) { i = i + 1; if (i == 3) break; } print(i);"),
            vec!["3"]
        );
    }

    #[test]
    fn test_for_loop_counts() {
        assert_eq!(
            run("for (let i = 0; i < 3; i = i + 1) print(i);"),
            vec!["0", "1", "2"]
        );
    }

    #[test]
    fn test_continue_still_runs_for_increment() {
        // If continue skipped the increment this would never terminate.
        assert_eq!(
            run("for (let i = 0; i < 5; i = i + 1) { if (i % 2 == 0) continue; print(i); }"),
            vec!["1", "3"]
        );
    }

    #[test]
    fn test_nested_loop_break_only_exits_inner() {
        assert_eq!(
            run(
                "for (let i = 0; i < 2; i = i + 1) { \
                   for (let j = 0; j < 10; j = j + 1) { if (j == 1) break; print(i + j); } \
                 }"
            ),
            vec!["0", "1"]
        );
    }

    #[test]
    fn test_return_unwinds_through_loops() {
        assert_eq!(
            run("func f() { while (true) { return 42; } } print(f());"),
            vec!["42"]
        );
    }

    // ─── built-ins ───────────────────────────────────────────────────────

    #[test]
    fn test_int_div() {
        assert_eq!(run("print(intDiv(7, 2)); print(intDiv(0 - 7, 2));"), vec!["3", "-3"]);
    }

    #[test]
    fn test_int_div_by_zero_is_runtime_error() {
        let (_, clean) = run_outcome("intDiv(1, 0);");
        assert!(!clean);
    }

    #[test]
    fn test_to_string() {
        assert_eq!(run(r#"print(toString(3.5) + "!");"#), vec!["3.5!"]);
    }

    #[test]
    fn test_ord_chr_round_trip() {
        assert_eq!(run("print(toString(ord(chr(65))));"), vec!["65"]);
        assert_eq!(run(r#"print(chr(97));"#), vec!["a"]);
        assert_eq!(run(r#"print(ord("A"));"#), vec!["65"]);
    }

    #[test]
    fn test_chr_out_of_range_is_runtime_error() {
        let (_, clean) = run_outcome("chr(300);");
        assert!(!clean);
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(run("print(clock() > 0);"), vec!["true"]);
    }

    // ─── error recovery at the top level ─────────────────────────────────

    #[test]
    fn test_top_level_continues_after_runtime_error() {
        let (lines, clean) = run_outcome("print(1 / 0); print(2);");

        assert!(!clean);
        assert_eq!(lines, vec!["2"]);
    }

    #[test]
    fn test_runtime_error_aborts_the_whole_call_chain() {
        let (lines, clean) = run_outcome(
            "func inner() { return [1][9]; } func outer() { inner(); print(1); } outer();",
        );

        assert!(!clean);
        assert!(lines.is_empty());
    }
}
