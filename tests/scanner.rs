#[cfg(test)]
mod scanner_tests {
    use flint::scanner::*;
    use flint::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_brackets_and_extras() {
        assert_token_sequence(
            "[ ] % : ? ;",
            &[
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::MODULO, "%"),
                (TokenType::COLON, ":"),
                (TokenType::QUESTION_MARK, "?"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords() {
        assert_token_sequence(
            "and or if else true false for while break continue func nothing return class super this let",
            &[
                (TokenType::AND, "and"),
                (TokenType::OR, "or"),
                (TokenType::IF, "if"),
                (TokenType::ELSE, "else"),
                (TokenType::TRUE, "true"),
                (TokenType::FALSE, "false"),
                (TokenType::FOR, "for"),
                (TokenType::WHILE, "while"),
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::FUNC, "func"),
                (TokenType::NOTHING, "nothing"),
                (TokenType::RETURN, "return"),
                (TokenType::CLASS, "class"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::LET, "let"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_identifiers_not_keywords() {
        assert_token_sequence(
            "andy lettuce whiles _private x1",
            &[
                (TokenType::IDENTIFIER, "andy"),
                (TokenType::IDENTIFIER, "lettuce"),
                (TokenType::IDENTIFIER, "whiles"),
                (TokenType::IDENTIFIER, "_private"),
                (TokenType::IDENTIFIER, "x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_numbers() {
        let scanner = Scanner::new(b"12 3.5 0.25 7.".to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let numbers: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        // '7.' scans as the number 7 followed by a DOT token.
        assert_eq!(numbers, vec![12.0, 3.5, 0.25, 7.0]);
        assert!(tokens
            .iter()
            .any(|t| t.token_type == TokenType::DOT && t.lexeme == "."));
    }

    #[test]
    fn test_scanner_07_string_literal_with_escapes() {
        let scanner = Scanner::new(br#""a\nb\t\"c\\""#.to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "a\nb\t\"c\\"),
            other => panic!("expected string token, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_08_invalid_escape_is_error() {
        let scanner = Scanner::new(br#""a\qb""#.to_vec());
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Invalid escape"));
    }

    #[test]
    fn test_scanner_09_unterminated_string() {
        let scanner = Scanner::new(b"\"abc".to_vec());
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated string"));
    }

    #[test]
    fn test_scanner_10_newline_in_string_is_error() {
        let scanner = Scanner::new(b"\"ab\ncd\"".to_vec());
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert!(!errors.is_empty());
        assert!(errors[0].to_string().contains("Unterminated string"));
    }

    #[test]
    fn test_scanner_11_line_comment_skipped() {
        assert_token_sequence(
            "a // the rest is ignored\nb",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_12_nested_block_comment() {
        assert_token_sequence(
            "a /* outer /* inner */ still outer */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_13_unterminated_block_comment() {
        let scanner = Scanner::new(b"a /* /* */ b".to_vec());
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated block comment"));
    }

    #[test]
    fn test_scanner_14_c_style_logical_operators_suggest_keywords() {
        let scanner = Scanner::new(b"a && b || c".to_vec());
        let errors: Vec<String> = scanner
            .filter_map(Result::err)
            .map(|e| e.to_string())
            .collect();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Use 'and' instead of '&&'"));
        assert!(errors[1].contains("Use 'or' instead of '||'"));
    }

    #[test]
    fn test_scanner_15_lines_are_tracked() {
        let scanner = Scanner::new(b"a\nb\n\nc".to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 4]);

        // Line numbers never decrease.
        assert!(lines.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_scanner_16_eof_is_always_last() {
        for source in ["", "a", "let x = 1;", "/* comment only */"] {
            let scanner = Scanner::new(source.as_bytes().to_vec());
            let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

            assert_eq!(
                tokens.last().map(|t| t.token_type.clone()),
                Some(TokenType::EOF),
                "source {:?} must end in EOF",
                source
            );
            assert_eq!(
                tokens
                    .iter()
                    .filter(|t| t.token_type == TokenType::EOF)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn test_scanner_17_recovery_after_unexpected_chars() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes().to_vec());

        let results: Vec<_> = scanner.collect();

        // 2 valid tokens, an error, a valid token, an error, then EOF.
        assert_eq!(results.len(), 6);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert!(results[3].is_ok());
        assert!(results[4].is_err());
        assert!(matches!(
            results[5].as_ref().map(|t| t.token_type.clone()),
            Ok(TokenType::EOF)
        ));

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }
    }

    #[test]
    fn test_scanner_18_lexemes_reconstruct_source() {
        let source = "let x=1; if(x>0){print(x);}";
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let joined: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        let squashed: String = source.split_whitespace().collect();

        assert_eq!(joined, squashed);
    }
}
