use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::FlintError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"break" => TokenType::BREAK,
    b"class" => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"func" => TokenType::FUNC,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nothing" => TokenType::NOTHING,
    b"or" => TokenType::OR,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"let" => TokenType::LET,
    b"while" => TokenType::WHILE,
};

#[derive(Debug, Clone)]
pub struct Scanner {
    source: Vec<u8>,
    start: usize,
    curr_ptr: usize,
    line: usize,
    had_error: bool,
    pending_token: Option<TokenType>,
}

impl Scanner {
    pub fn new(buf: Vec<u8>) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", buf.len());
        Self {
            source: buf,
            start: 0,
            curr_ptr: 0,
            line: 1,
            had_error: false,
            pending_token: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    #[inline]
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    fn scan_token(&mut self) -> Result<(), FlintError> {
        debug!(
            "Scanning token at position {}, line {}",
            self.curr_ptr, self.line
        );
        let byte: u8 = self.advance();
        debug!("Processing byte: '{}'", byte as char);

        match byte {
            b'(' => self.add_token(TokenType::LEFT_PAREN),

            b')' => self.add_token(TokenType::RIGHT_PAREN),

            b'{' => self.add_token(TokenType::LEFT_BRACE),

            b'}' => self.add_token(TokenType::RIGHT_BRACE),

            b'[' => self.add_token(TokenType::LEFT_BRACKET),

            b']' => self.add_token(TokenType::RIGHT_BRACKET),

            b',' => self.add_token(TokenType::COMMA),

            b'.' => self.add_token(TokenType::DOT),

            b'-' => self.add_token(TokenType::MINUS),

            b'+' => self.add_token(TokenType::PLUS),

            b';' => self.add_token(TokenType::SEMICOLON),

            b':' => self.add_token(TokenType::COLON),

            b'?' => self.add_token(TokenType::QUESTION_MARK),

            b'*' => self.add_token(TokenType::STAR),

            b'%' => self.add_token(TokenType::MODULO),

            b'&' => {
                self.had_error = true;
                return if self.match_byte(b'&') {
                    Err(FlintError::scan(self.line, "Use 'and' instead of '&&'."))
                } else {
                    Err(FlintError::scan(self.line, "Unexpected character: &"))
                };
            }

            b'|' => {
                self.had_error = true;
                return if self.match_byte(b'|') {
                    Err(FlintError::scan(self.line, "Use 'or' instead of '||'."))
                } else {
                    Err(FlintError::scan(self.line, "Unexpected character: |"))
                };
            }

            b'!' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    debug!("Matched '!=' -> BANG_EQUAL");
                    TokenType::BANG_EQUAL
                } else {
                    debug!("Single '!' -> BANG");
                    TokenType::BANG
                };
                self.add_token(token_type);
            }

            b'=' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    debug!("Matched '==' -> EQUAL_EQUAL");
                    TokenType::EQUAL_EQUAL
                } else {
                    debug!("Single '=' -> EQUAL");
                    TokenType::EQUAL
                };
                self.add_token(token_type);
            }

            b'<' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    debug!("Matched '<=' -> LESS_EQUAL");
                    TokenType::LESS_EQUAL
                } else {
                    debug!("Single '<' -> LESS");
                    TokenType::LESS
                };
                self.add_token(token_type);
            }

            b'>' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    debug!("Matched '>=' -> GREATER_EQUAL");
                    TokenType::GREATER_EQUAL
                } else {
                    debug!("Single '>' -> GREATER");
                    TokenType::GREATER
                };
                self.add_token(token_type);
            }

            b' ' | b'\r' | b'\t' => {
                debug!("Skipping whitespace");
            }

            b'\n' => {
                debug!("Incrementing line count to {}", self.line + 1);
                self.line += 1;
            }

            b'/' => {
                if self.match_byte(b'/') {
                    debug!("Found line comment, skipping until newline");
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'*') {
                    debug!("Found block comment");
                    self.block_comment()?;
                } else {
                    debug!("Single '/' -> SLASH");
                    self.add_token(TokenType::SLASH);
                }
            }

            b'"' => {
                debug!("Starting string parsing");
                self.parse_string()?;
            }

            b'0'..=b'9' => {
                debug!("Starting number parsing");
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                debug!("Starting identifier parsing");
                self.parse_identifier();
            }

            _ => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    byte as char, self.line
                );

                self.had_error = true;

                return Err(FlintError::scan(
                    self.line,
                    format!("Unexpected character: {}", byte as char),
                ));
            }
        }

        Ok(())
    }

    fn parse_string(&mut self) -> Result<(), FlintError> {
        debug!("Parsing string literal at line {}", self.line);

        let mut value: String = String::new();
        let mut terminated = false;

        while !self.is_at_end() {
            let byte: u8 = self.advance();

            if byte == b'"' {
                terminated = true;
                break;
            }

            if byte == b'\\' {
                if self.is_at_end() {
                    break;
                }
                let escape: u8 = self.advance();
                match escape {
                    b'n' => value.push('\n'),
                    b't' => value.push('\t'),
                    b'r' => value.push('\r'),
                    b'"' => value.push('"'),
                    b'\\' => value.push('\\'),
                    _ => {
                        self.had_error = true;
                        return Err(FlintError::scan(
                            self.line,
                            format!("Invalid escape: \\{}", escape as char),
                        ));
                    }
                }
            } else if byte == b'\n' {
                // Bump the line first so the diagnostic points past the break.
                self.line += 1;
                self.had_error = true;
                return Err(FlintError::scan(
                    self.line,
                    "Unterminated string (newline encountered).",
                ));
            } else {
                value.push(byte as char);
            }
        }

        if !terminated {
            debug!("Unterminated string at line {}", self.line);

            self.had_error = true;

            return Err(FlintError::scan(self.line, "Unterminated string."));
        }

        info!("Parsed string literal: {}", value);

        self.add_token(TokenType::STRING(value));

        Ok(())
    }

    fn block_comment(&mut self) -> Result<(), FlintError> {
        let mut nested_levels: usize = 1;

        while nested_levels > 0 && !self.is_at_end() {
            if self.peek() == b'/' && self.peek_next() == b'*' {
                self.advance();
                self.advance();
                nested_levels += 1;
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                nested_levels -= 1;
            } else {
                if self.peek() == b'\n' {
                    self.line += 1;
                }
                self.advance();
            }
        }

        if nested_levels > 0 {
            self.had_error = true;
            return Err(FlintError::scan(self.line, "Unterminated block comment."));
        }

        Ok(())
    }

    fn parse_number(&mut self) {
        debug!("Parsing number starting at position {}", self.start);

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            debug!("Found decimal point in number");

            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let parsed_number: String =
            unsafe { String::from_utf8_unchecked(self.source[self.start..self.curr_ptr].to_vec()) };

        let number: f64 = parsed_number.parse().unwrap_or(0.0);

        info!("Parsed number: {}", number);

        self.add_token(TokenType::NUMBER(number));
    }

    fn parse_identifier(&mut self) {
        debug!("Parsing identifier starting at position {}", self.start);

        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.source[self.start..self.curr_ptr];

        match KEYWORDS.get(text) {
            Some(token_type) => {
                info!("Parsed keyword: {}", String::from_utf8_lossy(text));

                self.add_token(token_type.clone());
            }

            None => {
                info!("Parsed identifier: {}", String::from_utf8_lossy(text));

                self.add_token(TokenType::IDENTIFIER);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        info!("Adding token: {:?}", token_type);

        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.curr_ptr];

        self.curr_ptr += 1;

        debug!(
            "Advancing to position {}, byte: '{}'",
            self.curr_ptr, byte as char
        );

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.curr_ptr] != expected {
            debug!("No match for byte '{}'", expected as char);

            false
        } else {
            debug!("Matched byte '{}'", expected as char);

            self.curr_ptr += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            debug!("Peek: at end, returning 0");

            0
        } else {
            self.source[self.curr_ptr]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.curr_ptr + 1 >= self.len() {
            debug!("Peek_next: beyond end, returning 0");

            0
        } else {
            self.source[self.curr_ptr + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr_ptr >= self.len()
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, FlintError>;

    fn next(&mut self) -> Option<Self::Item> {
        debug!("Iterator next called at position {}", self.curr_ptr);

        if self.is_at_end() {
            if self.curr_ptr == self.len() {
                self.curr_ptr += 1;

                info!("Reached EOF at line {}", self.line);

                return Some(Ok(Token::new(TokenType::EOF, "".to_string(), self.line)));
            }

            debug!("Iterator fully consumed");

            return None;
        }

        self.pending_token = None;

        self.start = self.curr_ptr;

        debug!("Starting new token scan at position {}", self.start);

        if let Err(e) = self.scan_token() {
            debug!("Scan error: {}", e);
            self.had_error = true;
            return Some(Err(e));
        }

        if let Some(token_type) = self.pending_token.take() {
            let lexeme: &str =
                unsafe { std::str::from_utf8_unchecked(&self.source[self.start..self.curr_ptr]) };

            info!(
                "Emitting token: type={:?}, lexeme={}, line={}",
                token_type, lexeme, self.line
            );

            Some(Ok(Token::new(token_type, lexeme.to_string(), self.line)))
        } else {
            debug!("No pending token, continuing scan");

            self.next()
        }
    }
}

impl FusedIterator for Scanner {}

/// Drains a scanner, splitting the stream into tokens and scan diagnostics.
///
/// Scanning never stops at the first error; the parser still wants the rest
/// of the stream for its own recovery, so both halves come back.
pub fn scan_all(scanner: Scanner) -> (Vec<Token>, Vec<FlintError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<FlintError> = Vec::new();

    for result in scanner {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}
