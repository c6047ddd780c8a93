use std::rc::Rc;

use log::debug;

use crate::error::{FlintError, Result};
use crate::expr::{Expr, ExprId, LiteralExpr};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Recursive-descent parser over a scanned token stream.
///
/// Errors are reported into an internal list as they are found; a fatal
/// error unwinds to the nearest declaration boundary where `synchronize`
/// skips ahead and parsing resumes.  The caller gets every statement that
/// parsed cleanly plus the accumulated diagnostics.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<FlintError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> (Vec<Stmt>, Vec<FlintError>) {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        (statements, self.errors)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        let result: Result<Stmt> = if self.match_tokens(&[TokenType::CLASS]) {
            self.class_declaration()
        } else if self.match_tokens(&[TokenType::FUNC]) {
            self.function_declaration("function").map(Stmt::Function)
        } else if self.match_tokens(&[TokenType::LET]) {
            self.let_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                debug!("Parse error, synchronizing: {}", e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(
            TokenType::IDENTIFIER,
            "Expected an identifier for class name.",
        )?;

        let superclass: Option<Expr> = if self.match_tokens(&[TokenType::LESS]) {
            self.consume(
                TokenType::IDENTIFIER,
                "Expected an identifier for super class name.",
            )?;
            let id: ExprId = ExprId::next();
            Some(Expr::Variable {
                name: self.previous().clone(),
                id,
            })
        } else {
            None
        };

        self.consume(
            TokenType::LEFT_BRACE,
            "Expected '{' at the start of class body.",
        )?;

        let mut instance_methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut class_methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            // A leading 'class' marks a static method.
            if self.match_tokens(&[TokenType::CLASS]) {
                class_methods.push(self.function_declaration("method")?);
            } else {
                instance_methods.push(self.function_declaration("method")?);
            }
        }

        self.consume(
            TokenType::RIGHT_BRACE,
            "Expected '}' at the end of class body.",
        )?;

        Ok(Stmt::Class {
            name,
            superclass,
            instance_methods,
            class_methods,
        })
    }

    fn function_declaration(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token =
            self.consume(TokenType::IDENTIFIER, format!("Expected {} name.", kind))?;

        let mut params: Vec<Token> = Vec::new();

        // A member with no parenthesis list is a getter.
        let is_getter: bool = !self.check(&TokenType::LEFT_PAREN);

        if !is_getter {
            self.consume(
                TokenType::LEFT_PAREN,
                format!("Expected '(' after {} name.", kind),
            )?;

            if !self.check(&TokenType::RIGHT_PAREN) {
                loop {
                    if params.len() >= 255 {
                        let line: usize = self.peek().line;
                        self.report(line, "Cannot have more than 255 parameters.");
                    }
                    params.push(self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?);

                    if !self.match_tokens(&[TokenType::COMMA]) {
                        break;
                    }
                }
            }

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;
        }

        self.consume(
            TokenType::LEFT_BRACE,
            format!("Expected '{{' to start {} body.", kind),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name: Some(name),
            params,
            body,
            is_getter,
        }))
    }

    fn let_declaration(&mut self) -> Result<Stmt> {
        let mut declarations: Vec<(Token, Option<Expr>)> = Vec::new();

        loop {
            let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

            let initializer: Option<Expr> = if self.match_tokens(&[TokenType::EQUAL]) {
                Some(self.assignment()?)
            } else {
                None
            };

            declarations.push((name, initializer));

            if !self.match_tokens(&[TokenType::COMMA]) {
                break;
            }
        }

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Let { declarations })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::IF]) {
            self.if_statement()
        } else if self.match_tokens(&[TokenType::FOR]) {
            self.for_statement()
        } else if self.match_tokens(&[TokenType::WHILE]) {
            self.while_statement()
        } else if self.match_tokens(&[TokenType::RETURN]) {
            self.return_statement()
        } else if self.match_tokens(&[TokenType::BREAK]) {
            self.break_statement()
        } else if self.match_tokens(&[TokenType::CONTINUE]) {
            self.continue_statement()
        } else if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);

        let else_branch: Option<Box<Stmt>> = if self.match_tokens(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after while condition.")?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// `for (init; cond; incr) body` desugars into
    /// `{ init; while (cond) { catch-continue(body); incr; } }`.
    /// The increment stays outside the continue catcher so `continue`
    /// still reaches it.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_tokens(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_tokens(&[TokenType::LET]) {
            Some(self.let_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let mut body: Stmt = self.statement()?;

        body = match increment {
            Some(increment) => Stmt::Block(vec![
                Stmt::TryCatchContinue {
                    body: Box::new(body),
                },
                Stmt::Expression(increment),
            ]),
            None => Stmt::TryCatchContinue {
                body: Box::new(body),
            },
        };

        let condition: Expr = condition.unwrap_or(Expr::Literal {
            value: LiteralExpr::Bool(true),
        });

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        self.consume(TokenType::SEMICOLON, "Expected ';' after break.")?;
        Ok(Stmt::Break { keyword })
    }

    fn continue_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        self.consume(TokenType::SEMICOLON, "Expected ';' after continue.")?;
        Ok(Stmt::Continue { keyword })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' at end of block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions, lowest precedence first
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::COMMA]) {
            let op: Token = self.previous().clone();
            self.report(op.line, "Missing left-hand operand before ','.");
            return self.assignment();
        }

        let mut expr: Expr = self.assignment()?;

        while self.match_tokens(&[TokenType::COMMA]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.assignment()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.conditional()?;

        if self.match_tokens(&[TokenType::EQUAL]) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            // The parsed l-value decides which assignment form this is.
            return match expr {
                Expr::Variable { name, .. } => {
                    let id: ExprId = ExprId::next();
                    Ok(Expr::Assign {
                        name,
                        value: Box::new(value),
                        id,
                    })
                }

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),

                Expr::GetIndex {
                    object,
                    index,
                    bracket,
                } => Ok(Expr::SetIndex {
                    object,
                    index,
                    value: Box::new(value),
                    bracket,
                }),

                _ => Err(self.report(equals.line, "Invalid assignment target.")),
            };
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_or()?;

        if self.match_tokens(&[TokenType::QUESTION_MARK]) {
            let then_branch: Expr = self.conditional()?;
            self.consume(TokenType::COLON, "Expected ':' after then branch.")?;
            let else_branch: Expr = self.conditional()?;

            expr = Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.match_tokens(&[TokenType::OR]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.match_tokens(&[TokenType::AND]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::EQUAL_EQUAL, TokenType::BANG_EQUAL]) {
            let op: Token = self.previous().clone();
            self.report(
                op.line,
                format!("Missing left-hand operand before '{}'.", op.lexeme),
            );
            return self.comparison();
        }

        let mut expr: Expr = self.comparison()?;

        while self.match_tokens(&[TokenType::EQUAL_EQUAL, TokenType::BANG_EQUAL]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        if self.match_tokens(&[
            TokenType::LESS,
            TokenType::LESS_EQUAL,
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
        ]) {
            let op: Token = self.previous().clone();
            self.report(
                op.line,
                format!("Missing left-hand operand before '{}'.", op.lexeme),
            );
            return self.term();
        }

        let mut expr: Expr = self.term()?;

        while self.match_tokens(&[
            TokenType::LESS,
            TokenType::LESS_EQUAL,
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
        ]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.match_tokens(&[TokenType::PLUS, TokenType::MINUS]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::STAR, TokenType::SLASH, TokenType::MODULO]) {
            let op: Token = self.previous().clone();
            self.report(
                op.line,
                format!("Missing left-hand operand before '{}'.", op.lexeme),
            );
            return self.unary();
        }

        let mut expr: Expr = self.unary()?;

        while self.match_tokens(&[TokenType::STAR, TokenType::SLASH, TokenType::MODULO]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expected property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.match_tokens(&[TokenType::LEFT_BRACKET]) {
                let bracket: Token = self.previous().clone();
                let index: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index.")?;
                expr = Expr::GetIndex {
                    object: Box::new(expr),
                    index: Box::new(index),
                    bracket,
                };
            } else {
                break;
            }
        }

        // An atom directly after a call chain means a '(' went missing.
        if self.check(&TokenType::IDENTIFIER)
            || self.check(&TokenType::STRING(String::new()))
            || self.check(&TokenType::NUMBER(0.0))
        {
            let line: usize = self.peek().line;
            return Err(self.report(line, "Expected '(' after function name."));
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let line: usize = self.peek().line;
                    self.report(line, "Cannot have more than 255 arguments.");
                }
                arguments.push(self.assignment()?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::FALSE]) {
            return Ok(Expr::Literal {
                value: LiteralExpr::Bool(false),
            });
        }

        if self.match_tokens(&[TokenType::TRUE]) {
            return Ok(Expr::Literal {
                value: LiteralExpr::Bool(true),
            });
        }

        if self.match_tokens(&[TokenType::NOTHING]) {
            return Ok(Expr::Literal {
                value: LiteralExpr::Nothing,
            });
        }

        if self.match_tokens(&[TokenType::NUMBER(0.0)]) {
            if let TokenType::NUMBER(n) = &self.previous().token_type {
                return Ok(Expr::Literal {
                    value: LiteralExpr::Number(*n),
                });
            }
            unreachable!("NUMBER token without numeric payload");
        }

        if self.match_tokens(&[TokenType::STRING(String::new())]) {
            if let TokenType::STRING(s) = &self.previous().token_type {
                return Ok(Expr::Literal {
                    value: LiteralExpr::Str(s.clone()),
                });
            }
            unreachable!("STRING token without string payload");
        }

        if self.match_tokens(&[TokenType::FUNC]) {
            return self.lambda();
        }

        if self.match_tokens(&[TokenType::THIS]) {
            let id: ExprId = ExprId::next();
            return Ok(Expr::This {
                keyword: self.previous().clone(),
                id,
            });
        }

        if self.match_tokens(&[TokenType::SUPER]) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expected '.' after 'super'.")?;
            let method: Token = self.consume(
                TokenType::IDENTIFIER,
                "Expected an identifier for super class method name after '.'",
            )?;
            let id: ExprId = ExprId::next();
            return Ok(Expr::Super {
                keyword,
                method,
                id,
            });
        }

        if self.match_tokens(&[TokenType::LEFT_BRACKET]) {
            let mut elements: Vec<Expr> = Vec::new();

            if !self.check(&TokenType::RIGHT_BRACKET) {
                loop {
                    elements.push(self.assignment()?);

                    if !self.match_tokens(&[TokenType::COMMA]) {
                        break;
                    }
                }
            }

            self.consume(
                TokenType::RIGHT_BRACKET,
                "Expected ']' at the end of array elements.",
            )?;

            return Ok(Expr::Array { elements });
        }

        if self.match_tokens(&[TokenType::IDENTIFIER]) {
            let id: ExprId = ExprId::next();
            return Ok(Expr::Variable {
                name: self.previous().clone(),
                id,
            });
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;
            return Ok(Expr::Grouping {
                expression: Box::new(expr),
            });
        }

        let line: usize = self.peek().line;
        Err(self.report(line, "Expected an expression."))
    }

    fn lambda(&mut self) -> Result<Expr> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'func'.")?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let line: usize = self.peek().line;
                    self.report(line, "Cannot have more than 255 parameters.");
                }
                params.push(self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before lambda body.")?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Expr::Lambda {
            function: Rc::new(FunctionDecl {
                name: None,
                params,
                body,
                is_getter: false,
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token-stream plumbing
    // ─────────────────────────────────────────────────────────────────────

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn consume<S: Into<String>>(&mut self, token_type: TokenType, message: S) -> Result<Token> {
        if self.check(&token_type) {
            return Ok(self.advance().clone());
        }

        let line: usize = self.peek().line;
        Err(self.report(line, message))
    }

    /// Records a diagnostic and hands it back so fatal sites can `Err` it.
    fn report<S: Into<String>>(&mut self, line: usize, message: S) -> FlintError {
        let message: String = message.into();
        self.errors.push(FlintError::parse(line, message.clone()));
        FlintError::parse(line, message)
    }

    /// Skips tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUNC
                | TokenType::LET
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}
