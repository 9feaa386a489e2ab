use crate::ast::{Expr, FunctionDecl, Literal, Stmt};
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use log::debug;
use std::rc::Rc;
use thiserror::Error;

pub const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{location}: {message}", line = .span.line)]
pub struct ParseError {
    pub span: Span,
    pub location: String, // " at end" or " at 'lexeme'"
    pub message: String,
}

/// Everything the parser produced, including statements it had to skip over.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub statements: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

type StmtResult = Result<Stmt, ParseError>;
type ExprResult = Result<Expr, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    loop_depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    // utility methods
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return *token_type == TokenType::Eof;
        }
        self.peek().token_type == *token_type
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check(&token_type) {
            Ok(self.advance().clone())
        } else {
            Err(self.error(self.peek(), message))
        }
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        let location = if token.token_type == TokenType::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        ParseError {
            span: token.span,
            location,
            message: message.to_string(),
        }
    }

    // Records an error without unwinding the rule that found it.
    fn report(&mut self, token: &Token, message: &str) {
        let error = self.error(token, message);
        self.errors.push(error);
    }

    pub fn parse(mut self) -> ParseResult {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        debug!(
            "parsed {} statements with {} errors",
            statements.len(),
            self.errors.len()
        );
        ParseResult {
            statements,
            errors: self.errors,
        }
    }

    fn synchronize(&mut self) {
        self.advance(); // Skip the token that caused the error

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_any(&[TokenType::Var]) {
            self.var_declaration()
        } else if self.match_any(&[TokenType::Fun]) {
            self.function("function")
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> StmtResult {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer = if self.match_any(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn function(&mut self, kind: &str) -> StmtResult {
        let name = self.consume(TokenType::Identifier, &format!("Expect {} name.", kind))?;
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.report(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        // the loop depth carries into the body, so a function declared in a loop may break it
        let body = self.block()?;

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
        })))
    }

    fn statement(&mut self) -> StmtResult {
        if self.match_any(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_any(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_any(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_any(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_any(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else if self.match_any(&[TokenType::Break]) {
            self.break_statement()
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> StmtResult {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_any(&[TokenType::Else]) {
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

    // Runs a loop rule with the loop depth raised, so `break` inside it is legal.
    fn in_loop<F>(&mut self, rule: F) -> StmtResult
    where
        F: FnOnce(&mut Self) -> StmtResult,
    {
        self.loop_depth += 1;
        let result = rule(self);
        self.loop_depth -= 1;
        result
    }

    fn while_statement(&mut self) -> StmtResult {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        self.in_loop(|p| {
            let condition = p.expression()?;
            p.consume(TokenType::RightParen, "Expect ')' after condition.")?;
            let body = Box::new(p.statement()?);
            Ok(Stmt::While { condition, body })
        })
    }

    // for (init; cond; incr) body  =>  { init; while (cond) { body; incr; } }
    fn for_statement(&mut self) -> StmtResult {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        self.in_loop(|p| {
            let initializer = if p.match_any(&[TokenType::Semicolon]) {
                None
            } else if p.match_any(&[TokenType::Var]) {
                Some(p.var_declaration()?)
            } else {
                Some(p.expression_statement()?)
            };

            let condition = if p.check(&TokenType::Semicolon) {
                None
            } else {
                Some(p.expression()?)
            };
            p.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

            let increment = if p.check(&TokenType::RightParen) {
                None
            } else {
                Some(p.expression()?)
            };
            p.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

            let mut body = p.statement()?;

            if let Some(increment) = increment {
                body = Stmt::Block {
                    statements: vec![body, Stmt::Expression(increment)],
                };
            }

            body = Stmt::While {
                condition: condition.unwrap_or(Expr::Literal(Literal::Bool(true))),
                body: Box::new(body),
            };

            if let Some(initializer) = initializer {
                body = Stmt::Block {
                    statements: vec![initializer, body],
                };
            }

            Ok(body)
        })
    }

    fn break_statement(&mut self) -> StmtResult {
        let keyword = self.previous().clone();
        if self.loop_depth == 0 {
            self.report(&keyword, "Must be inside a loop to use 'break'.");
        }
        self.consume(TokenType::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Stmt::Break { keyword })
    }

    fn print_statement(&mut self) -> StmtResult {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> StmtResult {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.logic_or()?;

        if self.match_any(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?); // right-associative

            return match expr {
                Expr::Variable { name } => Ok(Expr::Assign { name, value }),
                other => {
                    self.report(&equals, "Invalid assignment target.");
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    // Pretty much all binary levels look the same, only the operators and the next level differ
    fn binary_expression<F>(&mut self, tokens: &[TokenType], mut next_precedence: F) -> ExprResult
    where
        F: FnMut(&mut Self) -> ExprResult,
    {
        // left associative: keep folding into `left`
        let mut left = next_precedence(self)?;

        while self.match_any(tokens) {
            let operator = self.previous().clone();
            let right = next_precedence(self)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn logical_expression<F>(&mut self, token: TokenType, mut next_precedence: F) -> ExprResult
    where
        F: FnMut(&mut Self) -> ExprResult,
    {
        let mut left = next_precedence(self)?;

        while self.check(&token) {
            let operator = self.advance().clone();
            let right = next_precedence(self)?;
            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn logic_or(&mut self) -> ExprResult {
        self.logical_expression(TokenType::Or, |p| p.logic_and())
    }

    fn logic_and(&mut self) -> ExprResult {
        self.logical_expression(TokenType::And, |p| p.conditional())
    }

    fn conditional(&mut self) -> ExprResult {
        let mut expr = self.comma()?;

        while self.match_any(&[TokenType::Question]) {
            let then_branch = self.expression()?;
            self.consume(
                TokenType::Colon,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch = self.conditional()?;
            expr = Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            };
        }

        Ok(expr)
    }

    fn comma(&mut self) -> ExprResult {
        self.binary_expression(&[TokenType::Comma], |p| p.equality())
    }

    fn equality(&mut self) -> ExprResult {
        self.binary_expression(&[TokenType::BangEqual, TokenType::EqualEqual], |p| {
            p.comparison()
        })
    }

    fn comparison(&mut self) -> ExprResult {
        self.binary_expression(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            |p| p.term(),
        )
    }

    fn term(&mut self) -> ExprResult {
        self.binary_expression(&[TokenType::Minus, TokenType::Plus], |p| p.factor())
    }

    fn factor(&mut self) -> ExprResult {
        self.binary_expression(&[TokenType::Slash, TokenType::Star], |p| p.unary())
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let operand = self.unary()?; // recursive for chained unary: --x
            Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
            })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;

        while self.match_any(&[TokenType::LeftParen]) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ExprResult {
        let mut arguments = Vec::new();

        if !self.check(&TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.report(&token, "Can't have more than 255 arguments.");
                }
                // below the comma level, so ',' separates arguments
                arguments.push(self.equality()?);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ExprResult {
        let token = self.peek().clone();

        let expr = match &token.token_type {
            TokenType::False => Expr::Literal(Literal::Bool(false)),
            TokenType::True => Expr::Literal(Literal::Bool(true)),
            TokenType::Nil => Expr::Literal(Literal::Nil),
            TokenType::Number(n) => Expr::Literal(Literal::Number(*n)),
            TokenType::String(s) => Expr::Literal(Literal::Str(s.clone())),
            TokenType::Identifier => Expr::Variable { name: token },
            TokenType::LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping {
                    expression: Box::new(expression),
                });
            }
            _ => return Err(self.error(&token, "Expect expression.")),
        };

        self.advance();
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::{print_expr, print_stmt};
    use crate::scanner::scan_tokens;

    fn parse(source: &str) -> ParseResult {
        Parser::new(scan_tokens(source).unwrap()).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        let result = parse(source);
        assert!(
            !result.has_errors(),
            "unexpected parse errors: {:?}",
            result.errors
        );
        result.statements
    }

    // parses a single expression statement and prints it
    fn expr(source: &str) -> String {
        let statements = parse_ok(&format!("{};", source));
        match &statements[..] {
            [Stmt::Expression(e)] => print_expr(e),
            other => panic!("expected one expression statement, got {:?}", other),
        }
    }

    fn messages(result: &ParseResult) -> Vec<&str> {
        result.errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(expr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(expr("-!x"), "(- (! x))");
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        assert_eq!(expr("1 < 2 == 3 >= 4"), "(== (< 1 2) (>= 3 4))");
    }

    #[test]
    fn comma_is_looser_than_equality() {
        assert_eq!(expr("a == b, c"), "(, (== a b) c)");
        assert_eq!(expr("a, b, c"), "(, (, a b) c)");
    }

    #[test]
    fn conditional_is_looser_than_comma() {
        assert_eq!(expr("a, b ? c : d"), "(?: (, a b) c d)");
        assert_eq!(expr("a ? b : c ? d : e"), "(?: a b (?: c d e))");
    }

    #[test]
    fn logical_operators_wrap_conditional() {
        assert_eq!(expr("a or b and c"), "(or a (and b c))");
        assert_eq!(expr("a and b ? c : d"), "(and a (?: b c d))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(expr("a = b = 1"), "(= a (= b 1))");
    }

    #[test]
    fn call_arguments_are_split_on_commas() {
        assert_eq!(expr("f(1, 2 + 3)(x)"), "(call (call f 1 (+ 2 3)) x)");
        assert_eq!(expr("f()"), "(call f)");
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_parsing_continues() {
        let result = parse("a + b = c; print 1;");
        assert_eq!(messages(&result), vec!["Invalid assignment target."]);
        assert_eq!(result.statements.len(), 2);
        assert_eq!(result.errors[0].location, " at '='");
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(
            print_stmt(&statements[0]),
            "(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"
        );
    }

    #[test]
    fn for_loop_without_clauses_loops_forever() {
        let statements = parse_ok("for (;;) break;");
        assert_eq!(print_stmt(&statements[0]), "(while true (break))");
    }

    #[test]
    fn break_outside_loop_is_reported_and_still_produced() {
        let result = parse("break;");
        assert_eq!(messages(&result), vec!["Must be inside a loop to use 'break'."]);
        assert!(matches!(result.statements[..], [Stmt::Break { .. }]));
    }

    #[test]
    fn break_inside_loops_is_accepted() {
        parse_ok("while (true) { if (x) break; }");
        parse_ok("for (;;) { { break; } }");
    }

    #[test]
    fn break_in_function_body_counts_enclosing_loop() {
        parse_ok("while (true) { fun f() { break; } f(); }");
        parse_ok("for (;;) { fun f() { if (true) break; } }");
    }

    #[test]
    fn break_in_function_outside_any_loop_is_reported() {
        let result = parse("fun f() { break; }");
        assert_eq!(messages(&result), vec!["Must be inside a loop to use 'break'."]);
        assert_eq!(result.statements.len(), 1);
    }

    #[test]
    fn missing_semicolon_reports_at_end() {
        let result = parse("print 1");
        assert_eq!(messages(&result), vec!["Expect ';' after value."]);
        assert_eq!(
            result.errors[0].to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn synchronize_reports_one_error_per_broken_statement() {
        let result = parse("var = 1;\nprint 2;\nvar x = ;\nprint 3;");
        assert_eq!(
            messages(&result),
            vec!["Expect variable name.", "Expect expression."]
        );
        let printed: Vec<String> = result.statements.iter().map(print_stmt).collect();
        assert_eq!(printed, vec!["(print 2)", "(print 3)"]);
    }

    #[test]
    fn errors_inside_blocks_keep_the_rest_of_the_block() {
        let result = parse("{ print ; print 1; }");
        assert_eq!(messages(&result), vec!["Expect expression."]);
        assert_eq!(print_stmt(&result.statements[0]), "(block (print 1))");
    }

    #[test]
    fn function_declaration() {
        let statements = parse_ok("fun add(a, b) { print a + b; }");
        assert_eq!(
            print_stmt(&statements[0]),
            "(fun add (a b) (print (+ a b)))"
        );
    }

    #[test]
    fn too_many_arguments_is_reported_without_aborting() {
        let args = vec!["1"; 256].join(", ");
        let result = parse(&format!("f({});", args));
        assert_eq!(messages(&result), vec!["Can't have more than 255 arguments."]);
        match &result.statements[..] {
            [Stmt::Expression(Expr::Call { arguments, .. })] => assert_eq!(arguments.len(), 256),
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn too_many_parameters_is_reported() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let result = parse(&format!("fun f({}) {{}}", params.join(", ")));
        assert_eq!(messages(&result), vec!["Can't have more than 255 parameters."]);
        assert_eq!(result.statements.len(), 1);
    }

    #[test]
    fn unterminated_block_reports_at_end() {
        let result = parse("{ print 1;");
        assert_eq!(messages(&result), vec!["Expect '}' after block."]);
        assert_eq!(result.errors[0].location, " at end");
    }
}
