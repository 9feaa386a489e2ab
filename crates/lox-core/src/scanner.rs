pub mod token;

use crate::keywords::keyword;
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use log::debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}", line = .span.line)]
pub struct ScanError {
    pub span: Span,
    pub message: String,
}

/// Scans `source` into tokens terminated by `Eof`. The first lexical error aborts the scan.
pub fn scan_tokens(source: &str) -> Result<Vec<Token>, ScanError> {
    Scanner::new(source).scan_tokens()
}

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
    // position of the token being scanned, fixed before its first char is consumed
    start_line: usize,
    start_col: usize,
}

impl Scanner {
    pub fn new(source: impl Into<String>) -> Self {
        Scanner {
            source: source.into().chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            start_line: 1,
            start_col: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, ScanError> {
        while !self.is_at_end() {
            self.mark_start();
            self.scan_token()?;
        }

        self.mark_start();
        let eof_span = Span {
            line: self.line,
            col: self.start_col,
            length: 0,
        };
        self.tokens.push(Token::new(TokenType::Eof, "", eof_span));
        debug!("scanned {} tokens", self.tokens.len());
        Ok(self.tokens)
    }

    fn mark_start(&mut self) {
        self.start = self.current;
        self.start_line = self.line;
        self.start_col = self.current - self.line_start + 1;
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '?' => self.add_token(TokenType::Question),
            ':' => self.add_token(TokenType::Colon),

            '*' => {
                if self.match_char('/') {
                    return Err(self.error("Unexpected closing block comment."));
                }
                self.add_token(TokenType::Star)
            }

            // One or two character tokens
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }

            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }

            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.block_comment()?;
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            ' ' | '\r' | '\t' => {}

            '\n' => self.newline(),

            '"' => self.string()?,

            c if c.is_ascii_digit() => self.number()?,

            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            _ => return Err(self.error("Unexpected character.")),
        }
        Ok(())
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.current += 1;
                true
            }
            _ => false,
        }
    }

    // call right after consuming a '\n'
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        let mut depth = 1;
        while !self.is_at_end() {
            match (self.peek(), self.peek_next()) {
                (Some('/'), Some('*')) => {
                    depth += 1;
                    self.current += 2;
                }
                (Some('*'), Some('/')) => {
                    depth -= 1;
                    self.current += 2;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {
                    if self.advance() == '\n' {
                        self.newline();
                    }
                }
            }
        }
        Err(self.error("Unclosed block comment."))
    }

    fn string(&mut self) -> Result<(), ScanError> {
        while self.peek().is_some_and(|c| c != '"') {
            if self.advance() == '\n' {
                self.newline();
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string."));
        }

        // the closing quote
        self.advance();

        // value excludes the surrounding quotes, the lexeme keeps them
        let value = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect::<String>();
        self.add_token(TokenType::String(value));
        Ok(())
    }

    fn number(&mut self) -> Result<(), ScanError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // consume '.'

            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(num) => {
                self.add_token(TokenType::Number(num));
                Ok(())
            }
            Err(_) => Err(self.error(format!("Invalid number '{}'.", text))),
        }
    }

    fn identifier(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn add_token(&mut self, t: TokenType) {
        let text = self.source[self.start..self.current]
            .iter()
            .collect::<String>();
        let span = Span {
            line: self.start_line,
            col: self.start_col,
            length: self.current - self.start,
        };
        self.tokens.push(Token::new(t, text, span));
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            span: Span {
                line: self.line,
                col: self.start_col,
                length: (self.current - self.start).max(1),
            },
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        scan_tokens(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    fn scan_error(source: &str) -> ScanError {
        match scan_tokens(source) {
            Ok(tokens) => panic!("expected a scan error, got {:?}", tokens),
            Err(e) => e,
        }
    }

    #[test]
    fn scan_basic_tokens() {
        assert_eq!(
            token_types("var x = 5;"),
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Number(5.0),
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scan_two_character_operators() {
        assert_eq!(
            token_types("! != = == < <= > >="),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scan_ternary_punctuation() {
        assert_eq!(
            token_types("a ? b : c"),
            vec![
                TokenType::Identifier,
                TokenType::Question,
                TokenType::Identifier,
                TokenType::Colon,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            token_types("break breaker _fun fun"),
            vec![
                TokenType::Break,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Fun,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn number_literals_round_trip() {
        for text in ["0", "7", "42", "3.14", "0.5", "100.001", "123456789.25"] {
            let tokens = scan_tokens(text).unwrap();
            assert_eq!(tokens.len(), 2);
            let expected: f64 = text.parse().unwrap();
            assert_eq!(tokens[0].token_type, TokenType::Number(expected));
            assert_eq!(tokens[0].lexeme, text);
        }
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        assert_eq!(
            token_types("1."),
            vec![TokenType::Number(1.0), TokenType::Dot, TokenType::Eof]
        );
        assert_eq!(
            token_types(".5"),
            vec![TokenType::Dot, TokenType::Number(5.0), TokenType::Eof]
        );
    }

    #[test]
    fn string_literal_value_excludes_quotes() {
        let tokens = scan_tokens("\"hello world\"").unwrap();
        assert_eq!(
            tokens[0].token_type,
            TokenType::String("hello world".to_string())
        );
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(
            tokens[0].literal(),
            Some(crate::ast::Literal::Str("hello world".to_string()))
        );
    }

    #[test]
    fn newlines_inside_strings_are_counted() {
        let tokens = scan_tokens("\"a\nb\"\nx").unwrap();
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line(), 3);
    }

    #[test]
    fn line_comment_ignored() {
        assert_eq!(
            token_types("// hello\n5"),
            vec![TokenType::Number(5.0), TokenType::Eof]
        );
    }

    #[test]
    fn nested_block_comments_at_any_depth() {
        for depth in 1..=6 {
            let source = format!("{}x{} 5", "/* ".repeat(depth), " */".repeat(depth));
            assert_eq!(
                token_types(&source),
                vec![TokenType::Number(5.0), TokenType::Eof],
                "depth {}",
                depth
            );
        }
    }

    #[test]
    fn block_comment_counts_lines() {
        let tokens = scan_tokens("/* one\n /* two\n */ */\nx").unwrap();
        assert_eq!(tokens[0].line(), 4);
    }

    #[test]
    fn unclosed_block_comment_is_an_error() {
        let error = scan_error("/* /* */ 5");
        assert_eq!(error.message, "Unclosed block comment.");
    }

    #[test]
    fn lone_closing_block_comment_is_an_error() {
        let error = scan_error("*/");
        assert_eq!(error.message, "Unexpected closing block comment.");
        assert_eq!(error.span.line, 1);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let error = scan_error("print \"oops;\n");
        assert_eq!(error.message, "Unterminated string.");
        assert_eq!(error.to_string(), "[line 2] Error: Unterminated string.");
    }

    #[test]
    fn unexpected_character_aborts() {
        let error = scan_error("var a = 1;\nvar b = @;");
        assert_eq!(error.message, "Unexpected character.");
        assert_eq!(error.span.line, 2);
        assert_eq!(error.span.col, 9);
    }

    #[test]
    fn spans_track_columns() {
        let tokens = scan_tokens("var answer = 42;").unwrap();
        let answer = &tokens[1];
        assert_eq!(answer.span, Span { line: 1, col: 5, length: 6 });
        let eof = tokens.last().unwrap();
        assert_eq!(eof.token_type, TokenType::Eof);
        assert_eq!(eof.span.col, 17);
    }
}
