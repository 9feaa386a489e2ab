use crate::ast::Literal;
use crate::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, span: Span) -> Self {
        Token {
            token_type,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    /// The literal value carried by string and number tokens.
    pub fn literal(&self) -> Option<Literal> {
        match &self.token_type {
            TokenType::String(s) => Some(Literal::Str(s.clone())),
            TokenType::Number(n) => Some(Literal::Number(*n)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }
    Comma,      // ,
    Dot,        // .
    Minus,      // -
    Plus,       // +
    Semicolon,  // ;
    Slash,      // /
    Star,       // *
    Question,   // ?
    Colon,      // :

    // One or two character tokens
    Bang,         // !
    BangEqual,    // !=
    Equal,        // =
    EqualEqual,   // ==
    Greater,      // >
    GreaterEqual, // >=
    Less,         // <
    LessEqual,    // <=

    // Literals
    Identifier,     // variable names, function names
    String(String), // "hello world"
    Number(f64),    // 123, 45.67

    // Keywords
    And,    // and
    Break,  // break
    Class,  // class
    Else,   // else
    False,  // false
    Fun,    // fun
    For,    // for
    If,     // if
    Nil,    // nil
    Or,     // or
    Print,  // print
    Return, // return
    Super,  // super
    This,   // this
    True,   // true
    Var,    // var
    While,  // while

    // Control
    Eof, // end of file
}
