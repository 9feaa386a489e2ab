//! Parenthesized prefix rendering of the syntax tree, used by `--print-ast` and the parser tests.

use crate::ast::{Expr, Literal, Stmt};

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Assign { name, value } => parenthesize("=", &[name.lexeme.clone(), print_expr(value)]),
        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => parenthesize(&operator.lexeme, &[print_expr(left), print_expr(right)]),
        Expr::Call {
            callee, arguments, ..
        } => {
            let mut parts = vec![print_expr(callee)];
            parts.extend(arguments.iter().map(print_expr));
            parenthesize("call", &parts)
        }
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => parenthesize(
            "?:",
            &[
                print_expr(condition),
                print_expr(then_branch),
                print_expr(else_branch),
            ],
        ),
        Expr::Grouping { expression } => parenthesize("group", &[print_expr(expression)]),
        Expr::Literal(literal) => print_literal(literal),
        Expr::Unary { operator, operand } => {
            parenthesize(&operator.lexeme, &[print_expr(operand)])
        }
        Expr::Variable { name } => name.lexeme.clone(),
    }
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Block { statements } => {
            let parts: Vec<String> = statements.iter().map(print_stmt).collect();
            parenthesize("block", &parts)
        }
        Stmt::Break { .. } => "(break)".to_string(),
        Stmt::Expression(expr) => parenthesize(";", &[print_expr(expr)]),
        Stmt::Function(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
            let mut parts = vec![decl.name.lexeme.clone(), format!("({})", params.join(" "))];
            parts.extend(decl.body.iter().map(print_stmt));
            parenthesize("fun", &parts)
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut parts = vec![print_expr(condition), print_stmt(then_branch)];
            if let Some(else_branch) = else_branch {
                parts.push(print_stmt(else_branch));
            }
            parenthesize("if", &parts)
        }
        Stmt::Print(expr) => parenthesize("print", &[print_expr(expr)]),
        Stmt::Var { name, initializer } => match initializer {
            Some(init) => parenthesize("var", &[name.lexeme.clone(), print_expr(init)]),
            None => parenthesize("var", &[name.lexeme.clone()]),
        },
        Stmt::While { condition, body } => {
            parenthesize("while", &[print_expr(condition), print_stmt(body)])
        }
    }
}

fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::Str(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

fn parenthesize(name: &str, parts: &[String]) -> String {
    let mut out = format!("({}", name);
    for part in parts {
        out.push(' ');
        out.push_str(part);
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::token::{Token, TokenType};
    use crate::span::Span;

    fn token(token_type: TokenType, lexeme: &str) -> Token {
        Token::new(token_type, lexeme, Span::default())
    }

    fn number(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Number(n)))
    }

    #[test]
    fn prints_nested_binary_expression() {
        // 1 + (2 * 3)
        let expr = Expr::Binary {
            left: number(1.0),
            operator: token(TokenType::Plus, "+"),
            right: Box::new(Expr::Grouping {
                expression: Box::new(Expr::Binary {
                    left: number(2.0),
                    operator: token(TokenType::Star, "*"),
                    right: number(3.0),
                }),
            }),
        };
        assert_eq!(print_expr(&expr), "(+ 1 (group (* 2 3)))");
    }

    #[test]
    fn prints_literals() {
        assert_eq!(print_expr(&Expr::Literal(Literal::Nil)), "nil");
        assert_eq!(print_expr(&Expr::Literal(Literal::Bool(false))), "false");
        assert_eq!(print_expr(&Expr::Literal(Literal::Number(2.5))), "2.5");
        assert_eq!(
            print_expr(&Expr::Literal(Literal::Str("hi".into()))),
            "\"hi\""
        );
    }

    #[test]
    fn prints_var_without_initializer() {
        let stmt = Stmt::Var {
            name: token(TokenType::Identifier, "x"),
            initializer: None,
        };
        assert_eq!(print_stmt(&stmt), "(var x)");
    }

    #[test]
    fn prints_if_with_else() {
        let stmt = Stmt::If {
            condition: Expr::Variable {
                name: token(TokenType::Identifier, "c"),
            },
            then_branch: Box::new(Stmt::Print(*number(1.0))),
            else_branch: Some(Box::new(Stmt::Print(*number(2.0)))),
        };
        assert_eq!(print_stmt(&stmt), "(if c (print 1) (print 2))");
    }
}
