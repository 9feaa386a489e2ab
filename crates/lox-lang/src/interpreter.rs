pub mod callable;
pub mod environment;
pub mod native_function;
pub mod value;

use crate::config::{ClosureScope, RuntimeConfig};
use crate::interpreter::callable::Arguments;
use crate::interpreter::environment::Environment;
use crate::interpreter::native_function::all_native_functions;
use crate::interpreter::value::{Function, Value};
use log::{debug, trace};
use lox_core::ast::{Expr, Stmt};
use lox_core::scanner::token::{Token, TokenType};
use lox_core::span::Span;
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;

const BREAK_OUTSIDE_LOOP: &str = "Cannot use 'break' outside of a loop.";

// Outcome of running a statement or evaluating an expression. A Break travels up through
// blocks, ifs and function calls until the nearest running loop absorbs it.
// Crate-private, a break never leaves the interpreter as anything but a RuntimeError.
#[derive(Debug, Clone)]
pub(crate) enum ControlFlow {
    Value(Value), // statements complete with Value(Nil)
    Break(Span),  // span of the `break` keyword
}

// saves wrapping every value in ControlFlow::Value by hand, it's just an .into()
impl From<Value> for ControlFlow {
    fn from(v: Value) -> Self {
        ControlFlow::Value(v)
    }
}

// Propagate control flow, discard value
macro_rules! prop {
    ($expr:expr) => {
        match $expr? {
            ControlFlow::Value(_) => {}
            other => return Ok(other),
        }
    };
}

// Propagate control flow, extract value
macro_rules! prop_val {
    ($expr:expr) => {
        match $expr? {
            ControlFlow::Value(v) => v,
            other => return Ok(other),
        }
    };
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}\n[line {line}]", line = .span.line)]
pub struct RuntimeError {
    pub span: Span,
    pub message: String,
}

impl RuntimeError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

pub struct Interpreter<'a> {
    globals: Rc<Environment>,
    // Head of the scope chain. Swapped for a child around every block and call.
    env: Rc<Environment>,
    config: RuntimeConfig,
    output: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(output: &'a mut dyn Write, config: RuntimeConfig) -> Self {
        let globals = Rc::new(Environment::new());
        for (name, native_function) in all_native_functions() {
            globals.define(name, native_function);
        }

        Self {
            env: Rc::clone(&globals),
            globals,
            config,
            output,
        }
    }

    pub fn globals(&self) -> &Rc<Environment> {
        &self.globals
    }

    /// Runs `statements` in order, stopping at the first runtime error.
    /// Globals defined here stay around for the next call.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        debug!("interpreting {} statements", statements.len());
        for statement in statements {
            // only reachable through a function that was declared in a loop and called outside it
            if let ControlFlow::Break(keyword) = self.execute(statement)? {
                return Err(RuntimeError::new(keyword, BREAK_OUTSIDE_LOOP));
            }
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match statement {
            Stmt::Block { statements } => {
                let environment = Rc::new(Environment::new_with_enclosing(Rc::clone(&self.env)));
                self.execute_block(statements, environment)
            }
            Stmt::Break { keyword } => Ok(ControlFlow::Break(keyword.span)),
            Stmt::Expression(expr) => {
                prop!(self.evaluate(expr));
                Ok(Value::Nil.into())
            }
            Stmt::Function(declaration) => {
                let closure = match self.config.closure_scope {
                    ClosureScope::Global => Rc::clone(&self.globals),
                    ClosureScope::Lexical => Rc::clone(&self.env),
                };
                trace!(
                    "defining <fn {}> with {:?} closure",
                    declaration.name.lexeme,
                    self.config.closure_scope
                );
                let function = Function {
                    declaration: Rc::clone(declaration),
                    closure,
                };
                self.env
                    .define(&declaration.name.lexeme, Value::Fn(Rc::new(function)));
                Ok(Value::Nil.into())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if prop_val!(self.evaluate(condition)).is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Value::Nil.into())
                }
            }
            Stmt::Print(expr) => {
                let value = prop_val!(self.evaluate(expr));
                writeln!(self.output, "{}", value).map_err(|e| {
                    RuntimeError::new(Span::default(), format!("Failed to write output: {}", e))
                })?;
                Ok(Value::Nil.into())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => prop_val!(self.evaluate(expr)),
                    None => Value::Nil,
                };
                self.env.define(&name.lexeme, value);
                Ok(Value::Nil.into())
            }
            Stmt::While { condition, body } => {
                // a break raised anywhere below, called functions included, ends this loop
                loop {
                    let keep_going = match self.evaluate(condition)? {
                        ControlFlow::Value(v) => v.is_truthy(),
                        ControlFlow::Break(_) => false,
                    };
                    if !keep_going {
                        break;
                    }
                    if let ControlFlow::Break(_) = self.execute(body)? {
                        break;
                    }
                }
                Ok(Value::Nil.into())
            }
        }
    }

    /// Runs `statements` with `environment` as the current scope, then puts the old scope back
    /// whether or not they succeeded.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<Environment>,
    ) -> Result<ControlFlow, RuntimeError> {
        let previous = std::mem::replace(&mut self.env, environment);

        let result: Result<ControlFlow, RuntimeError> = (|| {
            for statement in statements {
                prop!(self.execute(statement));
            }
            Ok(Value::Nil.into())
        })();

        self.env = previous;
        result
    }

    fn evaluate(&mut self, expression: &Expr) -> Result<ControlFlow, RuntimeError> {
        match expression {
            Expr::Assign { name, value } => {
                let value = prop_val!(self.evaluate(value));
                self.env.assign(name, value.clone())?;
                Ok(value.into())
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = prop_val!(self.evaluate(left));
                let right = prop_val!(self.evaluate(right));
                binary(operator, left, right).map(ControlFlow::from)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = prop_val!(self.evaluate(callee));

                let mut argument_values = Arguments::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(prop_val!(self.evaluate(argument)));
                }

                let callable = callee.as_callable().ok_or_else(|| {
                    RuntimeError::new(paren.span, "Can only call functions and classes.")
                })?;

                if argument_values.len() != callable.arity() {
                    return Err(RuntimeError::new(
                        paren.span,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            argument_values.len()
                        ),
                    ));
                }

                callable.call(self, argument_values, paren.span)
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if prop_val!(self.evaluate(condition)).is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Literal(literal) => Ok(Value::from(literal).into()),
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = prop_val!(self.evaluate(left));

                let short_circuit = if operator.token_type == TokenType::Or {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left.into())
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Unary { operator, operand } => {
                let operand = prop_val!(self.evaluate(operand));
                match operator.token_type {
                    TokenType::Minus => match operand {
                        Value::Num(n) => Ok(Value::Num(-n).into()),
                        _ => Err(RuntimeError::new(
                            operator.span,
                            "Operand must be a number.",
                        )),
                    },
                    TokenType::Bang => Ok(Value::Bool(!operand.is_truthy()).into()),
                    _ => Err(unknown_operator(operator)),
                }
            }
            Expr::Variable { name } => self.env.get(name).map(ControlFlow::from),
        }
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator.token_type {
        // left was only evaluated for its effects
        TokenType::Comma => Ok(right),
        TokenType::EqualEqual => Ok(Value::Bool(left == right)),
        TokenType::BangEqual => Ok(Value::Bool(left != right)),
        TokenType::Plus => match (&left, &right) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{}{}", a, b)))),
            _ => Err(RuntimeError::new(
                operator.span,
                "Operands must be two numbers or two strings.",
            )),
        },
        _ => {
            let (a, b) = match (&left, &right) {
                (Value::Num(a), Value::Num(b)) => (*a, *b),
                _ => {
                    return Err(RuntimeError::new(
                        operator.span,
                        "Operands must be numbers.",
                    ))
                }
            };

            match operator.token_type {
                TokenType::Minus => Ok(Value::Num(a - b)),
                // IEEE division, so 1 / 0 is inf rather than an error
                TokenType::Slash => Ok(Value::Num(a / b)),
                TokenType::Star => Ok(Value::Num(a * b)),
                TokenType::Greater => Ok(Value::Bool(a > b)),
                TokenType::GreaterEqual => Ok(Value::Bool(a >= b)),
                TokenType::Less => Ok(Value::Bool(a < b)),
                TokenType::LessEqual => Ok(Value::Bool(a <= b)),
                _ => Err(unknown_operator(operator)),
            }
        }
    }
}

fn unknown_operator(operator: &Token) -> RuntimeError {
    RuntimeError::new(
        operator.span,
        format!("Unknown operator '{}'.", operator.lexeme),
    )
}
