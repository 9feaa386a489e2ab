use super::callable::Callable;
use super::environment::Environment;
use lox_core::ast::{FunctionDecl, Literal};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Nil,
    Num(f64),
    Str(Rc<str>),
    Fn(Rc<Function>),
    NativeFn(Rc<NativeFunction>),
}

impl Value {
    /// nil and false are falsy, everything else (0 and "" included) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub(crate) fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Fn(fun) => Some(fun.as_ref() as &dyn Callable),
            Value::NativeFn(native_fun) => Some(native_fun.as_ref() as &dyn Callable),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
            Literal::Number(n) => Value::Num(*n),
            Literal::Str(s) => Value::Str(Rc::from(s.as_str())),
        }
    }
}

/// A user function. `closure` is the environment each call's parameter scope encloses.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("body", &"<stmts>")
            .field("closure", &"<env>")
            .finish()
    }
}

#[derive(Debug)]
pub struct NativeFunction {
    pub name: Rc<str>,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(b1), Self::Bool(b2)) => b1 == b2,
            (Self::Nil, Self::Nil) => true,
            (Self::Num(n1), Self::Num(n2)) => n1 == n2,
            (Self::Str(s1), Self::Str(s2)) => s1 == s2,
            (Self::Fn(f1), Self::Fn(f2)) => Rc::ptr_eq(f1, f2),
            (Self::NativeFn(f1), Self::NativeFn(f2)) => Rc::ptr_eq(f1, f2),
            (_, _) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Fn(fun) => write!(f, "<fn {}>", fun.name()),
            Value::NativeFn(_) => write!(f, "<native fn>"),
        }
    }
}

// f64 Display already drops the trailing ".0". Zero loses its sign and infinities are
// spelled out, as script authors expect from `print`.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        n.to_string()
    }
}
