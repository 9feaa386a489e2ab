use crate::interpreter::value::Value;
use crate::interpreter::RuntimeError;
use lox_core::scanner::token::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<Rc<Environment>>,
    values: RefCell<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_enclosing(enclosing: Rc<Environment>) -> Self {
        Self {
            enclosing: Some(enclosing),
            values: RefCell::new(HashMap::new()),
        }
    }

    /// Binds `name` in this scope, replacing any previous binding here.
    pub fn define(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let mut current = self;
        loop {
            if let Some(value) = current.values.borrow().get(&name.lexeme) {
                return Ok(value.clone());
            }
            match &current.enclosing {
                Some(enclosing) => current = enclosing.as_ref(),
                None => return Err(undefined(name)),
            }
        }
    }

    /// Overwrites the nearest existing binding. Never creates one.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut current = self;
        loop {
            if let Some(slot) = current.values.borrow_mut().get_mut(&name.lexeme) {
                *slot = value;
                return Ok(());
            }
            match &current.enclosing {
                Some(enclosing) => current = enclosing.as_ref(),
                None => return Err(undefined(name)),
            }
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name.span, format!("Undefined variable '{}'.", name.lexeme))
}
