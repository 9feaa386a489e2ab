use super::environment::Environment;
use super::value::{Function, NativeFunction, Value};
use super::{ControlFlow, Interpreter, RuntimeError};
use log::trace;
use lox_core::span::Span;
use smallvec::SmallVec;
use std::rc::Rc;

// Most calls have ≤4 arguments, so inline storage avoids a heap alloc
pub type Arguments = SmallVec<[Value; 4]>;

/// Anything a call expression can invoke. The caller checks `arity` before `call`.
/// A call yields a value, or the break signal of a `break` its body ran into.
pub(crate) trait Callable {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Arguments,
        span: Span,
    ) -> Result<ControlFlow, RuntimeError>;
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Arguments,
        _span: Span,
    ) -> Result<ControlFlow, RuntimeError> {
        trace!("calling <fn {}> with {} arguments", self.name(), arguments.len());

        let environment = Rc::new(Environment::new_with_enclosing(Rc::clone(&self.closure)));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            // no return statement, every call yields nil
            ControlFlow::Value(_) => Ok(Value::Nil.into()),
            // stops whichever loop made the call
            brk @ ControlFlow::Break(_) => Ok(brk),
        }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<'_>,
        arguments: Arguments,
        span: Span,
    ) -> Result<ControlFlow, RuntimeError> {
        trace!("calling native {} with {} arguments", self.name, arguments.len());
        (self.func)(&arguments)
            .map(ControlFlow::from)
            .map_err(|msg| RuntimeError::new(span, msg))
    }
}
