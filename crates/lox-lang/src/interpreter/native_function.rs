use super::value::{NativeFunction, Value};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn all_native_functions() -> Vec<(&'static str, Value)> {
    vec![("clock", native_clock())]
}

fn native_clock() -> Value {
    Value::NativeFn(Rc::from(NativeFunction {
        name: Rc::from("clock"),
        arity: 0,
        func: |_args| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| format!("clock: {}", e))?;
            Ok(Value::Num(now.as_secs_f64()))
        },
    }))
}
