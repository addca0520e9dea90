//! Evaluation of parsed expressions

pub mod interpreter;
mod methods;
pub mod value;

pub use interpreter::{Closure, Env, Evaluator, DEFAULT_MAX_CALL_DEPTH, MAX_EVAL_NESTING};
pub use value::{format_number, Function, NativeFn, Object, Value};
