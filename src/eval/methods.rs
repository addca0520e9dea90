//! Methods callable on strings, arrays and numbers (`name.toUpperCase()`)

use crate::error::EvalError;
use crate::eval::interpreter::Evaluator;
use crate::eval::value::{format_number, Value};
use crate::parser::ast::Span;

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "slice",
    "split",
    "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "join", "includes", "indexOf", "slice", "map", "filter", "toString",
];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

/// Whether `receiver.name(...)` resolves to a built-in method
pub fn has_method(receiver: &Value, name: &str) -> bool {
    match receiver {
        Value::String(_) => STRING_METHODS.contains(&name),
        Value::Array(_) => ARRAY_METHODS.contains(&name),
        Value::Number(_) => NUMBER_METHODS.contains(&name),
        Value::Bool(_) => name == "toString",
        _ => false,
    }
}

/// Call a built-in method; `None` when the receiver has no such method
pub fn call_method(
    evaluator: &mut Evaluator,
    receiver: &Value,
    name: &str,
    args: &[Value],
    span: &Span,
) -> Option<Result<Value, EvalError>> {
    if !has_method(receiver, name) {
        return None;
    }
    Some(match receiver {
        Value::String(s) => string_method(s, name, args),
        Value::Array(items) => array_method(evaluator, items, name, args, span),
        Value::Number(n) => number_method(*n, name, args),
        _ => Ok(Value::String(receiver.to_js_string())),
    })
}

fn arg_string(args: &[Value], i: usize) -> String {
    args.get(i).map(Value::to_js_string).unwrap_or_default()
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    Ok(match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "includes" => Value::Bool(s.contains(&arg_string(args, 0))),
        "startsWith" => Value::Bool(s.starts_with(&arg_string(args, 0))),
        "endsWith" => Value::Bool(s.ends_with(&arg_string(args, 0))),
        "indexOf" => {
            let needle = arg_string(args, 0);
            Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            })
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Value::String(chars[start..end].iter().collect())
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::Array(vec![Value::from(s)]),
            Some(sep) => {
                let sep = sep.to_js_string();
                if sep.is_empty() {
                    Value::Array(s.chars().map(|c| Value::String(c.to_string())).collect())
                } else {
                    Value::Array(s.split(sep.as_str()).map(Value::from).collect())
                }
            }
        },
        _ => Value::from(s),
    })
}

fn array_method(
    evaluator: &mut Evaluator,
    items: &[Value],
    name: &str,
    args: &[Value],
    span: &Span,
) -> Result<Value, EvalError> {
    Ok(match name {
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_js_string(),
            };
            Value::String(
                items
                    .iter()
                    .map(Value::to_output_string)
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "includes" => {
            let needle = args.first().cloned().unwrap_or_default();
            Value::Bool(items.iter().any(|item| item.strict_equals(&needle)))
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or_default();
            Value::Number(
                items
                    .iter()
                    .position(|item| item.strict_equals(&needle))
                    .map_or(-1.0, |i| i as f64),
            )
        }
        "slice" => {
            let (start, end) = slice_bounds(items.len(), args);
            Value::Array(items[start..end].to_vec())
        }
        "map" | "filter" => {
            let callback = match args.first() {
                Some(Value::Function(f)) => f.clone(),
                other => {
                    return Err(EvalError::invalid_argument(
                        name,
                        format!(
                            "{} is not a function",
                            other.map_or("undefined".to_string(), Value::to_js_string)
                        ),
                    ))
                }
            };
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let result = evaluator.call_function(
                    &callback,
                    &[item.clone(), Value::Number(i as f64)],
                    span,
                )?;
                if name == "map" {
                    out.push(result);
                } else if result.is_truthy() {
                    out.push(item.clone());
                }
            }
            Value::Array(out)
        }
        _ => Value::String(Value::Array(items.to_vec()).to_js_string()),
    })
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "toFixed" => {
            let digits = args.first().map_or(0.0, Value::to_number);
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(EvalError::invalid_argument(
                    "toFixed",
                    "digits argument must be between 0 and 100",
                ));
            }
            Ok(Value::String(format!("{:.*}", digits as usize, n)))
        }
        _ => Ok(Value::String(format_number(n))),
    }
}

/// Resolve JavaScript `slice(start, end)` arguments against a length
fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let resolve = |value: Option<&Value>, default: usize| -> usize {
        match value {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let n = v.to_number();
                let n = if n.is_nan() { 0.0 } else { n.trunc() };
                if n < 0.0 {
                    (len as f64 + n).max(0.0) as usize
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::interpreter::Env;
    use crate::eval::value::Object;
    use crate::parser::parse;

    fn eval(input: &str) -> Result<Value, EvalError> {
        let env = Env::new(Object::from_iter([
            ("name".to_string(), Value::from("  Ada Lovelace ")),
            (
                "items".to_string(),
                Value::from(vec![
                    Value::object([("name", Value::from("A")), ("n", Value::from(1.0))]),
                    Value::object([("name", Value::from("B")), ("n", Value::from(2.0))]),
                ]),
            ),
        ]));
        let expr = parse(input)?;
        Evaluator::default().eval(&expr, &env)
    }

    fn eval_ok(input: &str) -> Value {
        eval(input).unwrap_or_else(|e| panic!("{} failed: {}", input, e))
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval_ok("name.trim()"), Value::from("Ada Lovelace"));
        assert_eq!(eval_ok("name.trim().toUpperCase()"), Value::from("ADA LOVELACE"));
        assert_eq!(eval_ok("name.includes('Ada')"), Value::from(true));
        assert_eq!(eval_ok("name.trim().startsWith('Ada')"), Value::from(true));
        assert_eq!(eval_ok("name.indexOf('L')"), Value::from(6.0));
        assert_eq!(eval_ok("'a,b,c'.split(',').length"), Value::from(3.0));
    }

    #[test]
    fn test_slice_with_negative_bounds() {
        assert_eq!(eval_ok("'abcdef'.slice(1, 3)"), Value::from("bc"));
        assert_eq!(eval_ok("'abcdef'.slice(-2)"), Value::from("ef"));
        assert_eq!(eval_ok("'abc'.slice(2, 1)"), Value::from(""));
        assert_eq!(eval_ok("[1, 2, 3].slice(1)"), Value::from(vec![2.0, 3.0]));
    }

    #[test]
    fn test_array_map_filter_join() {
        assert_eq!(
            eval_ok("items.map(i => i.name).join(', ')"),
            Value::from("A, B")
        );
        assert_eq!(
            eval_ok("items.filter(i => i.n > 1).length"),
            Value::from(1.0)
        );
        assert_eq!(eval_ok("[1, null, 2].join()"), Value::from("1,,2"));
    }

    #[test]
    fn test_map_requires_function() {
        assert!(matches!(
            eval("items.map(1)"),
            Err(EvalError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_number_methods() {
        assert_eq!(eval_ok("(3.14159).toFixed(2)"), Value::from("3.14"));
        assert_eq!(eval_ok("(2).toFixed()"), Value::from("2"));
        assert_eq!(eval_ok("(2.7).toFixed('x')"), Value::from("3"));
        assert_eq!(eval_ok("(1.26).toFixed(1.9)"), Value::from("1.3"));
        assert_eq!(eval_ok("(10).toString()"), Value::from("10"));
    }

    #[test]
    fn test_unknown_method_is_not_callable() {
        assert!(matches!(
            eval("name.explode()"),
            Err(EvalError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_optional_call_of_missing_method() {
        assert_eq!(eval_ok("name.explode?.()"), Value::Undefined);
    }
}
