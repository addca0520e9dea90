//! Built-in formatter functions available to every template
//!
//! The table is a `static` slice: it is built at compile time, shared by all
//! render calls and never mutated. Caller data may shadow any entry by name.

use chrono::{DateTime, Utc};

use crate::error::EvalError;
use crate::escape::escape_html;
use crate::eval::value::Value;
use crate::id::compute_id;

/// Separator tokens used by `combineFilters`
pub const FILTER_OR: &str = " OR ";
pub const FILTER_AND: &str = " AND ";

/// Long-form date format used by `date(...)`, e.g. `January 5, 2024, 3:04:05 PM`
pub const DATE_FORMAT: &str = "%B %-d, %Y, %-I:%M:%S %p";

/// A named formatter callable from template expressions
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub call: fn(&[Value]) -> Result<Value, EvalError>,
}

pub static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "url",
        call: url,
    },
    Builtin {
        name: "lowerCase",
        call: lower_case,
    },
    Builtin {
        name: "upperCase",
        call: upper_case,
    },
    Builtin {
        name: "capitalize",
        call: capitalize,
    },
    Builtin {
        name: "trim",
        call: trim,
    },
    Builtin {
        name: "fallback",
        call: fallback,
    },
    Builtin {
        name: "date",
        call: date,
    },
    Builtin {
        name: "joinFields",
        call: join_fields,
    },
    Builtin {
        name: "combineFilters",
        call: combine_filters,
    },
    Builtin {
        name: "computeId",
        call: compute_id_builtin,
    },
    Builtin {
        name: "safeString",
        call: safe_string,
    },
];

/// Find a built-in formatter by name
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// First argument as a string, `String(undefined)` when missing
fn text(args: &[Value]) -> String {
    args.first().cloned().unwrap_or_default().to_js_string()
}

fn url(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text(args).to_lowercase().replace(' ', "-")))
}

fn lower_case(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text(args).to_lowercase()))
}

fn upper_case(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text(args).to_uppercase()))
}

fn capitalize(args: &[Value]) -> Result<Value, EvalError> {
    let value = text(args);
    let mut chars = value.chars();
    Ok(Value::String(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }))
}

fn trim(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text(args).trim().to_string()))
}

fn fallback(args: &[Value]) -> Result<Value, EvalError> {
    Ok(args
        .iter()
        .find(|v| v.is_truthy())
        .cloned()
        .unwrap_or_default())
}

/// Milliseconds since the epoch (number or numeric string) or an RFC 3339 string
fn date(args: &[Value]) -> Result<Value, EvalError> {
    let parsed: Option<DateTime<Utc>> = match args.first() {
        Some(Value::Number(ms)) => timestamp(*ms),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc))
            .or_else(|| s.trim().parse::<f64>().ok().and_then(timestamp)),
        _ => None,
    };
    Ok(Value::String(match parsed {
        Some(d) => d.format(DATE_FORMAT).to_string(),
        None => "Invalid Date".to_string(),
    }))
}

fn timestamp(ms: f64) -> Option<DateTime<Utc>> {
    if ms.is_finite() {
        DateTime::from_timestamp_millis(ms.trunc() as i64)
    } else {
        None
    }
}

/// `joinFields(list, field, sep)`: pluck `field` from each element and join
fn join_fields(args: &[Value]) -> Result<Value, EvalError> {
    let items: &[Value] = match args.first() {
        Some(Value::Array(items)) => items.as_slice(),
        None | Some(Value::Undefined) | Some(Value::Null) => &[],
        Some(other) => {
            return Err(EvalError::invalid_argument(
                "joinFields",
                format!("expected a list, found {}", other.type_of()),
            ))
        }
    };
    let field = args.get(1).cloned().unwrap_or_default().to_js_string();
    let sep = match args.get(2) {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => sep.to_js_string(),
    };
    Ok(Value::String(
        items
            .iter()
            .map(|item| match item {
                Value::Object(record) => record
                    .get(&field)
                    .map(Value::to_output_string)
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .collect::<Vec<_>>()
            .join(&sep),
    ))
}

/// `combineFilters(filterMap, useOr)`: join the non-empty filter values
fn combine_filters(args: &[Value]) -> Result<Value, EvalError> {
    let filters = match args.first() {
        Some(Value::Object(map)) => map,
        None | Some(Value::Undefined) | Some(Value::Null) => {
            return Ok(Value::String(String::new()))
        }
        Some(other) => {
            return Err(EvalError::invalid_argument(
                "combineFilters",
                format!("expected an object, found {}", other.type_of()),
            ))
        }
    };
    let use_or = args.get(1).is_some_and(Value::is_truthy);
    Ok(Value::String(
        filters
            .values()
            .filter(|v| v.is_truthy())
            .map(Value::to_js_string)
            .collect::<Vec<_>>()
            .join(if use_or { FILTER_OR } else { FILTER_AND }),
    ))
}

/// Parts are joined the way `Array.prototype.join` does, so null and
/// undefined contribute an empty string
fn compute_id_builtin(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(compute_id(args.iter().map(Value::to_output_string))))
}

fn safe_string(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args.first() {
        None | Some(Value::Undefined) => Value::Undefined,
        Some(Value::Null) => Value::Null,
        Some(v) => Value::String(escape_html(&v.to_js_string())),
    })
}
