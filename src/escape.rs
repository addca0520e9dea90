//! HTML escaping for substituted values and entity decoding for tag bodies

use crate::eval::value::{Object, Value};

/// Escape text for insertion into HTML
///
/// Encodes `& < > " '` plus `{` and `}` (so substituted values can never form
/// new tags), and turns line breaks into `<br>`.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("<br>");
            }
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}

/// Decode `&amp;`, `&lt;` and `&gt;` in one pass
///
/// Tag bodies may have been HTML-escaped upstream; decoding restores the
/// expression as written. `&amp;lt;` decodes to `&lt;`, not `<`.
pub fn unescape_entities(input: &str) -> String {
    const ENTITIES: [(&str, char); 3] = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>')];

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Copy of a record with every string field HTML-escaped
///
/// Nested objects and arrays are escaped recursively; other values are
/// kept as they are.
pub fn safe_record(record: &Object) -> Object {
    record
        .iter()
        .map(|(key, value)| (key.clone(), safe_value(value)))
        .collect()
}

/// [`safe_record`] applied to every object in a list
pub fn safe_records(records: &[Value]) -> Vec<Value> {
    records.iter().map(safe_value).collect()
}

fn safe_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(s)),
        Value::Object(record) => Value::Object(safe_record(record)),
        Value::Array(items) => Value::Array(safe_records(items)),
        other => other.clone(),
    }
}
