//! # Encode
//!
//! Renders non-composite values as JSON text.
//!
//! Strings are escaped with a wider set than the JSON grammar requires: besides
//! quotes, backslashes and C0 controls, the C1 controls and a number of invisible
//! Unicode format and separator characters are written as `\uXXXX`, so the output
//! is safe to embed in JavaScript source and survives tools that strip or
//! reinterpret those characters.
//!
//! Numbers follow the ECMAScript number-to-string rules, so `1.0` is written as `1`
//! and `1e21` as `1e+21`. Non-finite numbers become `null`. [`BigInt`](crate::BigInt)
//! values are written as bare digits, which is an extension: strict consumers may
//! lose precision on them, but nothing is rounded on the way out.

use crate::value::{Value, ValueKind};

const HEX: &[u8; 16] = b"0123456789abcdef";

fn needs_escape(c: char) -> bool {
    matches!(c,
        '"' | '\\'
        | '\u{0}'..='\u{1f}'
        | '\u{7f}'..='\u{9f}'
        | '\u{ad}'
        | '\u{600}'..='\u{604}'
        | '\u{70f}'
        | '\u{17b4}'
        | '\u{17b5}'
        | '\u{200c}'..='\u{200f}'
        | '\u{2028}'..='\u{202f}'
        | '\u{2060}'..='\u{206f}'
        | '\u{feff}'
        | '\u{fff0}'..='\u{ffff}')
}

fn push_escape(c: char, out: &mut String) {
    match c {
        '\u{8}' => out.push_str("\\b"),
        '\t' => out.push_str("\\t"),
        '\n' => out.push_str("\\n"),
        '\u{c}' => out.push_str("\\f"),
        '\r' => out.push_str("\\r"),
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        c => {
            // every escapable char is in the BMP
            let code = c as u32;
            out.push_str("\\u");
            for shift in [12, 8, 4, 0] {
                out.push(char::from(HEX[((code >> shift) & 0xf) as usize]));
            }
        }
    }
}

/// Appends `s` to `out` with JSON escapes applied, without surrounding quotes.
pub fn escape_into(s: &str, out: &mut String) {
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if !needs_escape(c) {
            continue;
        }
        out.push_str(&s[start..i]);
        push_escape(c, out);
        start = i + c.len_utf8();
    }
    out.push_str(&s[start..]);
}

/// Appends `s` to `out` as a quoted JSON string.
pub fn quote_into(s: &str, out: &mut String) {
    out.reserve(s.len() + 2);
    out.push('"');
    escape_into(s, out);
    out.push('"');
}

pub fn quote(s: &str) -> String {
    let mut out = String::new();
    quote_into(s, &mut out);
    out
}

/// Appends the ECMAScript rendering of `n`, or `null` when `n` is not finite.
pub fn number_into(n: f64, out: &mut String) {
    if !n.is_finite() {
        out.push_str("null");
        return;
    }
    if n == 0.0 {
        out.push('0');
        return;
    }
    if n < 0.0 {
        out.push('-');
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e-7"
    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if point - 1 < 0 { '-' } else { '+' });
        out.push_str(&(point - 1).abs().to_string());
    }
}

pub fn number(n: f64) -> String {
    let mut out = String::new();
    number_into(n, &mut out);
    out
}

/// Appends the JSON text of a non-composite value.
///
/// Absent values have no text of their own; the caller decides between `null`
/// and omission. Anything that is not a primitive is rejected with its kind.
pub fn primitive_into(value: &Value, out: &mut String) -> Result<(), ValueKind> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => number_into(*n, out),
        Value::BigInt(n) => out.push_str(n.as_str()),
        Value::String(s) => quote_into(s, out),
        other => return Err(other.kind()),
    }
    Ok(())
}
