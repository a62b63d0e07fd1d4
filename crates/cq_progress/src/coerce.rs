//! Lenient readers for values pulled out of untrusted JSON.

use serde_json::Value;

/// A finite number, or a string that parses as one.
pub(crate) fn finite_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Floor of a finite non-negative number, else `default`.
pub(crate) fn non_negative_int(value: Option<&Value>, default: u64) -> u64 {
    match finite_number(value) {
        // `as` saturates at u64::MAX for huge values.
        Some(n) if n >= 0.0 => n.floor() as u64,
        _ => default,
    }
}
