// Conversion of raw table cells into plain serializable primitives.
//
// None of these functions fail: a value that cannot be understood degrades
// to null or to its string form.

use serde_json::Value as JSValue;

// Spellings of a missing value in exported tables.
const MISSING_MARKERS: [&str; 5] = ["nan", "na", "n/a", "null", "none"];

/// Coerces the text of a cell (CSV, sheet) into a primitive.
pub fn coerce_text(s: &str) -> JSValue {
    let t = s.trim();
    if t.is_empty() || MISSING_MARKERS.contains(&t.to_lowercase().as_str()) {
        return JSValue::Null;
    }
    if t.eq_ignore_ascii_case("true") {
        return JSValue::Bool(true);
    }
    if t.eq_ignore_ascii_case("false") {
        return JSValue::Bool(false);
    }
    // Only text that prints back unchanged becomes a number: codes such as
    // "01" or "1.10" stay strings.
    let number = if let Ok(i) = t.parse::<i64>() {
        Some(JSValue::from(i))
    } else if looks_numeric(t) {
        t.parse::<f64>().ok().map(coerce_float)
    } else {
        None
    };
    match number {
        Some(v) if v.to_string() == t => v,
        _ => JSValue::String(s.to_string()),
    }
}

/// Coerces a floating point number. NaN and infinities become null, integral
/// values become integers so that `4.0` and `4` identify the same item.
pub fn coerce_float(f: f64) -> JSValue {
    if !f.is_finite() {
        JSValue::Null
    } else if f.fract() == 0.0 && f.abs() < 9.0e15 {
        JSValue::from(f as i64)
    } else {
        serde_json::Number::from_f64(f)
            .map(JSValue::Number)
            .unwrap_or(JSValue::Null)
    }
}

/// Ensures that a value taken from a loosely typed source is a primitive.
/// Arrays and objects are stringified.
pub fn coerce_value(v: &JSValue) -> JSValue {
    match v {
        JSValue::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => coerce_float(f),
            _ => v.clone(),
        },
        JSValue::String(s) if s.trim().is_empty() => JSValue::Null,
        JSValue::Array(_) | JSValue::Object(_) => JSValue::String(v.to_string()),
        x => x.clone(),
    }
}

// Rust accepts "inf" and "NaN" as floats, which would turn words into numbers.
fn looks_numeric(t: &str) -> bool {
    t.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && t.chars().any(|c| c.is_ascii_digit())
}
