use crate::types::MISSING_FIELD;
use crate::{DecodeError, DecodedPointer, LineValue, PointerRecord, RawPointerValue};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

struct TextPatterns {
    line: Regex,
    module: Regex,
    routine: Regex,
}

fn text_patterns() -> Option<&'static TextPatterns> {
    static PATTERNS: OnceLock<Option<TextPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(TextPatterns {
                line: Regex::new(r"Line[=:]\s*(\d+)").ok()?,
                module: Regex::new(r"Module[=:]\s*([^,\s]+)").ok()?,
                routine: Regex::new(r"Routine[=:]\s*([^,\s]+)").ok()?,
            })
        })
        .as_ref()
}

/// Decode a raw node value into line/module/routine.
///
/// Envelopes are unwrapped first, then the value is read as a typed record, as a
/// map (`Line`/`line` keys) or, as a last resort, parsed from its text. A value
/// with no recognizable shape decodes to a pointer without a line; only a line
/// that is present but not int-like is an error.
pub fn decode_pointer(value: &RawPointerValue) -> Result<DecodedPointer, DecodeError> {
    let mut source = value;
    while let RawPointerValue::Envelope(inner) = source {
        match inner {
            Some(body) => source = body,
            None => return Err(DecodeError::EmptyEnvelope),
        }
    }

    let mut decoded = DecodedPointer::empty();
    let line = match source {
        RawPointerValue::Record(record) => read_record(record, &mut decoded),
        RawPointerValue::Map(map) => read_map(map, &mut decoded)?,
        RawPointerValue::Text(_) | RawPointerValue::Envelope(_) => None,
    };

    decoded.line = match line {
        Some(v) => Some(coerce_line(&v)?),
        None => None,
    };

    if decoded.line.is_none() {
        if let RawPointerValue::Text(text) = source {
            parse_text(text, &mut decoded);
        }
    }

    tracing::trace!(
        line = ?decoded.line,
        module = %decoded.module,
        routine = %decoded.routine,
        "decoded program pointer"
    );
    Ok(decoded)
}

fn read_record(record: &PointerRecord, out: &mut DecodedPointer) -> Option<LineValue> {
    out.module = record
        .module
        .clone()
        .unwrap_or_else(|| MISSING_FIELD.to_string());
    out.routine = record
        .routine
        .clone()
        .unwrap_or_else(|| MISSING_FIELD.to_string());
    record.line.clone()
}

fn read_map(
    map: &Map<String, Value>,
    out: &mut DecodedPointer,
) -> Result<Option<LineValue>, DecodeError> {
    out.module = map_text(map, "Module", "module");
    out.routine = map_text(map, "Routine", "routine");

    let raw = ["Line", "line"]
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null());
    let line = match raw {
        None => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(LineValue::Int(i)),
            None => Some(LineValue::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        Some(Value::String(s)) => Some(LineValue::Text(s.clone())),
        Some(other) => return Err(DecodeError::LineNotConvertible(other.to_string())),
    };
    Ok(line)
}

fn map_text(map: &Map<String, Value>, key: &str, alt: &str) -> String {
    match map.get(key).or_else(|| map.get(alt)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => MISSING_FIELD.to_string(),
        Some(other) => other.to_string(),
    }
}

fn parse_text(text: &str, out: &mut DecodedPointer) {
    if !(text.contains("Line") || text.contains("Module") || text.contains("Routine")) {
        return;
    }
    let Some(patterns) = text_patterns() else {
        return;
    };
    if let Some(c) = patterns.line.captures(text) {
        out.line = c.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
    }
    if let Some(c) = patterns.module.captures(text) {
        if let Some(m) = c.get(1) {
            out.module = m.as_str().to_string();
        }
    }
    if let Some(c) = patterns.routine.captures(text) {
        if let Some(m) = c.get(1) {
            out.routine = m.as_str().to_string();
        }
    }
}

/// Coerce an int-like line value. Floats truncate toward zero, text must parse
/// as an integer after trimming.
pub fn coerce_line(value: &LineValue) -> Result<i64, DecodeError> {
    match value {
        LineValue::Int(v) => Ok(*v),
        LineValue::Float(v) if v.is_finite() => Ok(v.trunc() as i64),
        LineValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DecodeError::LineNotConvertible(s.clone())),
        other => Err(DecodeError::LineNotConvertible(other.to_string())),
    }
}
