use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown for module/routine/line when nothing could be extracted.
pub const UNKNOWN_FIELD: &str = "---";

/// Placeholder for a missing module/routine on an otherwise readable record.
pub const MISSING_FIELD: &str = "N/A";

/// A program pointer change: the line the controller is executing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LineEvent {
    pub line: i64,
    pub module: String,
    pub routine: String,
}

/// Int-like line value as delivered by the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for LineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineValue::Int(v) => write!(f, "{v}"),
            LineValue::Float(v) => write!(f, "{v}"),
            LineValue::Text(v) => f.write_str(v),
        }
    }
}

/// Decoded RAPID program pointer structure with named fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerRecord {
    pub line: Option<LineValue>,
    pub module: Option<String>,
    pub routine: Option<String>,
}

impl PointerRecord {
    pub fn new(line: i64, module: &str, routine: &str) -> Self {
        Self {
            line: Some(LineValue::Int(line)),
            module: Some(module.to_string()),
            routine: Some(routine.to_string()),
        }
    }
}

/// A node value in one of the shapes the gateway is known to produce.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPointerValue {
    /// Typed structure, read through its fields.
    Record(PointerRecord),
    /// Extension object or variant wrapper around the actual value.
    Envelope(Option<Box<RawPointerValue>>),
    /// Loosely typed key/value structure.
    Map(Map<String, Value>),
    /// Anything else, parsed from its textual form.
    Text(String),
}

impl RawPointerValue {
    /// Map a recorded JSON value onto the gateway shapes.
    ///
    /// Objects carrying a `Body` or `Value` key are treated as envelopes, other
    /// objects as maps, strings as text and all remaining values by their JSON
    /// rendering.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mut obj) => {
                for key in ["Body", "Value"] {
                    if let Some(inner) = obj.remove(key) {
                        return match inner {
                            Value::Null => RawPointerValue::Envelope(None),
                            other => RawPointerValue::Envelope(Some(Box::new(Self::from_json(
                                other,
                            )))),
                        };
                    }
                }
                RawPointerValue::Map(obj)
            }
            Value::String(s) => RawPointerValue::Text(s),
            other => RawPointerValue::Text(other.to_string()),
        }
    }

    pub fn wrap(inner: RawPointerValue) -> Self {
        RawPointerValue::Envelope(Some(Box::new(inner)))
    }
}

impl From<PointerRecord> for RawPointerValue {
    fn from(record: PointerRecord) -> Self {
        RawPointerValue::Record(record)
    }
}

/// Outcome of decoding: whatever could be extracted from a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedPointer {
    pub line: Option<i64>,
    pub module: String,
    pub routine: String,
}

impl DecodedPointer {
    pub fn empty() -> Self {
        Self {
            line: None,
            module: UNKNOWN_FIELD.to_string(),
            routine: UNKNOWN_FIELD.to_string(),
        }
    }

    /// Line formatted for the status panel.
    pub fn line_label(&self) -> String {
        self.line
            .map(|l| l.to_string())
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
    }

    pub fn into_event(self) -> Option<LineEvent> {
        let line = self.line?;
        Some(LineEvent {
            line,
            module: self.module,
            routine: self.routine,
        })
    }
}
