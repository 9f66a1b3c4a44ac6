use serde::{Deserialize, Serialize};

/// Structured, engine-independent representation of a console argument.
///
/// Produced while the JavaScript value is still alive (inside the console
/// call), so later mutation of the object does not change what was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderedValue {
    Undefined,
    Null,
    Boolean {
        value: bool,
    },
    /// Number in JavaScript's own textual form (`1.5`, `NaN`, `-0`)
    Number {
        value: String,
    },
    /// BigInt digits without the `n` suffix
    BigInt {
        value: String,
    },
    String {
        value: String,
        /// Characters cut off past the configured maximum
        #[serde(default, skip_serializing_if = "is_zero")]
        truncated: usize,
    },
    Symbol {
        description: String,
    },
    Function {
        name: String,
        is_class: bool,
    },
    Array {
        items: Vec<RenderedValue>,
        #[serde(default, skip_serializing_if = "is_zero")]
        omitted: usize,
    },
    Object {
        /// Constructor name for class instances; `None` for plain objects
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class_name: Option<String>,
        entries: Vec<(String, RenderedValue)>,
        #[serde(default, skip_serializing_if = "is_zero")]
        omitted: usize,
    },
    Map {
        entries: Vec<(RenderedValue, RenderedValue)>,
        size: usize,
    },
    Set {
        items: Vec<RenderedValue>,
        size: usize,
    },
    Error {
        name: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
    Date {
        iso: String,
    },
    RegExp {
        source: String,
    },
    Promise {
        state: PromiseSummary,
    },
    /// Back-reference to an object that is already being rendered
    Circular,
    /// Nested deeper than the configured depth (`[Object]`, `[Array]`)
    Collapsed {
        label: String,
    },
    /// The value could not be inspected (a getter threw, a proxy trapped)
    Opaque {
        reason: String,
    },
}

/// Settled state of a logged promise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PromiseSummary {
    Pending,
    Fulfilled { value: Box<RenderedValue> },
    Rejected { reason: Box<RenderedValue> },
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl RenderedValue {
    pub fn string(value: impl Into<String>) -> Self {
        RenderedValue::String {
            value: value.into(),
            truncated: 0,
        }
    }

    pub fn number(n: f64) -> Self {
        RenderedValue::Number {
            value: js_number_text(n),
        }
    }

    /// Whether the value is a container with nested children
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            RenderedValue::Array { .. }
                | RenderedValue::Object { .. }
                | RenderedValue::Map { .. }
                | RenderedValue::Set { .. }
                | RenderedValue::Promise { .. }
        )
    }

    /// Numeric interpretation used by `%d`, `%i` and `%f`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RenderedValue::Number { value } => parse_js_number(value),
            RenderedValue::Boolean { value } => Some(if *value { 1.0 } else { 0.0 }),
            RenderedValue::Null => Some(0.0),
            RenderedValue::String { value, .. } => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    parse_js_number(trimmed)
                }
            }
            RenderedValue::BigInt { value } => value.parse::<f64>().ok(),
            _ => None,
        }
    }
}

fn parse_js_number(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse::<f64>().ok(),
    }
}

/// Format a number the way `console.log` shows it.
///
/// Integral values print without a fraction, `-0` keeps its sign.
pub fn js_number_text(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{}", n as i128);
    }
    format!("{n}")
}
