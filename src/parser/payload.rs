//! Payload of a trace line (everything after the last `|`).
//!
//! Values are kept as a tagged `Json | Raw` pair so a payload that is
//! formatted back into a line parses to the same payload again.

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Key under which unparsable payload text is exposed
pub const RAW_KEY: &str = "raw";

/// A single payload value: valid JSON, or the text as it appeared
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Json(Value),
    Raw(String),
}

impl PayloadValue {
    /// Parse as JSON, falling back to the raw text
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => PayloadValue::Json(value),
            Err(_) => PayloadValue::Raw(text.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PayloadValue::Json(value) => Some(value),
            PayloadValue::Raw(_) => None,
        }
    }

    /// JSON null, or the literal text "None"/"null" in either form
    pub fn is_null_like(&self) -> bool {
        match self {
            PayloadValue::Json(Value::Null) => true,
            PayloadValue::Json(Value::String(s)) => s == "None" || s == "null",
            PayloadValue::Json(_) => false,
            PayloadValue::Raw(s) => {
                let s = s.trim();
                s == "None" || s == "null"
            }
        }
    }

    /// Lossless JSON view (raw text becomes a JSON string)
    pub fn to_json(&self) -> Value {
        match self {
            PayloadValue::Json(value) => value.clone(),
            PayloadValue::Raw(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Json(value) => write!(f, "{}", value),
            PayloadValue::Raw(text) => f.write_str(text),
        }
    }
}

/// Which grammar form the payload was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadShape {
    #[default]
    Empty,
    /// `key=value`
    Field,
    /// A JSON object
    Object,
    /// Anything else, exposed as `{raw: <text>}`
    Raw,
}

/// String-keyed payload mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    shape: PayloadShape,
    fields: Vec<(String, PayloadValue)>,
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\w+)=(.+)$").expect("static regex"))
}

impl Payload {
    /// Parse payload text
    ///
    /// `key=value` yields one field whose value is JSON when it parses;
    /// otherwise the whole text must be a JSON object; otherwise the text
    /// is kept under the `raw` key.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::empty();
        }

        if let Some(caps) = field_pattern().captures(text) {
            return Self::field(&caps[1], PayloadValue::parse(&caps[2]));
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Self::object(map),
            _ => Self::raw(text),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn field(key: impl Into<String>, value: PayloadValue) -> Self {
        Self {
            shape: PayloadShape::Field,
            fields: vec![(key.into(), value)],
        }
    }

    pub fn object(map: Map<String, Value>) -> Self {
        Self {
            shape: PayloadShape::Object,
            fields: map
                .into_iter()
                .map(|(k, v)| (k, PayloadValue::Json(v)))
                .collect(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            shape: PayloadShape::Raw,
            fields: vec![(RAW_KEY.to_string(), PayloadValue::Raw(text.into()))],
        }
    }

    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// JSON object view of all fields
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            PayloadShape::Empty => Ok(()),
            PayloadShape::Field => match self.fields.first() {
                Some((key, value)) => write!(f, "{}={}", key, value),
                None => Ok(()),
            },
            PayloadShape::Object => {
                let map: Map<String, Value> = self
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                write!(f, "{}", Value::Object(map))
            }
            PayloadShape::Raw => match self.fields.first() {
                Some((_, value)) => write!(f, "{}", value),
                None => Ok(()),
            },
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
