// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Values carried on pins, parameters and record entries.

use crate::errors::InputError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed value flowing through the activity graph.
///
/// Maps are ordered so serialized records are byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Quantity(Quantity),
    Location(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn location(id: impl Into<String>) -> Self {
        Value::Location(id.into())
    }

    pub fn microliters(amount: f64) -> Self {
        Value::Quantity(Quantity::new(amount, MICROLITER))
    }

    pub fn nanometers(amount: f64) -> Self {
        Value::Quantity(Quantity::new(amount, "nanometer"))
    }

    /// `Null`, empty text, empty lists and empty records carry no result.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Record(fields) => fields.is_empty(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Quantity(_) => "quantity",
            Value::Location(_) => "location",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<&str> {
        match self {
            Value::Location(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Value::Quantity(quantity) => Some(quantity),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Quantity(quantity) => Some(quantity.amount),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Text(text) => write!(f, "\"{}\"", text),
            Value::Quantity(quantity) => write!(f, "{}", quantity),
            Value::Location(id) => write!(f, "@{}", id),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => write!(f, "{{{} fields}}", fields.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Quantity> for Value {
    fn from(value: Quantity) -> Self {
        Value::Quantity(value)
    }
}

pub const MICROLITER: &str = "microliter";

/// An amount with a unit label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }

    /// Normalizes a volume to microliters; `None` for non-volume units.
    pub fn to_microliters(&self) -> Option<f64> {
        let factor = match self.unit.to_ascii_lowercase().as_str() {
            "nanoliter" | "nanolitre" | "nl" => 1e-3,
            "microliter" | "microlitre" | "ul" | "µl" => 1.0,
            "milliliter" | "millilitre" | "ml" => 1e3,
            "liter" | "litre" | "l" => 1e6,
            _ => return None,
        };
        Some(self.amount * factor)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

/// Kind constraint declared by a primitive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Any,
    Text,
    Number,
    Quantity,
    Location,
}

impl ValueKind {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::Text => matches!(value, Value::Text(_)),
            ValueKind::Number => matches!(value, Value::Integer(_) | Value::Float(_)),
            ValueKind::Quantity => matches!(value, Value::Quantity(_)),
            ValueKind::Location => matches!(value, Value::Location(_)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Any => "value",
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Quantity => "quantity",
            ValueKind::Location => "location",
        };
        f.write_str(name)
    }
}

/// Inputs of one activity after literals, pins and parameters were resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedInputs(pub BTreeMap<String, Value>);

impl ResolvedInputs {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value, InputError> {
        self.0
            .get(name)
            .ok_or_else(|| InputError::Missing(name.to_string()))
    }

    pub fn location(&self, name: &str) -> Result<&str, InputError> {
        let value = self.require(name)?;
        value.as_location().ok_or_else(|| wrong_kind(name, "location", value))
    }

    pub fn text(&self, name: &str) -> Result<&str, InputError> {
        let value = self.require(name)?;
        value.as_text().ok_or_else(|| wrong_kind(name, "text", value))
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, InputError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_text()
                .map(Some)
                .ok_or_else(|| wrong_kind(name, "text", value)),
        }
    }

    /// A volume input normalized to microliters.
    pub fn microliters(&self, name: &str) -> Result<f64, InputError> {
        let value = self.require(name)?;
        match value {
            Value::Quantity(quantity) => quantity
                .to_microliters()
                .ok_or_else(|| wrong_kind(name, "volume", value)),
            _ => Err(wrong_kind(name, "volume", value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

fn wrong_kind(input: &str, expected: &str, found: &Value) -> InputError {
    InputError::WrongKind {
        input: input.to_string(),
        expected: expected.to_string(),
        found: found.kind_name().to_string(),
    }
}

/// Values produced on the output pins of one activity.
pub type Outputs = BTreeMap<String, Value>;
