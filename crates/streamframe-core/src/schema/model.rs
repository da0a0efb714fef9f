//! Field and schema descriptors.

use crate::labels::{LabelKey, Labels};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the schema field that carries per-row label strings.
pub const LABELS_FIELD: &str = "labels";

/// Logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Time ordinate (epoch milliseconds by convention)
    Time,
    /// Numeric value
    Number,
    /// String value
    String,
    /// Boolean value
    Boolean,
    /// Anything else
    #[default]
    Other,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Other => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, type and declared labels of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            labels: None,
        }
    }

    /// Set declared labels.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = if labels.is_empty() { None } else { Some(labels) };
        self
    }

    /// Identity used when matching schema fields across pushes.
    pub fn identity(&self) -> (&str, LabelKey) {
        let key = match &self.labels {
            Some(labels) => LabelKey::from_labels(labels),
            None => LabelKey::empty(),
        };
        (self.name.as_str(), key)
    }

    /// Whether this field is the per-row labels carrier.
    pub fn is_labels_column(&self) -> bool {
        self.name == LABELS_FIELD && self.field_type == FieldType::String
    }
}

/// Ordered list of field descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field carrying per-row label strings, if any.
    pub fn labels_column(&self) -> Option<usize> {
        self.fields.iter().position(FieldSchema::is_labels_column)
    }

    /// Position of a field by identity.
    pub fn position(&self, field: &FieldSchema) -> Option<usize> {
        let wanted = field.identity();
        self.fields.iter().position(|f| f.identity() == wanted)
    }
}
