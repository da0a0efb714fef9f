//! A single typed column.

use super::value::Value;
use crate::labels::{LabelKey, Labels};
use crate::schema::{FieldSchema, FieldType};
use serde::{Deserialize, Serialize};

/// One column of a frame: a name, a type, optional labels and the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    pub values: Vec<Option<Value>>,
}

impl Field {
    /// Create a field shaped like `schema` holding `len` nulls.
    pub fn from_schema(schema: &FieldSchema, len: usize) -> Self {
        Self {
            name: schema.name.clone(),
            field_type: schema.field_type,
            labels: schema.labels.clone(),
            values: vec![None; len],
        }
    }

    /// Descriptor of this field without its values.
    pub fn schema(&self) -> FieldSchema {
        FieldSchema {
            name: self.name.clone(),
            field_type: self.field_type,
            labels: self.labels.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last value that is not null.
    pub fn last_not_null(&self) -> Option<&Value> {
        self.values.iter().rev().find_map(Option::as_ref)
    }

    /// Whether every retained value is null.
    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// `name`, or `name{labels}` when the field carries labels.
    pub fn display_name(&self) -> String {
        match &self.labels {
            Some(labels) if !labels.is_empty() => {
                format!("{}{}", self.name, LabelKey::from_labels(labels))
            }
            _ => self.name.clone(),
        }
    }

    /// Time ordinate stored at `row`.
    pub(crate) fn ordinate(&self, row: usize) -> Option<f64> {
        self.values.get(row)?.as_ref()?.as_f64()
    }
}
