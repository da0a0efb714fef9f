//! Incoming push payloads.

use crate::frame::Value;
use crate::labels::Labels;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// One push payload: an optional schema delta and optional new rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FrameData>,
}

impl Batch {
    /// Batch carrying only a schema.
    pub fn from_schema(schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            data: None,
        }
    }

    /// Batch carrying only column-major values.
    pub fn from_values(values: Vec<Vec<Option<Value>>>) -> Self {
        Self {
            schema: None,
            data: Some(FrameData::new(values)),
        }
    }

    /// Attach a schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach column-major values.
    pub fn with_values(mut self, values: Vec<Vec<Option<Value>>>) -> Self {
        self.data = Some(FrameData::new(values));
        self
    }

    /// Tag each row with an explicit label set.
    pub fn with_row_labels(mut self, labels: Vec<Labels>) -> Self {
        self.data.get_or_insert_with(FrameData::default).labels = Some(labels);
        self
    }
}

/// Column-major row data of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    /// One value sequence per schema field, positional. An empty sequence
    /// means the field has no data in this batch.
    #[serde(default)]
    pub values: Vec<Vec<Option<Value>>>,

    /// Optional label set per row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Labels>>,
}

impl FrameData {
    pub fn new(values: Vec<Vec<Option<Value>>>) -> Self {
        Self {
            values,
            labels: None,
        }
    }
}

/// What a push does with existing rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushAction {
    /// Append new rows after the existing ones
    #[default]
    Append,
    /// Replace existing rows with the new ones
    Replace,
}

/// Describes the last accepted push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketInfo {
    /// Number of accepted pushes so far
    pub number: u64,
    /// Action applied
    pub action: PushAction,
    /// Rows the push contributed
    pub length: usize,
    /// Whether the field list changed
    pub schema_changed: bool,
}
