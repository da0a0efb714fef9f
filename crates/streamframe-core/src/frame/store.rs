//! Row-aligned column storage.
//!
//! Every field holds exactly `length` values outside of a single mutating
//! call. Fields are addressed by [`FieldId`] handles that stay valid while
//! other fields are inserted before them.

use super::field::Field;
use super::value::Value;
use crate::schema::{FieldSchema, FieldType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable handle to a field. Never reused for another field.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

/// Sparse cells destined for one field: `(row offset, value)` pairs relative
/// to the first appended row.
pub type SparseCells = Vec<(usize, Value)>;

/// Ordered, row-aligned columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    fields: Vec<Field>,
    /// Handle of `fields[i]`
    ids: Vec<FieldId>,
    positions: HashMap<FieldId, usize>,
    length: usize,
    next_id: u32,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously exported parts.
    ///
    /// Returns `None` if the parts are inconsistent: mismatched lengths,
    /// duplicate handles, or a handle at or above `next_id`.
    pub fn from_parts(fields: Vec<Field>, ids: Vec<FieldId>, next_id: u32) -> Option<Self> {
        if fields.len() != ids.len() {
            return None;
        }
        let length = fields.first().map_or(0, Field::len);
        if fields.iter().any(|f| f.len() != length) {
            return None;
        }

        let mut positions = HashMap::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            if id.0 >= next_id || positions.insert(*id, position).is_some() {
                return None;
            }
        }

        Some(Self {
            fields,
            ids,
            positions,
            length,
            next_id,
        })
    }

    /// Shared row count.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Handles in field order.
    pub fn ids(&self) -> &[FieldId] {
        &self.ids
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.position(id).map(|p| &self.fields[p])
    }

    pub fn position(&self, id: FieldId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Position of the last field named `name`.
    pub fn last_position_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().rposition(|f| f.name == name)
    }

    /// Handle of the first field of type `time`.
    pub fn time_field(&self) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.field_type == FieldType::Time)
            .map(|p| self.ids[p])
    }

    /// Append a new field at the end, backfilled with nulls.
    pub fn push_field(&mut self, schema: &FieldSchema) -> FieldId {
        self.insert_field(self.fields.len(), schema)
    }

    /// Insert a new field at `position`, backfilled with nulls for every
    /// existing row.
    pub fn insert_field(&mut self, position: usize, schema: &FieldSchema) -> FieldId {
        let position = position.min(self.fields.len());
        let id = FieldId(self.next_id);
        self.next_id += 1;

        self.fields
            .insert(position, Field::from_schema(schema, self.length));
        self.ids.insert(position, id);
        for (p, id) in self.ids.iter().enumerate().skip(position) {
            self.positions.insert(*id, p);
        }
        id
    }

    /// Overwrite the type of an existing field. Values are kept as they are.
    pub fn set_type(&mut self, id: FieldId, field_type: FieldType) -> bool {
        match self.position(id) {
            Some(p) => {
                self.fields[p].field_type = field_type;
                true
            }
            None => false,
        }
    }

    /// Push one value onto one field.
    ///
    /// This breaks alignment until every other field has received a value
    /// for the same row; only row-level operations below are public.
    fn append(&mut self, position: usize, value: Option<Value>) {
        self.fields[position].values.push(value);
    }

    /// Append one logical row. Fields absent from `row` receive null.
    pub fn append_row_group(&mut self, row: &HashMap<FieldId, Value>) {
        for position in 0..self.fields.len() {
            let value = row.get(&self.ids[position]).cloned();
            self.append(position, value);
        }
        self.length += 1;
        debug_assert!(self.is_aligned());
    }

    /// Append `rows` new rows, filling them from sparse per-field cells.
    ///
    /// Cells whose offset is outside `0..rows` or whose handle is unknown
    /// are ignored; every other cell of the new rows is null.
    pub fn append_sparse(&mut self, rows: usize, cells: HashMap<FieldId, SparseCells>) {
        if rows == 0 {
            return;
        }
        let base = self.length;
        for field in &mut self.fields {
            field.values.resize(base + rows, None);
        }
        for (id, entries) in cells {
            let Some(position) = self.position(id) else {
                continue;
            };
            let values = &mut self.fields[position].values;
            for (offset, value) in entries {
                if offset < rows {
                    values[base + offset] = Some(value);
                }
            }
        }
        self.length = base + rows;
        debug_assert!(self.is_aligned());
    }

    /// Drop the leading `count` rows from every field. Returns rows dropped.
    pub fn truncate_front(&mut self, count: usize) -> usize {
        let count = count.min(self.length);
        if count == 0 {
            return 0;
        }
        for field in &mut self.fields {
            field.values.drain(..count);
        }
        self.length -= count;
        debug_assert!(self.is_aligned());
        count
    }

    /// Drop every row, keeping the fields.
    pub fn clear_rows(&mut self) -> usize {
        self.truncate_front(self.length)
    }

    /// Whether every field holds exactly `length` values.
    pub fn is_aligned(&self) -> bool {
        self.fields.iter().all(|f| f.len() == self.length)
    }
}
