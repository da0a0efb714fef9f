//! Registry mapping label sets to derived fields.

use super::key::{LabelKey, Labels};
use crate::frame::{ColumnStore, FieldId};
use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Identity of a field slot: the prototype it derives from plus the label
/// key of the rows routed to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    base: String,
    base_key: LabelKey,
    key: LabelKey,
}

/// Exported slot, used to carry the index across a serialize round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSlot {
    /// Prototype field name
    pub base: String,
    /// Label key of the prototype's declared labels
    pub base_key: LabelKey,
    /// Label key of the routed rows
    pub key: LabelKey,
    /// Field receiving those rows
    pub field: FieldId,
}

/// Outcome of [`LabelIndex::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub field: FieldId,
    /// Whether the field was materialized by this call
    pub created: bool,
}

/// Lazily materializes one field per `(prototype, label set)` pair.
///
/// Slots are never removed and a handle is never reassigned to a different
/// label key, so routing stays stable for the lifetime of the buffer.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    slots: HashMap<SlotKey, FieldId>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from exported slots.
    pub fn from_slots(slots: Vec<LabelSlot>) -> Self {
        let slots = slots
            .into_iter()
            .map(|s| {
                (
                    SlotKey {
                        base: s.base,
                        base_key: s.base_key,
                        key: s.key,
                    },
                    s.field,
                )
            })
            .collect();
        Self { slots }
    }

    /// Export slots, ordered by field handle.
    pub fn slots(&self) -> Vec<LabelSlot> {
        let mut slots: Vec<_> = self
            .slots
            .iter()
            .map(|(k, field)| LabelSlot {
                base: k.base.clone(),
                base_key: k.base_key.clone(),
                key: k.key.clone(),
                field: *field,
            })
            .collect();
        slots.sort_by_key(|s| s.field);
        slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Field already holding rows of `proto` tagged with `key`.
    pub fn get(&self, proto: &FieldSchema, key: &LabelKey) -> Option<FieldId> {
        let (base, base_key) = proto.identity();
        self.slots
            .get(&SlotKey {
                base: base.to_string(),
                base_key,
                key: key.clone(),
            })
            .copied()
    }

    /// Every field derived from `proto`, in creation order.
    pub fn fields_of(&self, proto: &FieldSchema) -> Vec<FieldId> {
        let (base, base_key) = proto.identity();
        let mut fields: Vec<_> = self
            .slots
            .iter()
            .filter(|(k, _)| k.base == base && k.base_key == base_key)
            .map(|(_, id)| *id)
            .collect();
        fields.sort();
        fields
    }

    /// Find or create the field for rows of `proto` carrying `labels`.
    ///
    /// An empty label set resolves to the prototype's own field. A new field
    /// takes the prototype's type, the union of the prototype's labels and
    /// `labels`, is inserted right after the last field sharing its name,
    /// and is backfilled with nulls up to the current length.
    pub fn resolve(
        &mut self,
        store: &mut ColumnStore,
        proto: &FieldSchema,
        labels: &Labels,
        key: &LabelKey,
    ) -> Resolved {
        if let Some(field) = self.get(proto, key) {
            if store.position(field).is_some() {
                return Resolved {
                    field,
                    created: false,
                };
            }
        }

        let mut schema = proto.clone();
        if !labels.is_empty() {
            let mut merged = proto.labels.clone().unwrap_or_default();
            merged.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            schema.labels = Some(merged);
        }

        let position = store
            .last_position_of(&proto.name)
            .map_or(store.fields().len(), |p| p + 1);
        let field = store.insert_field(position, &schema);

        let (base, base_key) = proto.identity();
        self.slots.insert(
            SlotKey {
                base: base.to_string(),
                base_key,
                key: key.clone(),
            },
            field,
        );

        if !labels.is_empty() {
            info!(
                field = %proto.name,
                labels = %key,
                position,
                "Created field for new label set"
            );
        }

        Resolved {
            field,
            created: true,
        }
    }
}
