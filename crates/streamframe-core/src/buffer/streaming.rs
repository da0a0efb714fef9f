//! Bounded streaming frame.
//!
//! A [`StreamingFrame`] accepts batches, routes labeled rows into per-label
//! fields, keeps every field row-aligned, and evicts leading rows according
//! to its [`EvictionWindow`].

use super::append::{self, AppendPlan};
use super::batch::{Batch, PacketInfo, PushAction};
use super::eviction::{evict, EvictionDecision, EvictionWindow};
use crate::frame::{self, ColumnStore, Field, FieldId, SparseCells, Value};
use crate::labels::{LabelIndex, LabelKey, LabelSlot, Labels};
use crate::metrics::{BufferMetrics, RejectReason};
use crate::schema::{FieldType, Schema};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options controlling retention and push behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingFrameOptions {
    #[serde(flatten)]
    pub window: EvictionWindow,

    /// Action applied to every push
    #[serde(default)]
    pub action: PushAction,
}

impl StreamingFrameOptions {
    pub fn new(window: EvictionWindow) -> Self {
        Self {
            window,
            action: PushAction::Append,
        }
    }

    /// Set the push action.
    pub fn with_action(mut self, action: PushAction) -> Self {
        self.action = action;
        self
    }
}

/// Point-in-time copy of the frame contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub fields: Vec<Field>,
    pub length: usize,
}

/// Serializable form of a [`StreamingFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedFrame {
    pub options: StreamingFrameOptions,
    pub schema: Schema,
    pub fields: Vec<Field>,
    pub field_ids: Vec<FieldId>,
    pub next_field_id: u32,
    pub label_slots: Vec<LabelSlot>,
    pub packet: PacketInfo,
}

/// Result of applying a validated batch.
struct Applied {
    rows: usize,
    fields_created: usize,
    schema_changed: bool,
    evicted: EvictionDecision,
}

/// In-memory columnar buffer with label routing and bounded history.
#[derive(Debug)]
pub struct StreamingFrame {
    options: StreamingFrameOptions,
    /// Accumulated schema of prototype fields
    schema: Schema,
    store: ColumnStore,
    index: LabelIndex,
    packet: PacketInfo,
    metrics: Option<Arc<BufferMetrics>>,
}

impl StreamingFrame {
    /// Create a frame and apply `initial` as its first push.
    pub fn new(initial: Batch, options: StreamingFrameOptions) -> Result<Self> {
        let mut frame = Self::empty(options)?;
        frame.push(initial)?;
        Ok(frame)
    }

    /// Create a frame with no fields and no rows.
    pub fn empty(options: StreamingFrameOptions) -> Result<Self> {
        options.window.validate()?;
        Ok(Self {
            options,
            schema: Schema::default(),
            store: ColumnStore::new(),
            index: LabelIndex::new(),
            packet: PacketInfo::default(),
            metrics: None,
        })
    }

    /// Report pushes and evictions to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<BufferMetrics>) -> Self {
        metrics.set_frame_shape(self.length(), self.store.fields().len());
        self.metrics = Some(metrics);
        self
    }

    /// Apply a batch.
    ///
    /// On error the frame is left exactly as it was.
    pub fn push(&mut self, batch: Batch) -> Result<()> {
        let start = Instant::now();

        let plan = match append::plan(&self.schema, batch) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, "Rejected batch");
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(RejectReason::MalformedBatch);
                }
                return Err(err.into());
            }
        };

        let applied = self.apply(plan);

        debug!(
            packet = self.packet.number,
            rows = applied.rows,
            length = self.length(),
            fields = self.store.fields().len(),
            evicted = applied.evicted.total(),
            "Applied batch"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_push(
                applied.rows,
                applied.evicted.total(),
                applied.fields_created,
                applied.schema_changed,
                start.elapsed(),
            );
            metrics.set_frame_shape(self.length(), self.store.fields().len());
        }

        Ok(())
    }

    fn apply(&mut self, plan: AppendPlan) -> Applied {
        let AppendPlan {
            diff,
            columns,
            rows,
            row_labels,
        } = plan;

        let mut fields_created = 0;
        let mut schema_changed = false;
        let no_labels = (Labels::new(), LabelKey::empty());

        if let Some(diff) = diff {
            for change in &diff.type_changes {
                warn!(
                    field = %change.name,
                    from = %change.from,
                    to = %change.to,
                    "Field type overwritten"
                );
                let proto = &diff.schema.fields[change.position];
                for id in self.index.fields_of(proto) {
                    self.store.set_type(id, change.to);
                }
            }
            schema_changed = diff.is_changed();
            let added = diff.added;
            self.schema = diff.schema;

            let labels_mode = self.schema.labels_column().is_some();
            for position in added {
                let proto = &self.schema.fields[position];
                if proto.is_labels_column() || (labels_mode && proto.field_type != FieldType::Time)
                {
                    continue;
                }
                let resolved =
                    self.index
                        .resolve(&mut self.store, proto, &no_labels.0, &no_labels.1);
                fields_created += usize::from(resolved.created);
            }
        }

        let mut cells: HashMap<FieldId, SparseCells> = HashMap::new();
        for (position, sequence) in columns {
            let proto = &self.schema.fields[position];
            let routing = row_labels
                .as_ref()
                .filter(|_| proto.field_type != FieldType::Time);

            match routing {
                None => {
                    let resolved =
                        self.index
                            .resolve(&mut self.store, proto, &no_labels.0, &no_labels.1);
                    fields_created += usize::from(resolved.created);
                    cells.entry(resolved.field).or_default().extend(
                        sequence
                            .into_iter()
                            .enumerate()
                            .filter_map(|(row, v)| v.map(|v| (row, v))),
                    );
                }
                Some(row_labels) => {
                    let mut routed: HashMap<&LabelKey, FieldId> = HashMap::new();
                    for (row, value) in sequence.into_iter().enumerate() {
                        let (labels, key) = &row_labels[row];
                        let field = match routed.get(key) {
                            Some(field) => *field,
                            None => {
                                let resolved =
                                    self.index.resolve(&mut self.store, proto, labels, key);
                                fields_created += usize::from(resolved.created);
                                routed.insert(key, resolved.field);
                                resolved.field
                            }
                        };
                        if let Some(value) = value {
                            cells.entry(field).or_default().push((row, value));
                        }
                    }
                }
            }
        }

        if rows > 0 && self.options.action == PushAction::Replace {
            let cleared = self.store.clear_rows();
            debug!(cleared, "Replaced frame rows");
        }
        self.store.append_sparse(rows, cells);
        let evicted = evict(&mut self.store, &self.options.window);

        if fields_created > 0 {
            schema_changed = true;
        }
        self.packet = PacketInfo {
            number: self.packet.number + 1,
            action: self.options.action,
            length: rows,
            schema_changed,
        };

        Applied {
            rows,
            fields_created,
            schema_changed,
            evicted,
        }
    }

    /// Fields in display order.
    pub fn fields(&self) -> &[Field] {
        self.store.fields()
    }

    /// Handles of [`Self::fields`], position for position.
    pub fn field_ids(&self) -> &[FieldId] {
        self.store.ids()
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.store.field(id)
    }

    /// Number of rows every field holds.
    pub fn length(&self) -> usize {
        self.store.length()
    }

    /// Accumulated prototype schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &StreamingFrameOptions {
        &self.options
    }

    /// Describes the last accepted push.
    pub fn packet_info(&self) -> &PacketInfo {
        &self.packet
    }

    /// Rows contributed by the last push that survived eviction, per field.
    pub fn values_from_last_packet(&self) -> Vec<&[Option<Value>]> {
        let length = self.length();
        let tail = self.packet.length.min(length);
        self.store
            .fields()
            .iter()
            .map(|f| &f.values[length - tail..])
            .collect()
    }

    /// Whether `window` differs from the current one.
    pub fn needs_resize(&self, window: &EvictionWindow) -> bool {
        *window != self.options.window
    }

    /// Replace the eviction window and trim to it immediately.
    pub fn resize(&mut self, window: EvictionWindow) -> Result<EvictionDecision> {
        window.validate()?;
        self.options.window = window;
        let evicted = evict(&mut self.store, &window);

        info!(
            max_length = ?window.max_length,
            max_delta = ?window.max_delta,
            evicted = evicted.total(),
            "Resized frame"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_evicted(evicted.total());
            metrics.set_frame_shape(self.length(), self.store.fields().len());
        }
        Ok(evicted)
    }

    /// Copy the contents out.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            fields: self.store.fields().to_vec(),
            length: self.length(),
        }
    }

    /// Export the contents as an Arrow record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        frame::to_record_batch(self.store.fields(), self.length())
    }

    /// Export everything needed to rebuild this frame.
    pub fn serialize(&self) -> SerializedFrame {
        SerializedFrame {
            options: self.options,
            schema: self.schema.clone(),
            fields: self.store.fields().to_vec(),
            field_ids: self.store.ids().to_vec(),
            next_field_id: self.store.next_id(),
            label_slots: self.index.slots(),
            packet: self.packet.clone(),
        }
    }

    /// Rebuild a frame from [`Self::serialize`] output.
    pub fn deserialize(serialized: SerializedFrame) -> Result<Self> {
        let SerializedFrame {
            options,
            schema,
            fields,
            field_ids,
            next_field_id,
            label_slots,
            packet,
        } = serialized;

        options.window.validate()?;

        let store = ColumnStore::from_parts(fields, field_ids, next_field_id).ok_or_else(|| {
            Error::Serialization("fields are not row-aligned or handles are inconsistent".into())
        })?;

        if let Some(slot) = label_slots
            .iter()
            .find(|slot| store.position(slot.field).is_none())
        {
            return Err(Error::Serialization(format!(
                "label slot {}{} references unknown field {}",
                slot.base, slot.key, slot.field.0
            )));
        }

        Ok(Self {
            options,
            schema,
            store,
            index: LabelIndex::from_slots(label_slots),
            packet,
            metrics: None,
        })
    }
}
