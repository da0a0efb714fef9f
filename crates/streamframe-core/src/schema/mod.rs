//! Schema model for streaming frames.
//!
//! A schema is the `{name, type, labels}` shape of a frame's fields. Batches
//! may carry a partial schema, which is reconciled into the buffer's current
//! one before any data is appended.

mod model;
mod reconcile;

pub use model::{FieldSchema, FieldType, Schema, LABELS_FIELD};
pub use reconcile::{reconcile, SchemaDiff, TypeChange};
