//! Column store for streaming frames.
//!
//! A frame is an ordered list of typed fields that all hold the same number
//! of values. Rows are only ever appended at the back and dropped from the
//! front, so a row index means the same instant across every field.

mod export;
mod field;
mod store;
mod value;

pub use export::{arrow_type, to_record_batch};
pub use field::Field;
pub use store::{ColumnStore, FieldId, SparseCells};
pub use value::Value;
