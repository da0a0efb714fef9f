//! StreamFrame Core - bounded in-memory columnar buffer for streaming data
//!
//! This library accumulates incremental batches of column-oriented data into
//! a rolling frame with:
//!
//! - Incremental schema reconciliation (partial schemas, type overwrites)
//! - Label-partitioned fields created lazily per distinct label set
//! - Row-aligned columns with null padding for sparse batches
//! - Eviction by row count and by time span
//! - Arrow `RecordBatch` export and serializable state

pub mod buffer;
pub mod config;
pub mod error;
pub mod frame;
pub mod labels;
pub mod metrics;
pub mod schema;

// Re-export commonly used types
pub use buffer::{
    Batch, EvictionWindow, FrameData, PacketInfo, PushAction, SharedFrame, StreamingFrame,
    StreamingFrameOptions,
};
pub use config::Config;
pub use error::{BufferError, MalformedBatch};
pub use error::{Error, Result};
pub use frame::{Field, FieldId, Value};
pub use labels::Labels;
pub use schema::{FieldSchema, FieldType, Schema};
