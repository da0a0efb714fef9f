//! Streaming frame buffer.
//!
//! Batches are validated in full by the append planner, applied to a
//! row-aligned column store, and trimmed by the eviction window. A
//! [`SharedFrame`] wraps a frame for use across threads.

mod append;
mod batch;
mod eviction;
mod shared;
mod streaming;

pub use batch::{Batch, FrameData, PacketInfo, PushAction};
pub use eviction::{evict, EvictionDecision, EvictionWindow};
pub use shared::SharedFrame;
pub use streaming::{FrameSnapshot, SerializedFrame, StreamingFrame, StreamingFrameOptions};
