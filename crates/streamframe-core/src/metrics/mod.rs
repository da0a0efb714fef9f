//! Buffer metrics with Prometheus text exposition.

mod prometheus;

pub use prometheus::{BufferMetrics, PushDurationHistogram, RejectReason, DEFAULT_PREFIX};
