//! Prometheus metrics export.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram bucket boundaries in microseconds for push duration.
/// Converts to seconds: [0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.005, 0.01]
const PUSH_DURATION_BUCKETS_US: [u64; 7] = [50, 100, 250, 500, 1_000, 5_000, 10_000];

/// Default metric name prefix.
pub const DEFAULT_PREFIX: &str = "streamframe";

/// Reasons a push can be rejected, for labeled counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Batch shape did not validate
    MalformedBatch,
}

impl RejectReason {
    /// Get the label value for Prometheus export.
    pub fn as_label(&self) -> &'static str {
        match self {
            RejectReason::MalformedBatch => "malformed_batch",
        }
    }
}

/// Buffer metrics with counters, gauges, and a push duration histogram.
#[derive(Debug)]
pub struct BufferMetrics {
    // === COUNTERS ===
    /// Accepted pushes
    pushes_total: AtomicU64,

    /// Rejected pushes by reason
    rejected_malformed: AtomicU64,

    /// Rows appended across all pushes
    rows_appended_total: AtomicU64,

    /// Rows dropped by eviction
    rows_evicted_total: AtomicU64,

    /// Fields materialized from schema growth or new label sets
    fields_created_total: AtomicU64,

    /// Pushes that changed the field list
    schema_changes_total: AtomicU64,

    // === GAUGES ===
    /// Current row count
    frame_rows: AtomicU64,

    /// Current field count
    frame_fields: AtomicU64,

    // === HISTOGRAM: push_duration_seconds ===
    push_duration_sum_us: AtomicU64,
    push_duration_count: AtomicU64,
    /// Buckets: [50us, 100us, 250us, 500us, 1ms, 5ms, 10ms, +Inf]
    push_duration_buckets: [AtomicU64; 8],
}

/// Snapshot of the push duration histogram.
#[derive(Debug, Clone)]
pub struct PushDurationHistogram {
    /// `(upper bound in seconds, cumulative count)`
    pub buckets: Vec<(f64, u64)>,
    pub inf_bucket: u64,
    pub sum_seconds: f64,
    pub count: u64,
}

impl BufferMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            pushes_total: AtomicU64::new(0),
            rejected_malformed: AtomicU64::new(0),
            rows_appended_total: AtomicU64::new(0),
            rows_evicted_total: AtomicU64::new(0),
            fields_created_total: AtomicU64::new(0),
            schema_changes_total: AtomicU64::new(0),
            frame_rows: AtomicU64::new(0),
            frame_fields: AtomicU64::new(0),
            push_duration_sum_us: AtomicU64::new(0),
            push_duration_count: AtomicU64::new(0),
            push_duration_buckets: Default::default(),
        }
    }

    // === COUNTER RECORDING ===

    /// Record an accepted push.
    pub fn record_push(
        &self,
        rows: usize,
        evicted: usize,
        fields_created: usize,
        schema_changed: bool,
        duration: Duration,
    ) {
        self.pushes_total.fetch_add(1, Ordering::Relaxed);
        self.rows_appended_total
            .fetch_add(rows as u64, Ordering::Relaxed);
        self.rows_evicted_total
            .fetch_add(evicted as u64, Ordering::Relaxed);
        self.fields_created_total
            .fetch_add(fields_created as u64, Ordering::Relaxed);
        if schema_changed {
            self.schema_changes_total.fetch_add(1, Ordering::Relaxed);
        }

        let duration_us = duration.as_micros() as u64;
        self.push_duration_sum_us
            .fetch_add(duration_us, Ordering::Relaxed);
        self.push_duration_count.fetch_add(1, Ordering::Relaxed);

        // Buckets are cumulative (le = less than or equal)
        for (i, &bucket_us) in PUSH_DURATION_BUCKETS_US.iter().enumerate() {
            if duration_us <= bucket_us {
                self.push_duration_buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.push_duration_buckets[7].fetch_add(1, Ordering::Relaxed);
    }

    /// Record rows dropped outside of a push (resize).
    pub fn record_evicted(&self, rows: usize) {
        self.rows_evicted_total
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// Record a rejected push.
    pub fn record_rejected(&self, reason: RejectReason) {
        match reason {
            RejectReason::MalformedBatch => self.rejected_malformed.fetch_add(1, Ordering::Relaxed),
        };
    }

    // === GAUGE UPDATES ===

    /// Update the frame shape gauges.
    pub fn set_frame_shape(&self, rows: usize, fields: usize) {
        self.frame_rows.store(rows as u64, Ordering::Relaxed);
        self.frame_fields.store(fields as u64, Ordering::Relaxed);
    }

    // === GETTERS ===

    pub fn pushes_total(&self) -> u64 {
        self.pushes_total.load(Ordering::Relaxed)
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_malformed.load(Ordering::Relaxed)
    }

    pub fn rejected_by_reason(&self, reason: RejectReason) -> u64 {
        match reason {
            RejectReason::MalformedBatch => self.rejected_malformed.load(Ordering::Relaxed),
        }
    }

    pub fn rows_appended_total(&self) -> u64 {
        self.rows_appended_total.load(Ordering::Relaxed)
    }

    pub fn rows_evicted_total(&self) -> u64 {
        self.rows_evicted_total.load(Ordering::Relaxed)
    }

    pub fn fields_created_total(&self) -> u64 {
        self.fields_created_total.load(Ordering::Relaxed)
    }

    pub fn schema_changes_total(&self) -> u64 {
        self.schema_changes_total.load(Ordering::Relaxed)
    }

    pub fn frame_rows(&self) -> u64 {
        self.frame_rows.load(Ordering::Relaxed)
    }

    pub fn frame_fields(&self) -> u64 {
        self.frame_fields.load(Ordering::Relaxed)
    }

    /// Get the push duration histogram.
    pub fn push_duration_histogram(&self) -> PushDurationHistogram {
        let buckets = PUSH_DURATION_BUCKETS_US
            .iter()
            .enumerate()
            .map(|(i, &us)| {
                (
                    us as f64 / 1_000_000.0,
                    self.push_duration_buckets[i].load(Ordering::Relaxed),
                )
            })
            .collect();

        PushDurationHistogram {
            buckets,
            inf_bucket: self.push_duration_buckets[7].load(Ordering::Relaxed),
            sum_seconds: self.push_duration_sum_us.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            count: self.push_duration_count.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format.
    ///
    /// ```
    /// use streamframe_core::metrics::BufferMetrics;
    /// use std::time::Duration;
    ///
    /// let metrics = BufferMetrics::new();
    /// metrics.record_push(3, 0, 2, true, Duration::from_micros(10));
    /// let text = metrics.export_prometheus_text();
    /// assert!(text.contains("streamframe_rows_appended_total 3"));
    /// ```
    pub fn export_prometheus_text(&self) -> String {
        self.export_prometheus_text_with_prefix(DEFAULT_PREFIX)
    }

    /// Export metrics in Prometheus text format with custom prefix.
    pub fn export_prometheus_text_with_prefix(&self, prefix: &str) -> String {
        let mut output = String::with_capacity(2048);

        // === COUNTERS ===

        metric(&mut output, prefix, "pushes_total", "counter", "Accepted pushes", self.pushes_total());

        let _ = writeln!(output, "# HELP {prefix}_pushes_rejected_total Rejected pushes by reason");
        let _ = writeln!(output, "# TYPE {prefix}_pushes_rejected_total counter");
        for reason in [RejectReason::MalformedBatch] {
            let _ = writeln!(
                output,
                "{prefix}_pushes_rejected_total{{reason=\"{}\"}} {}",
                reason.as_label(),
                self.rejected_by_reason(reason)
            );
        }
        output.push('\n');

        metric(
            &mut output,
            prefix,
            "rows_appended_total",
            "counter",
            "Rows appended to the frame",
            self.rows_appended_total(),
        );
        metric(
            &mut output,
            prefix,
            "rows_evicted_total",
            "counter",
            "Rows dropped by the eviction window",
            self.rows_evicted_total(),
        );
        metric(
            &mut output,
            prefix,
            "fields_created_total",
            "counter",
            "Fields materialized from schema growth or new label sets",
            self.fields_created_total(),
        );
        metric(
            &mut output,
            prefix,
            "schema_changes_total",
            "counter",
            "Pushes that changed the field list",
            self.schema_changes_total(),
        );

        // === GAUGES ===

        metric(&mut output, prefix, "frame_rows", "gauge", "Current row count", self.frame_rows());
        metric(
            &mut output,
            prefix,
            "frame_fields",
            "gauge",
            "Current field count",
            self.frame_fields(),
        );

        // === HISTOGRAM ===

        let hist = self.push_duration_histogram();
        let _ = writeln!(output, "# HELP {prefix}_push_duration_seconds Duration of push operations");
        let _ = writeln!(output, "# TYPE {prefix}_push_duration_seconds histogram");
        for (le, count) in &hist.buckets {
            let _ = writeln!(output, "{prefix}_push_duration_seconds_bucket{{le=\"{le}\"}} {count}");
        }
        let _ = writeln!(
            output,
            "{prefix}_push_duration_seconds_bucket{{le=\"+Inf\"}} {}",
            hist.inf_bucket
        );
        let _ = writeln!(output, "{prefix}_push_duration_seconds_sum {}", hist.sum_seconds);
        let _ = writeln!(output, "{prefix}_push_duration_seconds_count {}", hist.count);

        output
    }
}

fn metric(output: &mut String, prefix: &str, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(output, "# HELP {prefix}_{name} {help}");
    let _ = writeln!(output, "# TYPE {prefix}_{name} {kind}");
    let _ = writeln!(output, "{prefix}_{name} {value}");
    output.push('\n');
}

impl Default for BufferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = BufferMetrics::new();
        metrics.record_push(5, 2, 3, true, Duration::from_micros(20));
        metrics.record_push(1, 0, 0, false, Duration::from_micros(20));
        metrics.record_evicted(4);
        metrics.record_rejected(RejectReason::MalformedBatch);

        assert_eq!(metrics.pushes_total(), 2);
        assert_eq!(metrics.rows_appended_total(), 6);
        assert_eq!(metrics.rows_evicted_total(), 6);
        assert_eq!(metrics.fields_created_total(), 3);
        assert_eq!(metrics.schema_changes_total(), 1);
        assert_eq!(metrics.rejected_total(), 1);
        assert_eq!(metrics.rejected_by_reason(RejectReason::MalformedBatch), 1);
    }

    #[test]
    fn test_gauges() {
        let metrics = BufferMetrics::new();
        metrics.set_frame_shape(10, 4);
        assert_eq!(metrics.frame_rows(), 10);
        assert_eq!(metrics.frame_fields(), 4);

        metrics.set_frame_shape(3, 4);
        assert_eq!(metrics.frame_rows(), 3);
    }

    #[test]
    fn test_histogram_buckets() {
        let metrics = BufferMetrics::new();
        metrics.record_push(1, 0, 0, false, Duration::from_micros(75));
        metrics.record_push(1, 0, 0, false, Duration::from_millis(20));

        let hist = metrics.push_duration_histogram();
        assert_eq!(hist.count, 2);
        assert_eq!(hist.buckets[0].1, 0); // <= 50us
        assert_eq!(hist.buckets[1].1, 1); // <= 100us
        assert_eq!(hist.buckets[6].1, 1); // <= 10ms
        assert_eq!(hist.inf_bucket, 2);
    }

    #[test]
    fn test_prometheus_text_export() {
        let metrics = BufferMetrics::new();
        metrics.record_push(3, 1, 2, true, Duration::from_micros(10));
        metrics.record_rejected(RejectReason::MalformedBatch);
        metrics.set_frame_shape(2, 3);

        let text = metrics.export_prometheus_text();
        assert!(text.contains("# TYPE streamframe_pushes_total counter"));
        assert!(text.contains("streamframe_pushes_total 1"));
        assert!(text.contains("streamframe_pushes_rejected_total{reason=\"malformed_batch\"} 1"));
        assert!(text.contains("streamframe_rows_evicted_total 1"));
        assert!(text.contains("streamframe_frame_fields 3"));
        assert!(text.contains("streamframe_push_duration_seconds_bucket{le=\"+Inf\"} 1"));
    }

    #[test]
    fn test_prometheus_text_export_with_prefix() {
        let metrics = BufferMetrics::new();
        let text = metrics.export_prometheus_text_with_prefix("dash");
        assert!(text.contains("dash_pushes_total 0"));
        assert!(!text.contains("streamframe_"));
    }

    #[test]
    fn test_prometheus_text_format_validity() {
        let metrics = BufferMetrics::new();
        metrics.record_push(2, 0, 1, false, Duration::from_micros(300));
        let text = metrics.export_prometheus_text();

        for line in text.lines().filter(|l| !l.is_empty() && !l.starts_with('#')) {
            let mut parts = line.rsplitn(2, ' ');
            let value = parts.next().unwrap();
            assert!(value.parse::<f64>().is_ok(), "bad sample line: {line}");
            assert!(parts.next().is_some(), "missing metric name: {line}");
        }
    }
}
