//! Eviction window for the streaming buffer.
//!
//! Supports time-delta and row-count trimming. Both trim the same leading
//! prefix of every field, delta first, then length as the hard cap.

use crate::error::BufferError;
use crate::frame::{ColumnStore, Field};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounds on retained history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvictionWindow {
    /// Maximum number of rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Maximum span between the oldest and newest time ordinate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delta: Option<f64>,
}

impl EvictionWindow {
    /// A window that never evicts.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Set max rows.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set max time span.
    pub fn with_max_delta(mut self, max_delta: f64) -> Self {
        self.max_delta = Some(max_delta);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_length.is_none() && self.max_delta.is_none()
    }

    /// Reject a non-positive `max_length` or a negative `max_delta`.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == Some(0) {
            return Err(BufferError::CapacityConfiguration(
                "max_length must be at least 1".into(),
            )
            .into());
        }
        if let Some(delta) = self.max_delta {
            if !delta.is_finite() || delta < 0.0 {
                return Err(BufferError::CapacityConfiguration(format!(
                    "max_delta must be a finite number >= 0, got {delta}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Work out how many leading rows the window drops from `store`.
    pub fn check(&self, store: &ColumnStore) -> EvictionDecision {
        let length = store.length();

        let by_delta = match (self.max_delta, store.time_field()) {
            (Some(delta), Some(time)) => store
                .field(time)
                .map_or(0, |field| rows_before_cutoff(field, length, delta)),
            _ => 0,
        };

        let remaining = length - by_delta;
        let by_length = match self.max_length {
            Some(max) if remaining > max => remaining - max,
            _ => 0,
        };

        EvictionDecision {
            by_delta,
            by_length,
        }
    }
}

/// Index of the first row whose ordinate is at or after
/// `latest - delta`, where `latest` is the last non-null ordinate.
///
/// NaN ordinates count as null.
fn rows_before_cutoff(field: &Field, length: usize, delta: f64) -> usize {
    let ordinate = |row: usize| field.ordinate(row).filter(|t: &f64| !t.is_nan());
    let Some(latest) = (0..length).rev().find_map(ordinate) else {
        return 0;
    };
    let cutoff = latest - delta;
    (0..length)
        .find(|&row| ordinate(row).is_some_and(|t| t >= cutoff))
        .unwrap_or(length)
}

/// Rows to drop from the front of every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionDecision {
    /// Rows older than the time window
    pub by_delta: usize,
    /// Rows beyond the length cap after the time trim
    pub by_length: usize,
}

impl EvictionDecision {
    pub fn total(&self) -> usize {
        self.by_delta + self.by_length
    }

    /// Check if this decision drops anything.
    pub fn requires_trim(&self) -> bool {
        self.total() > 0
    }
}

/// Apply `window` to `store`. Returns what was dropped.
pub fn evict(store: &mut ColumnStore, window: &EvictionWindow) -> EvictionDecision {
    let decision = window.check(store);
    if decision.requires_trim() {
        store.truncate_front(decision.total());
        debug!(
            by_delta = decision.by_delta,
            by_length = decision.by_length,
            remaining = store.length(),
            "Evicted rows"
        );
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FieldId, Value};
    use crate::schema::{FieldSchema, FieldType};
    use std::collections::HashMap;

    fn store_with_times(times: &[Option<f64>]) -> (ColumnStore, FieldId) {
        let mut store = ColumnStore::new();
        let time = store.push_field(&FieldSchema::new("time", FieldType::Time));
        store.push_field(&FieldSchema::new("value", FieldType::Number));
        let cells = times
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|t| (i, Value::Number(t))))
            .collect();
        store.append_sparse(times.len(), HashMap::from([(time, cells)]));
        (store, time)
    }

    fn times(store: &ColumnStore, time: FieldId) -> Vec<Option<f64>> {
        store
            .field(time)
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_ref().and_then(Value::as_f64))
            .collect()
    }

    #[test]
    fn test_nan_ordinate_is_ignored() {
        let (mut store, time) = store_with_times(&[Some(100.0), Some(200.0), Some(f64::NAN)]);
        let window = EvictionWindow::unbounded().with_max_delta(1000.0);

        let decision = evict(&mut store, &window);
        assert!(!decision.requires_trim());
        assert_eq!(store.length(), 3);
        assert_eq!(times(&store, time)[..2], [Some(100.0), Some(200.0)]);

        // Cutoff comes from the last real ordinate, 200
        let (mut store, _) = store_with_times(&[Some(100.0), Some(200.0), Some(f64::NAN)]);
        let window = EvictionWindow::unbounded().with_max_delta(50.0);
        assert_eq!(evict(&mut store, &window).by_delta, 1);
        assert_eq!(store.length(), 2);
    }

    #[test]
    fn test_all_nan_ordinates_drop_nothing() {
        let (mut store, _) = store_with_times(&[Some(f64::NAN), Some(f64::NAN)]);
        let window = EvictionWindow::unbounded().with_max_delta(10.0);
        assert_eq!(evict(&mut store, &window), EvictionDecision::default());
        assert_eq!(store.length(), 2);
    }

    #[test]
    fn test_window_builder() {
        let window = EvictionWindow::unbounded()
            .with_max_length(5)
            .with_max_delta(300.0);
        assert_eq!(window.max_length, Some(5));
        assert_eq!(window.max_delta, Some(300.0));
        assert!(!window.is_unbounded());
        assert!(EvictionWindow::unbounded().is_unbounded());
    }

    #[test]
    fn test_validate() {
        assert!(EvictionWindow::unbounded().validate().is_ok());
        assert!(EvictionWindow::unbounded().with_max_delta(0.0).validate().is_ok());

        let err = EvictionWindow::unbounded()
            .with_max_length(0)
            .validate()
            .unwrap_err();
        assert!(err.is_capacity_configuration());

        assert!(EvictionWindow::unbounded()
            .with_max_delta(-1.0)
            .validate()
            .is_err());
        assert!(EvictionWindow::unbounded()
            .with_max_delta(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_delta_trims_before_cutoff() {
        let (mut store, time) =
            store_with_times(&[Some(100.0), Some(200.0), Some(300.0), Some(500.0)]);
        let decision = evict(&mut store, &EvictionWindow::unbounded().with_max_delta(300.0));

        assert_eq!(decision.by_delta, 1);
        assert_eq!(times(&store, time), vec![Some(200.0), Some(300.0), Some(500.0)]);
        assert!(store.is_aligned());
    }

    #[test]
    fn test_delta_boundary_is_inclusive() {
        let (store, _) = store_with_times(&[Some(100.0), Some(400.0)]);
        let decision = EvictionWindow::unbounded().with_max_delta(300.0).check(&store);
        assert!(!decision.requires_trim());
    }

    #[test]
    fn test_length_caps_after_delta() {
        let (mut store, time) = store_with_times(&[
            Some(300.0),
            Some(400.0),
            Some(500.0),
            Some(501.0),
            Some(502.0),
            Some(503.0),
        ]);
        let window = EvictionWindow::unbounded()
            .with_max_length(5)
            .with_max_delta(300.0);
        let decision = evict(&mut store, &window);

        assert_eq!(decision, EvictionDecision { by_delta: 0, by_length: 1 });
        assert_eq!(store.length(), 5);
        assert_eq!(times(&store, time)[0], Some(400.0));

        let window = EvictionWindow::unbounded()
            .with_max_length(2)
            .with_max_delta(1000.0);
        let decision = evict(&mut store, &window);
        assert_eq!(decision, EvictionDecision { by_delta: 0, by_length: 3 });
        assert_eq!(times(&store, time), vec![Some(502.0), Some(503.0)]);
    }

    #[test]
    fn test_delta_without_time_field_is_ignored() {
        let mut store = ColumnStore::new();
        store.push_field(&FieldSchema::new("value", FieldType::Number));
        store.append_sparse(4, HashMap::new());

        let window = EvictionWindow::unbounded()
            .with_max_delta(0.0)
            .with_max_length(3);
        let decision = evict(&mut store, &window);
        assert_eq!(decision, EvictionDecision { by_delta: 0, by_length: 1 });
        assert_eq!(store.length(), 3);
    }

    #[test]
    fn test_null_ordinates() {
        let (mut store, time) = store_with_times(&[None, Some(100.0), None, Some(150.0), None]);
        evict(&mut store, &EvictionWindow::unbounded().with_max_delta(10.0));
        assert_eq!(times(&store, time), vec![Some(150.0), None]);

        let (store, _) = store_with_times(&[None, None]);
        let decision = EvictionWindow::unbounded().with_max_delta(10.0).check(&store);
        assert!(!decision.requires_trim());
    }

    #[test]
    fn test_unbounded_never_trims() {
        let (mut store, _) = store_with_times(&[Some(1.0), Some(1_000_000.0)]);
        assert!(!evict(&mut store, &EvictionWindow::unbounded()).requires_trim());
        assert_eq!(store.length(), 2);
    }
}
