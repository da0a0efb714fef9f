//! Batch validation and lowering.
//!
//! A batch is checked in full against the schema it will produce before the
//! buffer is touched. The result is a plan of dense value sequences keyed by
//! schema position plus optional per-row label sets, which the buffer then
//! routes to concrete fields.

use super::batch::{Batch, FrameData};
use crate::error::MalformedBatch;
use crate::frame::Value;
use crate::labels::{parse_labels, LabelKey, Labels};
use crate::schema::{reconcile, Schema, SchemaDiff};

/// A validated batch, ready to apply.
#[derive(Debug)]
pub(crate) struct AppendPlan {
    /// Schema reconciliation to apply first
    pub diff: Option<SchemaDiff>,
    /// Non-empty value sequences by schema position
    pub columns: Vec<(usize, Vec<Option<Value>>)>,
    /// Rows the batch adds
    pub rows: usize,
    /// Label set and its key per row, when rows are label-tagged
    pub row_labels: Option<Vec<(Labels, LabelKey)>>,
}

/// Validate `batch` against `schema` and lower it into a plan.
pub(crate) fn plan(
    schema: &Schema,
    batch: Batch,
) -> std::result::Result<AppendPlan, MalformedBatch> {
    let Batch {
        schema: incoming,
        data,
    } = batch;

    let diff = incoming.map(|incoming| reconcile(schema, &incoming));
    let (target, positions): (&Schema, Vec<usize>) = match &diff {
        Some(diff) => (&diff.schema, diff.incoming_positions.clone()),
        None => (schema, (0..schema.len()).collect()),
    };

    let FrameData { values, labels } = data.unwrap_or_default();
    if values.len() > positions.len() {
        return Err(MalformedBatch::ColumnCount {
            expected: positions.len(),
            actual: values.len(),
        });
    }

    let rows = row_count(&values)?;
    let labels_column = target.labels_column();

    let mut row_labels = None;
    let mut columns = Vec::with_capacity(values.len());
    for (j, sequence) in values.into_iter().enumerate() {
        if sequence.is_empty() {
            continue;
        }
        let position = positions[j];
        if Some(position) == labels_column {
            row_labels = Some(parse_label_column(sequence)?);
        } else {
            columns.push((position, sequence));
        }
    }

    if let Some(explicit) = labels {
        if explicit.len() != rows {
            return Err(MalformedBatch::LabelCount {
                rows,
                labels: explicit.len(),
            });
        }
        row_labels = Some(match row_labels {
            Some(mut parsed) => {
                for (row, extra) in parsed.iter_mut().zip(explicit) {
                    row.extend(extra);
                }
                parsed
            }
            None => explicit,
        });
    }

    let row_labels = row_labels.map(|sets| {
        sets.into_iter()
            .map(|labels| {
                let key = LabelKey::from_labels(&labels);
                (labels, key)
            })
            .collect()
    });

    Ok(AppendPlan {
        diff,
        columns,
        rows,
        row_labels,
    })
}

/// Shared length of the non-empty sequences.
fn row_count(values: &[Vec<Option<Value>>]) -> std::result::Result<usize, MalformedBatch> {
    let mut lengths: Vec<usize> = values.iter().map(Vec::len).filter(|&l| l > 0).collect();
    lengths.sort_unstable();
    lengths.dedup();
    match lengths.as_slice() {
        [] => Ok(0),
        [rows] => Ok(*rows),
        _ => Err(MalformedBatch::LengthMismatch { lengths }),
    }
}

fn parse_label_column(
    sequence: Vec<Option<Value>>,
) -> std::result::Result<Vec<Labels>, MalformedBatch> {
    sequence
        .into_iter()
        .map(|cell| match cell {
            None => Ok(Labels::new()),
            Some(Value::String(text)) => parse_labels(&text),
            Some(other) => Err(MalformedBatch::InvalidLabels {
                input: other.to_string(),
                reason: "label cells must be strings".into(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, FieldType, LABELS_FIELD};

    fn base_schema() -> Schema {
        Schema::new(vec![
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("value", FieldType::Number),
        ])
    }

    fn nums(values: &[f64]) -> Vec<Option<Value>> {
        values.iter().map(|v| Some(Value::Number(*v))).collect()
    }

    #[test]
    fn test_plan_dense() {
        let batch = Batch::from_values(vec![nums(&[1.0, 2.0]), nums(&[10.0, 20.0])]);
        let plan = plan(&base_schema(), batch).unwrap();

        assert!(plan.diff.is_none());
        assert_eq!(plan.rows, 2);
        assert_eq!(plan.columns.len(), 2);
        assert!(plan.row_labels.is_none());
    }

    #[test]
    fn test_plan_empty_sequences_are_sparse() {
        let batch = Batch::from_values(vec![nums(&[1.0, 2.0, 3.0]), vec![]]);
        let plan = plan(&base_schema(), batch).unwrap();
        assert_eq!(plan.rows, 3);
        assert_eq!(plan.columns.len(), 1);
        assert_eq!(plan.columns[0].0, 0);
    }

    #[test]
    fn test_plan_rejects_length_mismatch() {
        let batch = Batch::from_values(vec![nums(&[1.0, 2.0]), nums(&[10.0])]);
        let err = plan(&base_schema(), batch).unwrap_err();
        assert_eq!(err, MalformedBatch::LengthMismatch { lengths: vec![1, 2] });
    }

    #[test]
    fn test_plan_rejects_extra_columns() {
        let batch = Batch::from_values(vec![nums(&[1.0]), nums(&[1.0]), nums(&[1.0])]);
        let err = plan(&base_schema(), batch).unwrap_err();
        assert_eq!(err, MalformedBatch::ColumnCount { expected: 2, actual: 3 });
    }

    #[test]
    fn test_plan_maps_through_partial_schema() {
        let incoming = Schema::new(vec![
            FieldSchema::new("extra", FieldType::String),
            FieldSchema::new("time", FieldType::Time),
        ]);
        let batch = Batch::from_schema(incoming)
            .with_values(vec![vec![Some("x".into())], nums(&[5.0])]);
        let plan = plan(&base_schema(), batch).unwrap();

        let diff = plan.diff.as_ref().unwrap();
        assert_eq!(diff.added, vec![2]);
        let positions: Vec<_> = plan.columns.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![2, 0]);
    }

    #[test]
    fn test_plan_parses_label_column() {
        let schema = Schema::new(vec![
            FieldSchema::new(LABELS_FIELD, FieldType::String),
            FieldSchema::new("time", FieldType::Time),
            FieldSchema::new("value", FieldType::Number),
        ]);
        let batch = Batch::from_values(vec![
            vec![Some(r#"{host="a"}"#.into()), None],
            nums(&[1.0, 2.0]),
            nums(&[10.0, 20.0]),
        ]);
        let plan = plan(&schema, batch).unwrap();

        let row_labels = plan.row_labels.unwrap();
        assert_eq!(row_labels[0].1.as_str(), r#"{host="a"}"#);
        assert!(row_labels[1].0.is_empty());
        assert_eq!(plan.columns.len(), 2);
    }

    #[test]
    fn test_plan_rejects_bad_label_cells() {
        let schema = Schema::new(vec![
            FieldSchema::new(LABELS_FIELD, FieldType::String),
            FieldSchema::new("value", FieldType::Number),
        ]);
        let batch = Batch::from_values(vec![vec![Some(Value::Number(1.0))], nums(&[1.0])]);
        assert!(matches!(
            plan(&schema, batch),
            Err(MalformedBatch::InvalidLabels { .. })
        ));
    }

    #[test]
    fn test_plan_explicit_labels_must_cover_rows() {
        let batch = Batch::from_values(vec![nums(&[1.0, 2.0]), nums(&[10.0, 20.0])])
            .with_row_labels(vec![Labels::new()]);
        let err = plan(&base_schema(), batch).unwrap_err();
        assert_eq!(err, MalformedBatch::LabelCount { rows: 2, labels: 1 });
    }

    #[test]
    fn test_plan_empty_batch() {
        let plan = plan(&base_schema(), Batch::from_values(vec![])).unwrap();
        assert_eq!(plan.rows, 0);
        assert!(plan.columns.is_empty());
    }
}
