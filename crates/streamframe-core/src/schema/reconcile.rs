//! Incremental schema reconciliation.
//!
//! Incoming schemas may be partial: fields they omit are left untouched,
//! fields they add are appended, and fields whose type changed take the new
//! type (last writer wins).

use super::model::{FieldType, Schema};
use tracing::debug;

/// A type overwrite detected while reconciling.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeChange {
    /// Position of the field in the reconciled schema
    pub position: usize,
    /// Field name
    pub name: String,
    /// Type before the push
    pub from: FieldType,
    /// Type after the push
    pub to: FieldType,
}

/// Result of reconciling an incoming schema against the current one.
#[derive(Debug, Clone)]
pub struct SchemaDiff {
    /// The reconciled schema
    pub schema: Schema,
    /// Positions (in `schema`) of fields that did not exist before
    pub added: Vec<usize>,
    /// Fields whose type was overwritten
    pub type_changes: Vec<TypeChange>,
    /// For each incoming field, its position in `schema`
    pub incoming_positions: Vec<usize>,
}

impl SchemaDiff {
    /// Whether reconciliation changed anything.
    pub fn is_changed(&self) -> bool {
        !self.added.is_empty() || !self.type_changes.is_empty()
    }
}

/// Reconcile `incoming` into `existing` without mutating either.
pub fn reconcile(existing: &Schema, incoming: &Schema) -> SchemaDiff {
    let mut schema = existing.clone();
    let mut added = Vec::new();
    let mut type_changes = Vec::new();
    let mut incoming_positions = Vec::with_capacity(incoming.len());

    for field in &incoming.fields {
        match schema.position(field) {
            Some(position) => {
                let current = &mut schema.fields[position];
                if current.field_type != field.field_type {
                    type_changes.push(TypeChange {
                        position,
                        name: field.name.clone(),
                        from: current.field_type,
                        to: field.field_type,
                    });
                    current.field_type = field.field_type;
                }
                incoming_positions.push(position);
            }
            None => {
                schema.fields.push(field.clone());
                let position = schema.fields.len() - 1;
                added.push(position);
                incoming_positions.push(position);
            }
        }
    }

    if !added.is_empty() || !type_changes.is_empty() {
        debug!(
            added = added.len(),
            type_changes = type_changes.len(),
            fields = schema.len(),
            "Schema reconciled"
        );
    }

    SchemaDiff {
        schema,
        added,
        type_changes,
        incoming_positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Labels;
    use crate::schema::FieldSchema;

    fn schema(fields: &[(&str, FieldType)]) -> Schema {
        Schema::new(
            fields
                .iter()
                .map(|(name, ty)| FieldSchema::new(*name, *ty))
                .collect(),
        )
    }

    #[test]
    fn test_reconcile_into_empty() {
        let incoming = schema(&[("time", FieldType::Time), ("value", FieldType::Number)]);
        let diff = reconcile(&Schema::default(), &incoming);

        assert_eq!(diff.schema, incoming);
        assert_eq!(diff.added, vec![0, 1]);
        assert!(diff.type_changes.is_empty());
        assert_eq!(diff.incoming_positions, vec![0, 1]);
        assert!(diff.is_changed());
    }

    #[test]
    fn test_partial_schema_keeps_missing_fields() {
        let existing = schema(&[
            ("time", FieldType::Time),
            ("a", FieldType::Number),
            ("b", FieldType::Number),
        ]);
        let incoming = schema(&[("b", FieldType::Number), ("c", FieldType::String)]);
        let diff = reconcile(&existing, &incoming);

        let names: Vec<_> = diff.schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "a", "b", "c"]);
        assert_eq!(diff.added, vec![3]);
        assert_eq!(diff.incoming_positions, vec![2, 3]);
    }

    #[test]
    fn test_type_change_overwrites() {
        let existing = schema(&[("time", FieldType::Time), ("v", FieldType::Number)]);
        let incoming = schema(&[("v", FieldType::String)]);
        let diff = reconcile(&existing, &incoming);

        assert_eq!(diff.schema.fields[1].field_type, FieldType::String);
        assert_eq!(
            diff.type_changes,
            vec![TypeChange {
                position: 1,
                name: "v".into(),
                from: FieldType::Number,
                to: FieldType::String,
            }]
        );
        assert!(diff.added.is_empty());
    }

    #[test]
    fn test_identical_schema_is_unchanged() {
        let existing = schema(&[("time", FieldType::Time), ("v", FieldType::Number)]);
        let diff = reconcile(&existing, &existing.clone());
        assert!(!diff.is_changed());
        assert_eq!(diff.schema, existing);
    }

    #[test]
    fn test_labeled_fields_match_by_label_key() {
        let mut host_a = Labels::new();
        host_a.insert("host".into(), "a".into());
        let mut host_b = Labels::new();
        host_b.insert("host".into(), "b".into());

        let existing = Schema::new(vec![
            FieldSchema::new("cpu", FieldType::Number).with_labels(host_a.clone())
        ]);
        let incoming = Schema::new(vec![
            FieldSchema::new("cpu", FieldType::Number).with_labels(host_a),
            FieldSchema::new("cpu", FieldType::Number).with_labels(host_b),
        ]);
        let diff = reconcile(&existing, &incoming);

        assert_eq!(diff.schema.len(), 2);
        assert_eq!(diff.added, vec![1]);
        assert_eq!(diff.incoming_positions, vec![0, 1]);
    }
}
