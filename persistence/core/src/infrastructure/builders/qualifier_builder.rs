// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Position-ordered builder for [`Qualifier`]s.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::data_type::DataTypeDefXsd;
use crate::domain::extension::{Qualifier, QualifierKind};
use crate::domain::reference::parse_enum_name;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{QualifierRow, ReferenceRow, ReferredReferenceRow};
use crate::infrastructure::builders::reference_pool::ReferencePool;
use crate::infrastructure::builders::{non_empty, push_distinct, sort_by_position};

#[derive(Debug)]
struct PendingQualifier {
    qualifier: Qualifier,
    position: i32,
    semantic_id: Vec<i64>,
    value_id: Vec<i64>,
    supplemental_semantic_ids: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct QualifierBuilder {
    qualifiers: HashMap<i64, PendingQualifier>,
    pool: ReferencePool,
}

impl QualifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a qualifier. A second call for the same `row_id` is ignored.
    pub fn add_qualifier(
        &mut self,
        row_id: i64,
        kind: Option<&str>,
        qualifier_type: &str,
        value_type: &str,
        value: Option<String>,
        position: i32,
    ) -> Result<(), RepositoryError> {
        if self.qualifiers.contains_key(&row_id) {
            warn!(row_id, "Qualifier already registered, ignoring duplicate");
            return Ok(());
        }

        let kind = kind
            .filter(|k| !k.is_empty())
            .map(|k| parse_enum_name::<QualifierKind>("qualifier kind", k))
            .transpose()
            .map_err(|e| e.context(format!("qualifier {row_id}")))?;
        let value_type = value_type
            .parse::<DataTypeDefXsd>()
            .map_err(|e| e.context(format!("qualifier {row_id}")))?;

        self.qualifiers.insert(
            row_id,
            PendingQualifier {
                qualifier: Qualifier {
                    kind,
                    qualifier_type: qualifier_type.to_string(),
                    value_type,
                    value: non_empty(value),
                    value_id: None,
                    semantic_id: None,
                    supplemental_semantic_ids: Vec::new(),
                },
                position,
                semantic_id: Vec::new(),
                value_id: Vec::new(),
                supplemental_semantic_ids: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn add_semantic_id(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        let handles = self.parse(row_id, rows, referred)?;
        let pending = self.pending(row_id)?;
        push_distinct(&mut pending.semantic_id, handles);
        ensure_singular(row_id, "semantic ids", &pending.semantic_id)
    }

    pub fn add_value_id(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        let handles = self.parse(row_id, rows, referred)?;
        let pending = self.pending(row_id)?;
        push_distinct(&mut pending.value_id, handles);
        ensure_singular(row_id, "value ids", &pending.value_id)
    }

    pub fn add_supplemental_semantic_ids(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        let handles = self.parse(row_id, rows, referred)?;
        push_distinct(&mut self.pending(row_id)?.supplemental_semantic_ids, handles);
        Ok(())
    }

    /// Register every aggregated qualifier row together with its references.
    pub fn add_rows(&mut self, rows: &[QualifierRow]) -> Result<(), RepositoryError> {
        for row in rows {
            self.add_qualifier(
                row.db_id,
                row.kind.as_deref(),
                &row.qualifier_type,
                &row.value_type,
                row.value.clone(),
                row.position,
            )?;
            self.add_semantic_id(row.db_id, &row.semantic_id, &row.semantic_id_referred)?;
            self.add_value_id(row.db_id, &row.value_id, &row.value_id_referred)?;
            self.add_supplemental_semantic_ids(
                row.db_id,
                &row.supplemental_semantic_ids,
                &row.supplemental_semantic_ids_referred,
            )?;
        }
        Ok(())
    }

    pub fn build(self) -> Result<Vec<Qualifier>, RepositoryError> {
        let references = self.pool.finalize()?;

        let mut entries = Vec::with_capacity(self.qualifiers.len());
        for (row_id, pending) in self.qualifiers {
            let mut qualifier = pending.qualifier;
            qualifier.semantic_id = references.single(&pending.semantic_id, "semanticId")?;
            qualifier.value_id = references.single(&pending.value_id, "valueId")?;
            qualifier.supplemental_semantic_ids =
                references.collect(&pending.supplemental_semantic_ids)?;
            entries.push((pending.position, row_id, qualifier));
        }
        Ok(sort_by_position(entries))
    }

    fn parse(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<Vec<i64>, RepositoryError> {
        if !self.qualifiers.contains_key(&row_id) {
            return Err(RepositoryError::NotFound(format!(
                "qualifier {row_id} is not registered"
            )));
        }
        let handles = self.pool.parse_references(rows);
        self.pool
            .parse_referred_references(referred)
            .map_err(|e| e.context(format!("qualifier {row_id}")))?;
        Ok(handles)
    }

    fn pending(&mut self, row_id: i64) -> Result<&mut PendingQualifier, RepositoryError> {
        self.qualifiers
            .get_mut(&row_id)
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("qualifier {row_id} is not registered"))
            })
    }
}

fn ensure_singular(row_id: i64, field: &str, handles: &[i64]) -> Result<(), RepositoryError> {
    if handles.len() > 1 {
        return Err(RepositoryError::InvariantViolation(format!(
            "qualifier {row_id} has {} {field}",
            handles.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::{KeyTypes, ReferenceTypes};

    fn global(id: i64, key_id: i64, value: &str) -> ReferenceRow {
        ReferenceRow::with_key(
            id,
            ReferenceTypes::ExternalReference,
            key_id,
            KeyTypes::GlobalReference,
            value,
        )
    }

    #[test]
    fn test_positions_restore_order() {
        let mut builder = QualifierBuilder::new();
        builder.add_qualifier(1, None, "third", "xs:int", Some("3".into()), 3).unwrap();
        builder.add_qualifier(2, None, "first", "xs:int", Some("1".into()), 1).unwrap();
        builder.add_qualifier(3, None, "second", "xs:int", Some("2".into()), 2).unwrap();

        let types: Vec<String> = builder
            .build()
            .unwrap()
            .into_iter()
            .map(|q| q.qualifier_type)
            .collect();
        assert_eq!(types, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_kind_and_value_id() {
        let mut builder = QualifierBuilder::new();
        builder
            .add_qualifier(1, Some("ValueQualifier"), "Unit", "xs:string", Some("kg".into()), 0)
            .unwrap();
        let referred = ReferredReferenceRow::new(51, ReferenceTypes::ModelReference, 50, 50).key(
            2,
            KeyTypes::ConceptDescription,
            "urn:cd:kg",
        );
        builder
            .add_value_id(1, &[global(50, 1, "urn:unit:kg")], &[referred])
            .unwrap();

        let built = builder.build().unwrap();
        assert_eq!(built[0].kind, Some(QualifierKind::ValueQualifier));
        let value_id = built[0].value_id.as_ref().unwrap();
        assert_eq!(value_id.keys[0].value, "urn:unit:kg");
        assert_eq!(value_id.chain_depth(), 1);
        assert_eq!(
            value_id.referred_semantic_id.as_deref().unwrap().keys[0].value,
            "urn:cd:kg"
        );
    }

    #[test]
    fn test_two_value_ids_rejected() {
        let mut builder = QualifierBuilder::new();
        builder.add_qualifier(1, None, "Unit", "xs:string", None, 0).unwrap();
        builder.add_value_id(1, &[global(50, 1, "a")], &[]).unwrap();
        let err = builder.add_value_id(1, &[global(51, 2, "b")], &[]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvariantViolation(_)));
    }

    #[test]
    fn test_unknown_value_type_is_malformed() {
        let mut builder = QualifierBuilder::new();
        let err = builder.add_qualifier(1, None, "Unit", "string", None, 0).unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedPayload(_)));
    }
}
