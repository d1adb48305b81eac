// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Position-ordered builder for [`EmbeddedDataSpecification`]s with IEC 61360
//! content.
//!
//! An embedded data specification is assembled from two row kinds sharing an
//! `eds_id`: the keys of its data-specification reference and one content
//! row. Unit ids and value-list value ids are parsed into the same reference
//! pool and resolved in [`EmbeddedDataSpecificationBuilder::build`].

use std::collections::HashMap;

use tracing::warn;

use crate::domain::data_specification::{
    DataSpecificationIec61360, EmbeddedDataSpecification, ValueList, ValueReferencePair,
};
use crate::domain::data_type::DataTypeIec61360;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{
    EdsContentIec61360Row, EmbeddedDataSpecificationRows, ReferenceRow, ReferredReferenceRow,
};
use crate::infrastructure::builders::reference_pool::ReferencePool;
use crate::infrastructure::builders::{non_empty, push_distinct, sort_by_position};

#[derive(Debug)]
struct PendingContent {
    content: DataSpecificationIec61360,
    unit_id: Vec<i64>,
    value_pairs: Vec<(String, i64)>,
}

#[derive(Debug)]
struct PendingSpecification {
    position: i32,
    data_specification: Vec<i64>,
    content: Option<PendingContent>,
}

#[derive(Debug, Default)]
pub struct EmbeddedDataSpecificationBuilder {
    specifications: HashMap<i64, PendingSpecification>,
    pool: ReferencePool,
}

impl EmbeddedDataSpecificationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an embedded data specification. A second call for the same
    /// `eds_id` is ignored.
    pub fn add_specification(&mut self, eds_id: i64, position: i32) {
        if self.specifications.contains_key(&eds_id) {
            warn!(eds_id, "Embedded data specification already registered, ignoring duplicate");
            return;
        }
        self.specifications.insert(
            eds_id,
            PendingSpecification {
                position,
                data_specification: Vec::new(),
                content: None,
            },
        );
    }

    /// Attach the data-specification reference. At most one reference is
    /// accepted per specification.
    pub fn add_data_specification(
        &mut self,
        eds_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        let handles = self.parse(eds_id, rows, referred)?;
        let pending = self.pending(eds_id)?;
        push_distinct(&mut pending.data_specification, handles);
        if pending.data_specification.len() > 1 {
            return Err(RepositoryError::InvariantViolation(format!(
                "embedded data specification {eds_id} has {} data specification references",
                pending.data_specification.len()
            )));
        }
        Ok(())
    }

    /// Attach IEC 61360 content. A second content row for the same
    /// specification is ignored.
    pub fn add_content(&mut self, row: &EdsContentIec61360Row) -> Result<(), RepositoryError> {
        let eds_id = row.eds_id;
        if self.pending(eds_id)?.content.is_some() {
            warn!(
                eds_id,
                iec_id = row.iec_id,
                "IEC 61360 content already attached, ignoring duplicate"
            );
            return Ok(());
        }

        let unit_id = self.parse(eds_id, &row.unit_reference_keys, &row.unit_reference_referred)?;
        if unit_id.len() > 1 {
            return Err(RepositoryError::InvariantViolation(format!(
                "IEC 61360 content {} has {} unit ids",
                row.iec_id,
                unit_id.len()
            )));
        }

        let mut value_pairs = Vec::with_capacity(row.value_list_entries.len());
        for entry in &row.value_list_entries {
            let handles =
                self.parse(eds_id, &entry.reference_rows, &entry.referred_reference_rows)?;
            match handles.as_slice() {
                [handle] => value_pairs.push((entry.value.clone(), *handle)),
                _ => {
                    return Err(RepositoryError::InvariantViolation(format!(
                        "value reference pair {} has {} value ids, expected exactly one",
                        entry.value_ref_pair_id,
                        handles.len()
                    )))
                }
            }
        }

        let data_type = row
            .data_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::parse::<DataTypeIec61360>)
            .transpose()
            .map_err(|e| e.context(format!("IEC 61360 content {}", row.iec_id)))?;

        let content = DataSpecificationIec61360 {
            preferred_name: row.preferred_name.clone(),
            short_name: row.short_name.clone(),
            unit: non_empty(row.unit.clone()),
            unit_id: None,
            source_of_definition: non_empty(row.source_of_definition.clone()),
            symbol: non_empty(row.symbol.clone()),
            data_type,
            definition: row.definition.clone(),
            value_format: non_empty(row.value_format.clone()),
            value_list: None,
            value: non_empty(row.value.clone()),
            level_type: row.level_type,
        };

        self.pending(eds_id)?.content = Some(PendingContent {
            content,
            unit_id,
            value_pairs,
        });
        Ok(())
    }

    /// Register every specification of an aggregate: content rows first (they
    /// carry the position), then data-specification references grouped by
    /// `eds_id`.
    pub fn add_rows(
        &mut self,
        rows: &EmbeddedDataSpecificationRows,
    ) -> Result<(), RepositoryError> {
        for content in &rows.iec61360 {
            if !self.specifications.contains_key(&content.eds_id) {
                self.add_specification(content.eds_id, content.position);
            }
            self.add_content(content)?;
        }

        let mut groups: Vec<(i64, Vec<ReferenceRow>)> = Vec::new();
        for row in &rows.references {
            match groups.iter_mut().find(|(eds_id, _)| *eds_id == row.eds_id) {
                Some((_, group)) => group.push(row.as_reference_row()),
                None => groups.push((row.eds_id, vec![row.as_reference_row()])),
            }
        }

        for (eds_id, group) in groups {
            if !self.specifications.contains_key(&eds_id) {
                self.add_specification(eds_id, 0);
            }
            let referred: Vec<ReferredReferenceRow> = rows
                .referred_references
                .iter()
                .filter(|r| {
                    r.root_reference
                        .is_some_and(|root| group.iter().any(|g| g.reference_id == root))
                })
                .cloned()
                .collect();
            self.add_data_specification(eds_id, &group, &referred)?;
        }
        Ok(())
    }

    pub fn build(self) -> Result<Vec<EmbeddedDataSpecification>, RepositoryError> {
        let references = self.pool.finalize()?;

        let mut entries = Vec::with_capacity(self.specifications.len());
        for (eds_id, pending) in self.specifications {
            let data_specification = references
                .single(&pending.data_specification, "dataSpecification")?
                .ok_or_else(|| {
                    RepositoryError::InvariantViolation(format!(
                        "embedded data specification {eds_id} has no data specification reference"
                    ))
                })?;

            let pending_content = pending.content.ok_or_else(|| {
                RepositoryError::InvariantViolation(format!(
                    "embedded data specification {eds_id} has no content"
                ))
            })?;

            let mut content = pending_content.content;
            content.unit_id = references.single(&pending_content.unit_id, "unitId")?;
            if !pending_content.value_pairs.is_empty() {
                let mut value_reference_pairs =
                    Vec::with_capacity(pending_content.value_pairs.len());
                for (value, handle) in pending_content.value_pairs {
                    let value_id = references.get(handle).cloned().ok_or_else(|| {
                        RepositoryError::NotFound(format!(
                            "value id reference {handle} was not built"
                        ))
                    })?;
                    value_reference_pairs.push(ValueReferencePair { value, value_id });
                }
                content.value_list = Some(ValueList {
                    value_reference_pairs,
                });
            }

            entries.push((
                pending.position,
                eds_id,
                EmbeddedDataSpecification {
                    data_specification,
                    data_specification_content: content,
                },
            ));
        }
        Ok(sort_by_position(entries))
    }

    fn parse(
        &mut self,
        eds_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<Vec<i64>, RepositoryError> {
        if !self.specifications.contains_key(&eds_id) {
            return Err(RepositoryError::NotFound(format!(
                "embedded data specification {eds_id} is not registered"
            )));
        }
        let handles = self.pool.parse_references(rows);
        self.pool
            .parse_referred_references(referred)
            .map_err(|e| e.context(format!("embedded data specification {eds_id}")))?;
        Ok(handles)
    }

    fn pending(&mut self, eds_id: i64) -> Result<&mut PendingSpecification, RepositoryError> {
        self.specifications.get_mut(&eds_id).ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "embedded data specification {eds_id} is not registered"
            ))
        })
    }
}
