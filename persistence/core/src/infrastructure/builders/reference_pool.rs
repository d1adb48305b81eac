// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reference Pool
//!
//! Arena of [`ReferenceBuilder`]s keyed by root row id. Row groups are routed
//! into it with [`ReferencePool::parse_references`] and
//! [`ReferencePool::parse_referred_references`]; callers keep the returned
//! root ids as handles and resolve them after [`ReferencePool::finalize`].
//!
//! A pool is owned by exactly one parse task. Concurrent parsers each use
//! their own pool, so no locking is involved.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::reference::Reference;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{ReferenceRow, ReferredReferenceRow};
use crate::infrastructure::builders::reference_builder::ReferenceBuilder;

#[derive(Debug, Default)]
pub struct ReferencePool {
    builders: HashMap<i64, ReferenceBuilder>,
}

impl ReferencePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn contains(&self, root_id: i64) -> bool {
        self.builders.contains_key(&root_id)
    }

    /// Route reference rows into builders, creating one per unseen
    /// `reference_id`. Returns the distinct reference ids of `rows` in
    /// first-seen order.
    pub fn parse_references(&mut self, rows: &[ReferenceRow]) -> Vec<i64> {
        let mut handles = Vec::new();
        for row in rows {
            if !handles.contains(&row.reference_id) {
                handles.push(row.reference_id);
            }

            let builder = self
                .builders
                .entry(row.reference_id)
                .or_insert_with(|| ReferenceBuilder::new(row.reference_id, row.reference_type));

            match (row.key_id, row.key_type, row.key_value.as_deref()) {
                (Some(key_id), Some(key_type), Some(value)) => {
                    builder.create_key(key_id, key_type, value)
                }
                (None, None, None) => {}
                _ => warn!(
                    reference_id = row.reference_id,
                    "Skipping reference key row with incomplete key fields"
                ),
            }
        }
        handles
    }

    /// Route referred (descendant) rows into the builders of their roots.
    ///
    /// Rows missing a required field are skipped with a warning. A row whose
    /// root has no builder fails with `NotFound`: root rows must be parsed
    /// before their descendants.
    pub fn parse_referred_references(
        &mut self,
        rows: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        for row in rows {
            let Some(root_id) = row.root_reference else {
                warn!(
                    reference_id = ?row.reference_id,
                    "Skipping referred reference row without root reference"
                );
                continue;
            };

            let builder = self.builders.get_mut(&root_id).ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "no reference builder for root reference {root_id}"
                ))
            })?;

            let (Some(reference_id), Some(parent_id), Some(reference_type)) =
                (row.reference_id, row.parent_reference, row.reference_type)
            else {
                warn!(root_id, "Skipping referred reference row with missing identity fields");
                continue;
            };

            let (Some(key_id), Some(key_type), Some(key_value)) =
                (row.key_id, row.key_type, row.key_value.as_deref())
            else {
                warn!(
                    root_id,
                    reference_id,
                    "Skipping referred reference row with missing key fields"
                );
                continue;
            };

            builder.create_referred_semantic_id(reference_id, parent_id, reference_type)?;
            builder.create_referred_semantic_id_key(reference_id, key_id, key_type, key_value)?;
        }
        Ok(())
    }

    /// Build every reference in the pool. Consumes the pool, so each builder
    /// is finalized exactly once.
    pub fn finalize(self) -> Result<ResolvedReferences, RepositoryError> {
        let mut references = HashMap::with_capacity(self.builders.len());
        for (root_id, builder) in self.builders {
            references.insert(root_id, builder.build_nested_structure()?);
        }
        Ok(ResolvedReferences { references })
    }
}

/// Finished references of one finalized pool.
#[derive(Debug, Default)]
pub struct ResolvedReferences {
    references: HashMap<i64, Reference>,
}

impl ResolvedReferences {
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, handle: i64) -> Option<&Reference> {
        self.references.get(&handle)
    }

    /// Resolve a list of handles, preserving their order.
    pub fn collect(&self, handles: &[i64]) -> Result<Vec<Reference>, RepositoryError> {
        handles
            .iter()
            .map(|handle| {
                self.references.get(handle).cloned().ok_or_else(|| {
                    RepositoryError::NotFound(format!("reference {handle} was not built"))
                })
            })
            .collect()
    }

    /// Resolve a singular field: zero handles is `None`, more than one is an
    /// invariant violation.
    pub fn single(
        &self,
        handles: &[i64],
        field: &str,
    ) -> Result<Option<Reference>, RepositoryError> {
        match handles {
            [] => Ok(None),
            [handle] => self.collect(&[*handle]).map(|mut refs| refs.pop()),
            _ => Err(RepositoryError::InvariantViolation(format!(
                "expected at most one {field} reference, got {}",
                handles.len()
            ))),
        }
    }

    pub fn into_map(self) -> HashMap<i64, Reference> {
        self.references
    }
}

/// Parse one row group into its own pool and return the finished references
/// in first-seen order.
///
/// Referred rows must belong to a root in `rows`; a stray descendant fails
/// with `NotFound`, as it does in the child builders.
pub fn build_references(
    rows: &[ReferenceRow],
    referred: &[ReferredReferenceRow],
) -> Result<Vec<Reference>, RepositoryError> {
    if rows.is_empty() && referred.is_empty() {
        return Ok(Vec::new());
    }
    let mut pool = ReferencePool::new();
    let handles = pool.parse_references(rows);
    pool.parse_referred_references(referred)?;
    pool.finalize()?.collect(&handles)
}

/// Like [`build_references`] for a field that holds at most one reference.
pub fn build_single_reference(
    rows: &[ReferenceRow],
    referred: &[ReferredReferenceRow],
    field: &str,
) -> Result<Option<Reference>, RepositoryError> {
    let mut references = build_references(rows, referred)?;
    if references.len() > 1 {
        return Err(RepositoryError::InvariantViolation(format!(
            "expected at most one {field} reference, got {}",
            references.len()
        )));
    }
    Ok(references.pop())
}
