// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Position-ordered builder for [`Extension`]s.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::data_type::DataTypeDefXsd;
use crate::domain::extension::Extension;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{ExtensionRow, ReferenceRow, ReferredReferenceRow};
use crate::infrastructure::builders::reference_pool::ReferencePool;
use crate::infrastructure::builders::{non_empty, push_distinct, sort_by_position};

#[derive(Debug)]
struct PendingExtension {
    extension: Extension,
    position: i32,
    semantic_id: Vec<i64>,
    supplemental_semantic_ids: Vec<i64>,
    refers_to: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct ExtensionBuilder {
    extensions: HashMap<i64, PendingExtension>,
    pool: ReferencePool,
}

impl ExtensionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. A second call for the same `row_id` is ignored.
    pub fn add_extension(
        &mut self,
        row_id: i64,
        name: &str,
        value_type: Option<&str>,
        value: Option<String>,
        position: i32,
    ) -> Result<(), RepositoryError> {
        if self.extensions.contains_key(&row_id) {
            warn!(row_id, "Extension already registered, ignoring duplicate");
            return Ok(());
        }

        let value_type = value_type
            .filter(|v| !v.is_empty())
            .map(str::parse::<DataTypeDefXsd>)
            .transpose()
            .map_err(|e| e.context(format!("extension {row_id}")))?;

        let mut extension = Extension::new(name);
        extension.value_type = value_type;
        extension.value = non_empty(value);

        self.extensions.insert(
            row_id,
            PendingExtension {
                extension,
                position,
                semantic_id: Vec::new(),
                supplemental_semantic_ids: Vec::new(),
                refers_to: Vec::new(),
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
        if pending.semantic_id.len() > 1 {
            return Err(RepositoryError::InvariantViolation(format!(
                "extension {row_id} has {} semantic ids",
                pending.semantic_id.len()
            )));
        }
        Ok(())
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

    pub fn add_refers_to(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<(), RepositoryError> {
        let handles = self.parse(row_id, rows, referred)?;
        push_distinct(&mut self.pending(row_id)?.refers_to, handles);
        Ok(())
    }

    /// Register every aggregated extension row together with its references.
    pub fn add_rows(&mut self, rows: &[ExtensionRow]) -> Result<(), RepositoryError> {
        for row in rows {
            self.add_extension(
                row.db_id,
                &row.name,
                row.value_type.as_deref(),
                row.value.clone(),
                row.position,
            )?;
            self.add_semantic_id(row.db_id, &row.semantic_id, &row.semantic_id_referred)?;
            self.add_supplemental_semantic_ids(
                row.db_id,
                &row.supplemental_semantic_ids,
                &row.supplemental_semantic_ids_referred,
            )?;
            self.add_refers_to(row.db_id, &row.refers_to, &row.refers_to_referred)?;
        }
        Ok(())
    }

    /// Finalize the reference pool and return the extensions in position
    /// order.
    pub fn build(self) -> Result<Vec<Extension>, RepositoryError> {
        let references = self.pool.finalize()?;

        let mut entries = Vec::with_capacity(self.extensions.len());
        for (row_id, pending) in self.extensions {
            let mut extension = pending.extension;
            extension.semantic_id = references.single(&pending.semantic_id, "semanticId")?;
            extension.supplemental_semantic_ids =
                references.collect(&pending.supplemental_semantic_ids)?;
            extension.refers_to = references.collect(&pending.refers_to)?;
            entries.push((pending.position, row_id, extension));
        }
        Ok(sort_by_position(entries))
    }

    fn parse(
        &mut self,
        row_id: i64,
        rows: &[ReferenceRow],
        referred: &[ReferredReferenceRow],
    ) -> Result<Vec<i64>, RepositoryError> {
        if !self.extensions.contains_key(&row_id) {
            return Err(RepositoryError::NotFound(format!(
                "extension {row_id} is not registered"
            )));
        }
        let handles = self.pool.parse_references(rows);
        self.pool
            .parse_referred_references(referred)
            .map_err(|e| e.context(format!("extension {row_id}")))?;
        Ok(handles)
    }

    fn pending(&mut self, row_id: i64) -> Result<&mut PendingExtension, RepositoryError> {
        self.extensions
            .get_mut(&row_id)
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("extension {row_id} is not registered"))
            })
    }
}
