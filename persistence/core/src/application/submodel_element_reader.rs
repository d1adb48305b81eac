// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Submodel Element Reader
//!
//! Loads every element of one submodel in a single query, builds each
//! element, and nests children under their container parents.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::spawn_blocking;
use tracing::debug;

use crate::domain::repository::{RepositoryError, SubmodelElementRowSource};
use crate::domain::rows::SubmodelElementRow;
use crate::domain::submodel_element::SubmodelElement;
use crate::infrastructure::builders::{build_submodel_element, sort_by_position};

pub struct SubmodelElementReader {
    source: Arc<dyn SubmodelElementRowSource>,
}

impl SubmodelElementReader {
    pub fn new(source: Arc<dyn SubmodelElementRowSource>) -> Self {
        Self { source }
    }

    /// Top-level elements of `submodel_id`, each with its nested children,
    /// ordered by position at every level.
    ///
    /// Element construction fans out on the rayon pool, so the build runs
    /// on tokio's blocking threads.
    ///
    /// # Errors
    ///
    /// - `NotFound`: a row names a parent that is not part of the submodel
    /// - `InvariantViolation`: a row hangs below an element that cannot hold
    ///   children, or the parent links form a cycle
    /// - any error of `build_submodel_element`
    pub async fn read_submodel_elements(
        &self,
        submodel_id: &str,
    ) -> Result<Vec<SubmodelElement>, RepositoryError> {
        let started = Instant::now();
        let rows = self.source.fetch_submodel_element_rows(submodel_id).await?;
        let row_count = rows.len();

        let owner = submodel_id.to_string();
        let tree = spawn_blocking(move || build_tree(&owner, &rows))
            .await
            .map_err(|err| {
                RepositoryError::InternalFailure(format!("element build task failed: {err}"))
            })??;

        debug!(
            submodel_id,
            elements = row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Read submodel elements"
        );

        Ok(tree)
    }
}

/// Build every row and nest children under their parents.
fn build_tree(
    submodel_id: &str,
    rows: &[SubmodelElementRow],
) -> Result<Vec<SubmodelElement>, RepositoryError> {
    let mut elements: HashMap<i64, SubmodelElement> = HashMap::with_capacity(rows.len());
    let mut children: HashMap<i64, Vec<(i32, i64)>> = HashMap::new();
    let mut roots: Vec<(i32, i64, i64)> = Vec::new();
    for row in rows {
        elements.insert(row.db_id, build_submodel_element(row)?);
        match row.parent_id {
            Some(parent) => children
                .entry(parent)
                .or_default()
                .push((row.position, row.db_id)),
            None => roots.push((row.position, row.db_id, row.db_id)),
        }
    }

    for parent in children.keys() {
        if !elements.contains_key(parent) {
            return Err(RepositoryError::NotFound(format!(
                "parent element {parent} of submodel {submodel_id}"
            )));
        }
    }

    let mut tree = Vec::with_capacity(roots.len());
    for id in sort_by_position(roots) {
        tree.push(attach_children(id, &mut elements, &mut children)?);
    }

    if !elements.is_empty() {
        return Err(RepositoryError::InvariantViolation(format!(
            "{} elements of submodel {submodel_id} are not reachable from a top-level element",
            elements.len()
        )));
    }

    Ok(tree)
}

/// Remove `id` from `elements` and fill its container slot, depth first.
fn attach_children(
    id: i64,
    elements: &mut HashMap<i64, SubmodelElement>,
    children: &mut HashMap<i64, Vec<(i32, i64)>>,
) -> Result<SubmodelElement, RepositoryError> {
    let mut element = elements.remove(&id).ok_or_else(|| {
        RepositoryError::InvariantViolation(format!("element {id} is nested twice"))
    })?;

    let Some(child_ids) = children.remove(&id) else {
        return Ok(element);
    };

    let model_type = element.model_type();
    let Some(slot) = element.children_mut() else {
        return Err(RepositoryError::InvariantViolation(format!(
            "element {id} of type {model_type} cannot contain child elements"
        )));
    };

    let ordered = child_ids
        .into_iter()
        .map(|(position, child)| (position, child, child))
        .collect();
    for child in sort_by_position(ordered) {
        slot.push(attach_children(child, elements, children)?);
    }
    Ok(element)
}
