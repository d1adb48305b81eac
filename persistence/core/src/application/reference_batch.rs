// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Batch Reference Fetcher
//!
//! Hydrates many references, each with its full `referredSemanticId` chain,
//! in exactly two queries regardless of how many ids are requested.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Route root and descendant rows to per-root builders
//! - **Collaborators:**
//!   - Domain: `Reference`, `ReferenceRowSource`
//!   - Infrastructure: `ReferenceBuilder`

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::domain::reference::Reference;
use crate::domain::repository::{ReferenceRowSource, RepositoryError};
use crate::infrastructure::builders::ReferenceBuilder;

pub struct ReferenceBatchFetcher {
    source: Arc<dyn ReferenceRowSource>,
}

impl ReferenceBatchFetcher {
    pub fn new(source: Arc<dyn ReferenceRowSource>) -> Self {
        Self { source }
    }

    /// Hydrate every reference in `root_ids`.
    ///
    /// Ids that do not exist are absent from the result. Duplicate ids are
    /// collapsed.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation`: a chain branches (two children under one parent)
    /// - `NotFound`: a descendant names a parent that was never loaded
    /// - `InternalFailure`: the row source failed
    pub async fn build_references_batch(
        &self,
        root_ids: &[i64],
    ) -> Result<HashMap<i64, Reference>, RepositoryError> {
        let mut ids = root_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let started = Instant::now();

        let root_rows = self.source.fetch_root_rows(&ids).await?;
        let mut builders: BTreeMap<i64, ReferenceBuilder> = BTreeMap::new();
        for row in &root_rows {
            let builder = builders
                .entry(row.reference_id)
                .or_insert_with(|| ReferenceBuilder::new(row.reference_id, row.reference_type));
            if let (Some(key_id), Some(key_type), Some(value)) =
                (row.key_id, row.key_type, row.key_value.as_ref())
            {
                builder.create_key(key_id, key_type, value.clone());
            }
        }

        if builders.is_empty() {
            return Ok(HashMap::new());
        }

        let found: Vec<i64> = builders.keys().copied().collect();
        let descendant_rows = self.source.fetch_descendant_rows(&found).await?;

        let mut seen_per_root: HashMap<i64, HashSet<i64>> = HashMap::new();
        for row in &descendant_rows {
            let (Some(reference_id), Some(root)) = (row.reference_id, row.root_reference) else {
                warn!(
                    reference_id = ?row.reference_id,
                    "Skipping descendant row without id or root"
                );
                continue;
            };
            let Some(builder) = builders.get_mut(&root) else {
                warn!(reference_id, root, "Skipping descendant row for unknown root");
                continue;
            };

            let seen = seen_per_root.entry(root).or_default();
            if !seen.contains(&reference_id) {
                let Some(reference_type) = row.reference_type else {
                    warn!(reference_id, root, "Skipping descendant row without reference type");
                    continue;
                };
                let parent = row.parent_reference.unwrap_or(root);
                builder.create_referred_semantic_id(reference_id, parent, reference_type)?;
                seen.insert(reference_id);
            }

            if let (Some(key_id), Some(key_type), Some(value)) =
                (row.key_id, row.key_type, row.key_value.as_ref())
            {
                builder.create_referred_semantic_id_key(
                    reference_id,
                    key_id,
                    key_type,
                    value.clone(),
                )?;
            }
        }

        let mut references = HashMap::with_capacity(builders.len());
        for (id, builder) in builders {
            references.insert(id, builder.build_nested_structure()?);
        }

        debug!(
            requested = ids.len(),
            found = references.len(),
            root_rows = root_rows.len(),
            descendant_rows = descendant_rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hydrated reference batch"
        );

        Ok(references)
    }
}
