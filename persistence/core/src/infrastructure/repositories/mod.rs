// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure adapters for the row-source ports defined in
//! `domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Serve flat rows to the hydration engine
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//!
//! - **PostgresAasRepository** - bulk `= ANY($1)` queries against the
//!   registry and submodel schema
//!
//! ## In-Memory
//!
//! - **InMemoryAasRepository** - lock-guarded tables for tests and
//!   development. Rows come back in the same order the PostgreSQL queries
//!   produce.
//!
//! # Usage
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use aas_persistence_core::application::ReferenceBatchFetcher;
//! use aas_persistence_core::infrastructure::db::Database;
//! use aas_persistence_core::infrastructure::repositories::PostgresAasRepository;
//! use aas_persistence_core::domain::config::PersistenceConfig;
//!
//! let config = PersistenceConfig::load_or_default(None)?;
//! let db = Database::connect(&config.database).await?;
//! let repo = Arc::new(PostgresAasRepository::new(db.get_pool().clone()));
//!
//! let references = ReferenceBatchFetcher::new(repo)
//!     .build_references_batch(&[100, 200])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! 1. **Set-keyed reads**: one query per concern per request
//! 2. **Stable ordering**: every fetch states and honors its row order
//! 3. **Error Mapping**: infrastructure errors mapped to `RepositoryError`

pub mod postgres;

pub use postgres::PostgresAasRepository;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::descriptor::DescriptorPageQuery;
use crate::domain::lang_string::LangStringKind;
use crate::domain::reference::{KeyTypes, ReferenceTypes};
use crate::domain::repository::{
    DescriptorRowSource, ReferenceRowSource, RepositoryError, SubmodelElementRowSource,
};
use crate::domain::rows::{
    AasDescriptorRow, DescriptorAdministrationRow, DescriptorExtensionRow, EndpointRow,
    LangStringRow, ReferenceRow, ReferredReferenceRow, SpecificAssetIdRow, SubmodelDescriptorRow,
    SubmodelElementRow,
};

#[derive(Debug, Clone)]
struct StoredReference {
    reference_type: ReferenceTypes,
    parent: Option<i64>,
    root: Option<i64>,
    keys: Vec<(i64, KeyTypes, String)>,
}

#[derive(Debug, Default)]
struct Tables {
    references: BTreeMap<i64, StoredReference>,
    aas_descriptors: BTreeMap<String, AasDescriptorRow>,
    endpoints: Vec<EndpointRow>,
    specific_asset_ids: Vec<SpecificAssetIdRow>,
    extensions: Vec<DescriptorExtensionRow>,
    submodel_descriptors: Vec<SubmodelDescriptorRow>,
    administration: Vec<DescriptorAdministrationRow>,
    lang_strings: HashMap<LangStringKind, Vec<LangStringRow>>,
    submodel_elements: HashMap<String, Vec<SubmodelElementRow>>,
}

/// Table-backed row source for tests and local development.
#[derive(Clone, Default)]
pub struct InMemoryAasRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryAasRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a root reference with its `(key id, type, value)` keys.
    pub fn insert_reference(
        &self,
        id: i64,
        reference_type: ReferenceTypes,
        keys: &[(i64, KeyTypes, &str)],
    ) {
        self.store_reference(id, reference_type, None, Some(id), keys);
    }

    /// Store a descendant that hangs below `parent` in the chain of `root`.
    pub fn insert_referred_reference(
        &self,
        id: i64,
        reference_type: ReferenceTypes,
        parent: i64,
        root: i64,
        keys: &[(i64, KeyTypes, &str)],
    ) {
        self.store_reference(id, reference_type, Some(parent), Some(root), keys);
    }

    fn store_reference(
        &self,
        id: i64,
        reference_type: ReferenceTypes,
        parent: Option<i64>,
        root: Option<i64>,
        keys: &[(i64, KeyTypes, &str)],
    ) {
        let mut keys: Vec<_> = keys
            .iter()
            .map(|(key_id, key_type, value)| (*key_id, *key_type, value.to_string()))
            .collect();
        keys.sort_by_key(|(key_id, _, _)| *key_id);
        self.tables.write().references.insert(
            id,
            StoredReference {
                reference_type,
                parent,
                root,
                keys,
            },
        );
    }

    pub fn insert_aas_descriptor(&self, row: AasDescriptorRow) {
        self.tables.write().aas_descriptors.insert(row.id.clone(), row);
    }

    pub fn insert_endpoint(&self, row: EndpointRow) {
        self.tables.write().endpoints.push(row);
    }

    pub fn insert_specific_asset_id(&self, row: SpecificAssetIdRow) {
        self.tables.write().specific_asset_ids.push(row);
    }

    pub fn insert_extension(&self, row: DescriptorExtensionRow) {
        self.tables.write().extensions.push(row);
    }

    pub fn insert_submodel_descriptor(&self, row: SubmodelDescriptorRow) {
        self.tables.write().submodel_descriptors.push(row);
    }

    pub fn insert_administration(&self, row: DescriptorAdministrationRow) {
        self.tables.write().administration.push(row);
    }

    pub fn insert_lang_string(&self, kind: LangStringKind, row: LangStringRow) {
        self.tables.write().lang_strings.entry(kind).or_default().push(row);
    }

    pub fn insert_submodel_element(&self, submodel_id: &str, row: SubmodelElementRow) {
        self.tables
            .write()
            .submodel_elements
            .entry(submodel_id.to_string())
            .or_default()
            .push(row);
    }
}

/// Rows owned by any of `ids`, ordered by owner, then by `order`.
fn select_by_owner<T: Clone, K: Ord>(
    rows: &[T],
    ids: &[i64],
    owner: impl Fn(&T) -> i64,
    order: impl Fn(&T) -> K,
) -> Vec<T> {
    let mut selected: Vec<T> = rows
        .iter()
        .filter(|r| ids.contains(&owner(r)))
        .cloned()
        .collect();
    selected.sort_by(|a, b| (owner(a), order(a)).cmp(&(owner(b), order(b))));
    selected
}

#[async_trait]
impl ReferenceRowSource for InMemoryAasRepository {
    async fn fetch_root_rows(&self, ids: &[i64]) -> Result<Vec<ReferenceRow>, RepositoryError> {
        let tables = self.tables.read();
        let mut rows = Vec::new();
        let selected = tables.references.iter().filter(|(id, _)| ids.contains(*id));
        for (id, stored) in selected {
            if stored.keys.is_empty() {
                rows.push(ReferenceRow::keyless(*id, stored.reference_type));
            }
            for (key_id, key_type, value) in &stored.keys {
                rows.push(ReferenceRow::with_key(
                    *id,
                    stored.reference_type,
                    *key_id,
                    *key_type,
                    value.clone(),
                ));
            }
        }
        Ok(rows)
    }

    async fn fetch_descendant_rows(
        &self,
        root_ids: &[i64],
    ) -> Result<Vec<ReferredReferenceRow>, RepositoryError> {
        let tables = self.tables.read();
        let mut descendants: Vec<(&i64, &StoredReference)> = tables
            .references
            .iter()
            .filter(|(id, stored)| {
                stored
                    .root
                    .is_some_and(|root| root != **id && root_ids.contains(&root))
            })
            .collect();
        descendants.sort_by_key(|(id, stored)| (stored.root, stored.parent, **id));

        let mut rows = Vec::new();
        for (id, stored) in descendants {
            let base = ReferredReferenceRow {
                reference_id: Some(*id),
                reference_type: Some(stored.reference_type),
                parent_reference: stored.parent,
                root_reference: stored.root,
                ..Default::default()
            };
            if stored.keys.is_empty() {
                rows.push(base.clone());
            }
            for (key_id, key_type, value) in &stored.keys {
                rows.push(base.clone().key(*key_id, *key_type, value.clone()));
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl DescriptorRowSource for InMemoryAasRepository {
    async fn fetch_aas_descriptor(
        &self,
        id: &str,
    ) -> Result<Option<AasDescriptorRow>, RepositoryError> {
        Ok(self.tables.read().aas_descriptors.get(id).cloned())
    }

    async fn fetch_aas_descriptor_page(
        &self,
        query: &DescriptorPageQuery,
        limit: usize,
    ) -> Result<Vec<AasDescriptorRow>, RepositoryError> {
        let tables = self.tables.read();
        let asset_kind = query.asset_kind.as_ref().map(|k| k.as_str());
        Ok(tables
            .aas_descriptors
            .values()
            .filter(|row| {
                query
                    .cursor
                    .as_deref()
                    .is_none_or(|cursor| row.id.as_str() >= cursor)
            })
            .filter(|row| {
                asset_kind.is_none_or(|kind| row.asset_kind.as_deref() == Some(kind))
            })
            .filter(|row| {
                query
                    .asset_type
                    .as_deref()
                    .is_none_or(|asset_type| row.asset_type.as_deref() == Some(asset_type))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_endpoints(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<EndpointRow>, RepositoryError> {
        let tables = self.tables.read();
        Ok(select_by_owner(
            &tables.endpoints,
            descriptor_ids,
            |r| r.descriptor_id,
            |r| (r.position, r.endpoint_id),
        ))
    }

    async fn fetch_specific_asset_ids(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<SpecificAssetIdRow>, RepositoryError> {
        let tables = self.tables.read();
        Ok(select_by_owner(
            &tables.specific_asset_ids,
            descriptor_ids,
            |r| r.descriptor_id,
            |r| (r.position, r.specific_asset_id_id),
        ))
    }

    async fn fetch_extensions(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorExtensionRow>, RepositoryError> {
        let tables = self.tables.read();
        Ok(select_by_owner(
            &tables.extensions,
            descriptor_ids,
            |r| r.descriptor_id,
            |r| (r.position, r.extension_id),
        ))
    }

    async fn fetch_submodel_descriptors(
        &self,
        aas_descriptor_ids: &[i64],
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError> {
        let tables = self.tables.read();
        Ok(select_by_owner(
            &tables.submodel_descriptors,
            aas_descriptor_ids,
            |r| r.aas_descriptor_id,
            |r| (r.position, r.descriptor_id),
        ))
    }

    async fn fetch_submodel_descriptor_page(
        &self,
        aas_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError> {
        let tables = self.tables.read();
        let Some(owner) = tables.aas_descriptors.get(aas_id).map(|r| r.descriptor_id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<SubmodelDescriptorRow> = tables
            .submodel_descriptors
            .iter()
            .filter(|r| r.aas_descriptor_id == owner)
            .filter(|r| cursor.is_none_or(|cursor| r.id.as_str() >= cursor))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_submodel_descriptor(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> Result<Option<SubmodelDescriptorRow>, RepositoryError> {
        let tables = self.tables.read();
        let Some(owner) = tables.aas_descriptors.get(aas_id).map(|r| r.descriptor_id) else {
            return Ok(None);
        };
        Ok(tables
            .submodel_descriptors
            .iter()
            .find(|r| r.aas_descriptor_id == owner && r.id == submodel_id)
            .cloned())
    }

    async fn fetch_administration(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorAdministrationRow>, RepositoryError> {
        let tables = self.tables.read();
        Ok(select_by_owner(
            &tables.administration,
            descriptor_ids,
            |r| r.descriptor_id,
            |_| (),
        ))
    }

    async fn fetch_lang_strings(
        &self,
        kind: LangStringKind,
        descriptor_ids: &[i64],
    ) -> Result<Vec<LangStringRow>, RepositoryError> {
        let tables = self.tables.read();
        let rows = tables
            .lang_strings
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(select_by_owner(rows, descriptor_ids, |r| r.descriptor_id, |r| r.row_id))
    }
}

#[async_trait]
impl SubmodelElementRowSource for InMemoryAasRepository {
    async fn fetch_submodel_element_rows(
        &self,
        submodel_id: &str,
    ) -> Result<Vec<SubmodelElementRow>, RepositoryError> {
        let tables = self.tables.read();
        let mut rows = tables
            .submodel_elements
            .get(submodel_id)
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|r| (r.parent_id, r.position, r.db_id));
        Ok(rows)
    }
}
