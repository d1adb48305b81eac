// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Row-source contracts consumed by the hydration engine. Each trait exposes
//! only bulk, set-keyed reads: every method takes the full set of parent ids
//! for one request so the engine issues a constant number of round trips
//! regardless of how many aggregates it assembles.
//!
//! | Trait | Rows |
//! |-------|------|
//! | `ReferenceRowSource` | reference roots and descendants |
//! | `DescriptorRowSource` | AAS/submodel descriptors and their children |
//! | `SubmodelElementRowSource` | submodel-element rows |
//!
//! Each is implemented by `InMemoryAasRepository` and `PostgresAasRepository`.
//!
//! Rows are returned in the order stated on each method. Builders rely on it.

use async_trait::async_trait;

use crate::domain::descriptor::DescriptorPageQuery;
use crate::domain::lang_string::LangStringKind;
use crate::domain::rows::{
    AasDescriptorRow, DescriptorAdministrationRow, DescriptorExtensionRow, EndpointRow,
    LangStringRow, ReferenceRow, ReferredReferenceRow, SpecificAssetIdRow, SubmodelDescriptorRow,
    SubmodelElementRow,
};

/// Source of flattened reference rows.
#[async_trait]
pub trait ReferenceRowSource: Send + Sync {
    /// Root references with their keys, one row per key (keyless roots yield
    /// one row without key fields). Ordered by reference id, then key id.
    async fn fetch_root_rows(&self, ids: &[i64]) -> Result<Vec<ReferenceRow>, RepositoryError>;

    /// Every descendant of every given root, one row per key. Ordered by
    /// root, parent, then id ascending.
    async fn fetch_descendant_rows(
        &self,
        root_ids: &[i64],
    ) -> Result<Vec<ReferredReferenceRow>, RepositoryError>;
}

/// Source of registry descriptor rows.
#[async_trait]
pub trait DescriptorRowSource: Send + Sync {
    /// Find one AAS descriptor by its AAS identifier
    async fn fetch_aas_descriptor(
        &self,
        id: &str,
    ) -> Result<Option<AasDescriptorRow>, RepositoryError>;

    /// Up to `limit` descriptors with `id >= cursor`, ordered by id.
    async fn fetch_aas_descriptor_page(
        &self,
        query: &DescriptorPageQuery,
        limit: usize,
    ) -> Result<Vec<AasDescriptorRow>, RepositoryError>;

    /// Endpoints of the given descriptors, ordered by position.
    async fn fetch_endpoints(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<EndpointRow>, RepositoryError>;

    /// Specific asset ids of the given descriptors, ordered by position.
    async fn fetch_specific_asset_ids(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<SpecificAssetIdRow>, RepositoryError>;

    /// Extensions of the given descriptors, ordered by position.
    async fn fetch_extensions(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorExtensionRow>, RepositoryError>;

    /// Submodel descriptors owned by the given AAS descriptors, ordered by
    /// position.
    async fn fetch_submodel_descriptors(
        &self,
        aas_descriptor_ids: &[i64],
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError>;

    /// Submodel descriptors of the AAS descriptor whose AAS identifier is
    /// `aas_id`, with submodel id `>= cursor`, ordered by submodel id. At
    /// most `limit` rows; an unknown AAS yields none.
    async fn fetch_submodel_descriptor_page(
        &self,
        aas_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError>;

    /// Find one submodel descriptor by its submodel id under one AAS.
    async fn fetch_submodel_descriptor(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> Result<Option<SubmodelDescriptorRow>, RepositoryError>;

    /// Administrative information of the given descriptors (at most one each).
    async fn fetch_administration(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorAdministrationRow>, RepositoryError>;

    /// Description or display-name strings of the given descriptors.
    async fn fetch_lang_strings(
        &self,
        kind: LangStringKind,
        descriptor_ids: &[i64],
    ) -> Result<Vec<LangStringRow>, RepositoryError>;
}

/// Source of submodel-element rows.
#[async_trait]
pub trait SubmodelElementRowSource: Send + Sync {
    /// Every element of one submodel, any nesting depth.
    async fn fetch_submodel_element_rows(
        &self,
        submodel_id: &str,
    ) -> Result<Vec<SubmodelElementRow>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid model type: {0}")]
    InvalidModelType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Internal failure: {0}")]
    InternalFailure(String),
}

impl RepositoryError {
    /// Prefix the message with the entity it occurred in.
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        match self {
            RepositoryError::NotFound(m) => RepositoryError::NotFound(format!("{what}: {m}")),
            RepositoryError::InvalidModelType(m) => {
                RepositoryError::InvalidModelType(format!("{what}: {m}"))
            }
            RepositoryError::MalformedPayload(m) => {
                RepositoryError::MalformedPayload(format!("{what}: {m}"))
            }
            RepositoryError::InvariantViolation(m) => {
                RepositoryError::InvariantViolation(format!("{what}: {m}"))
            }
            RepositoryError::InternalFailure(m) => {
                RepositoryError::InternalFailure(format!("{what}: {m}"))
            }
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::InternalFailure(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::MalformedPayload(err.to_string())
    }
}
