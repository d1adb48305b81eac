// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Descriptor Assembler
//!
//! Assembles AAS descriptors, with their submodel descriptors, from bulk
//! per-concern fetches. Submodel descriptors can also be listed, fetched and
//! checked for existence per AAS on their own.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Fan out sub-fetches, hydrate references, fan in
//! - **Collaborators:**
//!   - Domain: `AssetAdministrationShellDescriptor`, `DescriptorRowSource`
//!   - Application: `ReferenceBatchFetcher`
//!   - Infrastructure: lang-string and administration builders
//!
//! # Request shape
//!
//! For a page of `n` descriptors the assembler issues a fixed number of
//! queries: one page query, seven concurrent bulk fetches keyed by the page's
//! descriptor ids, five more keyed by the submodel descriptor ids, and the
//! two reference queries. `tokio::try_join!` fails the whole request on the
//! first error and drops the sibling futures; no partially assembled
//! descriptor is ever returned.
//!
//! Submodel-only reads skip the AAS-level fan-out: one page or point query,
//! the five shared fetches, and the two reference queries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::domain::config::HydrationConfig;
use crate::domain::data_specification::AdministrativeInformation;
use crate::domain::data_type::DataTypeDefXsd;
use crate::domain::descriptor::{
    AssetAdministrationShellDescriptor, AssetKind, DescriptorPage, DescriptorPageQuery, Endpoint,
    ProtocolInformation, SecurityAttribute, SecurityTypeEnum, SpecificAssetId, SubmodelDescriptor,
    SubmodelDescriptorPage,
};
use crate::domain::extension::Extension;
use crate::domain::lang_string::{LangStringKind, LangStringNameType, LangStringTextType};
use crate::domain::reference::Reference;
use crate::domain::repository::{DescriptorRowSource, ReferenceRowSource, RepositoryError};
use crate::domain::rows::{
    AasDescriptorRow, DescriptorAdministrationRow, DescriptorExtensionRow, EndpointRow,
    LangStringRow, SpecificAssetIdRow, SubmodelDescriptorRow,
};
use crate::application::reference_batch::ReferenceBatchFetcher;
use crate::infrastructure::builders::administration::build_administration;
use crate::infrastructure::builders::lang_string::group_lang_string_rows;
use crate::infrastructure::builders::{non_empty, push_distinct, sort_by_position};

/// Child rows every descriptor kind carries.
#[derive(Debug, Default)]
struct SharedRows {
    endpoints: Vec<EndpointRow>,
    extensions: Vec<DescriptorExtensionRow>,
    administration: Vec<DescriptorAdministrationRow>,
    display_names: Vec<LangStringRow>,
    descriptions: Vec<LangStringRow>,
}

impl SharedRows {
    fn reference_ids(&self, ids: &mut Vec<i64>) {
        for row in &self.extensions {
            push_distinct(ids, row.semantic_id.into_iter().collect());
            push_distinct(ids, row.supplemental_semantic_ids.clone());
            push_distinct(ids, row.refers_to.clone());
        }
        for row in &self.administration {
            push_distinct(ids, row.creator.into_iter().collect());
        }
    }
}

/// Shared children grouped by owning descriptor id. Every requested id has
/// an entry in each map.
struct SharedChildren {
    endpoints: HashMap<i64, Vec<Endpoint>>,
    extensions: HashMap<i64, Vec<Extension>>,
    administration: HashMap<i64, AdministrativeInformation>,
    display_names: HashMap<i64, Vec<LangStringNameType>>,
    descriptions: HashMap<i64, Vec<LangStringTextType>>,
}

impl SharedChildren {
    fn build(
        ids: &[i64],
        rows: SharedRows,
        references: &HashMap<i64, Reference>,
    ) -> Result<Self, RepositoryError> {
        let mut administration = HashMap::with_capacity(rows.administration.len());
        for row in rows.administration {
            let descriptor_id = row.descriptor_id;
            let creator = row.creator.map(|id| lookup(references, id)).transpose()?;
            administration.insert(descriptor_id, build_administration(row, creator)?);
        }

        Ok(Self {
            endpoints: group_by_parent(ids, rows.endpoints, |r| r.descriptor_id, |r| {
                Ok((r.position, r.endpoint_id, build_endpoint(r)?))
            })?,
            extensions: group_by_parent(ids, rows.extensions, |r| r.descriptor_id, |r| {
                Ok((r.position, r.extension_id, build_extension(r, references)?))
            })?,
            administration,
            display_names: group_lang_string_rows(ids, rows.display_names),
            descriptions: group_lang_string_rows(ids, rows.descriptions),
        })
    }

    fn take(&mut self, id: i64) -> SharedFields {
        SharedFields {
            endpoints: self.endpoints.remove(&id).unwrap_or_default(),
            extensions: self.extensions.remove(&id).unwrap_or_default(),
            administration: self.administration.remove(&id),
            display_name: self.display_names.remove(&id).unwrap_or_default(),
            description: self.descriptions.remove(&id).unwrap_or_default(),
        }
    }
}

struct SharedFields {
    endpoints: Vec<Endpoint>,
    extensions: Vec<Extension>,
    administration: Option<AdministrativeInformation>,
    display_name: Vec<LangStringNameType>,
    description: Vec<LangStringTextType>,
}

pub struct DescriptorAssembler {
    descriptors: Arc<dyn DescriptorRowSource>,
    references: ReferenceBatchFetcher,
    hydration: HydrationConfig,
}

impl DescriptorAssembler {
    pub fn new(
        descriptors: Arc<dyn DescriptorRowSource>,
        references: Arc<dyn ReferenceRowSource>,
        hydration: HydrationConfig,
    ) -> Self {
        Self {
            descriptors,
            references: ReferenceBatchFetcher::new(references),
            hydration,
        }
    }

    /// Assemble one AAS descriptor by its identifier.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no descriptor has this identifier
    /// - any error of the underlying sub-fetches or builders
    pub async fn get_aas_descriptor(
        &self,
        id: &str,
    ) -> Result<AssetAdministrationShellDescriptor, RepositoryError> {
        let row = self
            .descriptors
            .fetch_aas_descriptor(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("AAS descriptor {id}")))?;

        self.assemble(vec![row]).await?.pop().ok_or_else(|| {
            RepositoryError::InternalFailure(format!("AAS descriptor {id} was not assembled"))
        })
    }

    /// Assemble one keyset page of AAS descriptors ordered by identifier.
    pub async fn list_aas_descriptors(
        &self,
        query: &DescriptorPageQuery,
    ) -> Result<DescriptorPage, RepositoryError> {
        let limit = self.hydration.effective_page_limit(query.limit);

        // One extra row tells whether another page follows.
        let mut rows = self
            .descriptors
            .fetch_aas_descriptor_page(query, limit.saturating_add(1))
            .await?;
        let next_cursor = split_next_cursor(&mut rows, limit, |peeked| peeked.id);

        let items = self.assemble(rows).await?;
        Ok(DescriptorPage { items, next_cursor })
    }

    /// Assemble one keyset page of the submodel descriptors of `aas_id`,
    /// ordered by submodel id. `limit == 0` selects the configured default;
    /// `cursor` is an inclusive lower bound on the submodel id. An unknown
    /// AAS yields an empty page.
    pub async fn list_submodel_descriptors(
        &self,
        aas_id: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<SubmodelDescriptorPage, RepositoryError> {
        let limit = self.hydration.effective_page_limit(limit);

        let mut rows = self
            .descriptors
            .fetch_submodel_descriptor_page(aas_id, cursor, limit.saturating_add(1))
            .await?;
        let next_cursor = split_next_cursor(&mut rows, limit, |peeked| peeked.id);

        let items = self.assemble_submodels(rows).await?;
        Ok(SubmodelDescriptorPage { items, next_cursor })
    }

    /// Assemble the submodel descriptor `submodel_id` of `aas_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the AAS does not exist or has no such submodel
    pub async fn get_submodel_descriptor(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> Result<SubmodelDescriptor, RepositoryError> {
        let row = self
            .descriptors
            .fetch_submodel_descriptor(aas_id, submodel_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "submodel descriptor {submodel_id} of AAS {aas_id}"
                ))
            })?;

        self.assemble_submodels(vec![row]).await?.pop().ok_or_else(|| {
            RepositoryError::InternalFailure(format!(
                "submodel descriptor {submodel_id} was not assembled"
            ))
        })
    }

    /// Whether an AAS descriptor with this identifier exists. Nothing is
    /// hydrated.
    pub async fn aas_descriptor_exists(&self, aas_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.descriptors.fetch_aas_descriptor(aas_id).await?.is_some())
    }

    /// Whether `aas_id` owns a submodel descriptor `submodel_id`. Nothing is
    /// hydrated.
    pub async fn submodel_descriptor_exists(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .descriptors
            .fetch_submodel_descriptor(aas_id, submodel_id)
            .await?
            .is_some())
    }

    async fn assemble(
        &self,
        rows: Vec<AasDescriptorRow>,
    ) -> Result<Vec<AssetAdministrationShellDescriptor>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let ids: Vec<i64> = rows.iter().map(|r| r.descriptor_id).collect();

        let (shared_rows, specific_asset_id_rows, submodel_rows) = tokio::try_join!(
            self.fetch_shared(&ids),
            self.descriptors.fetch_specific_asset_ids(&ids),
            self.descriptors.fetch_submodel_descriptors(&ids),
        )?;

        let submodel_ids: Vec<i64> = submodel_rows.iter().map(|r| r.descriptor_id).collect();
        let submodel_shared_rows = self.fetch_shared(&submodel_ids).await?;

        let mut reference_ids = Vec::new();
        shared_rows.reference_ids(&mut reference_ids);
        submodel_shared_rows.reference_ids(&mut reference_ids);
        for row in &specific_asset_id_rows {
            push_distinct(&mut reference_ids, row.semantic_id.into_iter().collect());
            push_distinct(&mut reference_ids, row.external_subject_ref.into_iter().collect());
            push_distinct(&mut reference_ids, row.supplemental_semantic_ids.clone());
        }
        submodel_reference_ids(&submodel_rows, &mut reference_ids);
        let references = self.references.build_references_batch(&reference_ids).await?;

        let mut shared = SharedChildren::build(&ids, shared_rows, &references)?;
        let mut submodel_shared =
            SharedChildren::build(&submodel_ids, submodel_shared_rows, &references)?;

        let mut specific_asset_ids = group_by_parent(
            &ids,
            specific_asset_id_rows,
            |r| r.descriptor_id,
            |r| {
                let (position, row_id) = (r.position, r.specific_asset_id_id);
                Ok((position, row_id, build_specific_asset_id(r, &references)?))
            },
        )?;
        let mut submodel_descriptors = group_by_parent(
            &ids,
            submodel_rows,
            |r| r.aas_descriptor_id,
            |r| {
                let fields = submodel_shared.take(r.descriptor_id);
                let (position, descriptor_id) = (r.position, r.descriptor_id);
                let descriptor = build_submodel_descriptor(r, fields, &references)?;
                Ok((position, descriptor_id, descriptor))
            },
        )?;

        let descriptor_count = rows.len();
        let mut assembled = Vec::with_capacity(descriptor_count);
        for row in rows {
            let fields = shared.take(row.descriptor_id);
            let asset_kind = row
                .asset_kind
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(str::parse::<AssetKind>)
                .transpose()
                .map_err(|e| e.context(format!("AAS descriptor {}", row.id)))?;

            assembled.push(AssetAdministrationShellDescriptor {
                description: fields.description,
                display_name: fields.display_name,
                extensions: fields.extensions,
                administration: fields.administration,
                asset_kind,
                asset_type: non_empty(row.asset_type),
                endpoints: fields.endpoints,
                global_asset_id: non_empty(row.global_asset_id),
                id_short: non_empty(row.id_short),
                specific_asset_ids: specific_asset_ids
                    .remove(&row.descriptor_id)
                    .unwrap_or_default(),
                submodel_descriptors: submodel_descriptors
                    .remove(&row.descriptor_id)
                    .unwrap_or_default(),
                id: row.id,
            });
        }

        debug!(
            descriptors = descriptor_count,
            submodel_descriptors = submodel_ids.len(),
            references = references.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assembled AAS descriptors"
        );

        Ok(assembled)
    }

    /// Hydrate submodel descriptor rows, keeping their order.
    async fn assemble_submodels(
        &self,
        rows: Vec<SubmodelDescriptorRow>,
    ) -> Result<Vec<SubmodelDescriptor>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let ids: Vec<i64> = rows.iter().map(|r| r.descriptor_id).collect();

        let shared_rows = self.fetch_shared(&ids).await?;
        let mut reference_ids = Vec::new();
        shared_rows.reference_ids(&mut reference_ids);
        submodel_reference_ids(&rows, &mut reference_ids);
        let references = self.references.build_references_batch(&reference_ids).await?;

        let mut shared = SharedChildren::build(&ids, shared_rows, &references)?;
        let submodels = rows
            .into_iter()
            .map(|row| {
                let fields = shared.take(row.descriptor_id);
                build_submodel_descriptor(row, fields, &references)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            submodel_descriptors = submodels.len(),
            references = references.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assembled submodel descriptors"
        );

        Ok(submodels)
    }

    async fn fetch_shared(&self, ids: &[i64]) -> Result<SharedRows, RepositoryError> {
        if ids.is_empty() {
            return Ok(SharedRows::default());
        }
        let (endpoints, extensions, administration, display_names, descriptions) = tokio::try_join!(
            self.descriptors.fetch_endpoints(ids),
            self.descriptors.fetch_extensions(ids),
            self.descriptors.fetch_administration(ids),
            self.descriptors.fetch_lang_strings(LangStringKind::DisplayName, ids),
            self.descriptors.fetch_lang_strings(LangStringKind::Description, ids),
        )?;
        Ok(SharedRows {
            endpoints,
            extensions,
            administration,
            display_names,
            descriptions,
        })
    }
}

fn lookup(references: &HashMap<i64, Reference>, id: i64) -> Result<Reference, RepositoryError> {
    references
        .get(&id)
        .cloned()
        .ok_or_else(|| RepositoryError::NotFound(format!("reference {id}")))
}

fn lookup_all(
    references: &HashMap<i64, Reference>,
    ids: &[i64],
) -> Result<Vec<Reference>, RepositoryError> {
    ids.iter().map(|id| lookup(references, *id)).collect()
}

fn submodel_reference_ids(rows: &[SubmodelDescriptorRow], ids: &mut Vec<i64>) {
    for row in rows {
        push_distinct(ids, row.semantic_id.into_iter().collect());
        push_distinct(ids, row.supplemental_semantic_ids.clone());
    }
}

/// Cut a page fetched with one row of lookahead down to `limit` and return
/// the key of the first row beyond it.
fn split_next_cursor<R>(
    rows: &mut Vec<R>,
    limit: usize,
    key: impl FnOnce(R) -> String,
) -> Option<String> {
    if rows.len() <= limit {
        return None;
    }
    rows.drain(limit..).next().map(key)
}

/// Group rows by parent, ordered by position then row id. Every id in
/// `parent_ids` gets an entry, empty when it owns no rows.
fn group_by_parent<R, T>(
    parent_ids: &[i64],
    rows: Vec<R>,
    parent: impl Fn(&R) -> i64,
    mut build: impl FnMut(R) -> Result<(i32, i64, T), RepositoryError>,
) -> Result<HashMap<i64, Vec<T>>, RepositoryError> {
    let mut pending: HashMap<i64, Vec<(i32, i64, T)>> =
        parent_ids.iter().map(|id| (*id, Vec::new())).collect();
    for row in rows {
        let owner = parent(&row);
        pending.entry(owner).or_default().push(build(row)?);
    }
    Ok(pending
        .into_iter()
        .map(|(owner, entries)| (owner, sort_by_position(entries)))
        .collect())
}

fn build_endpoint(row: EndpointRow) -> Result<Endpoint, RepositoryError> {
    let security_attributes = row
        .security_attributes
        .into_iter()
        .map(|a| {
            Ok(SecurityAttribute {
                security_type: a.security_type.parse::<SecurityTypeEnum>()?,
                key: a.security_key,
                value: a.security_value,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()
        .map_err(|e| e.context(format!("endpoint {}", row.endpoint_id)))?;

    Ok(Endpoint {
        interface: row.interface,
        protocol_information: ProtocolInformation {
            href: row.href,
            endpoint_protocol: non_empty(row.endpoint_protocol),
            endpoint_protocol_version: row.endpoint_protocol_versions,
            subprotocol: non_empty(row.sub_protocol),
            subprotocol_body: non_empty(row.sub_protocol_body),
            subprotocol_body_encoding: non_empty(row.sub_protocol_body_encoding),
            security_attributes,
        },
    })
}

fn build_extension(
    row: DescriptorExtensionRow,
    references: &HashMap<i64, Reference>,
) -> Result<Extension, RepositoryError> {
    let value_type = row
        .value_type
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::parse::<DataTypeDefXsd>)
        .transpose()
        .map_err(|e| e.context(format!("extension {}", row.extension_id)))?;

    Ok(Extension {
        name: row.name,
        value_type,
        value: non_empty(row.value),
        semantic_id: row.semantic_id.map(|id| lookup(references, id)).transpose()?,
        supplemental_semantic_ids: lookup_all(references, &row.supplemental_semantic_ids)?,
        refers_to: lookup_all(references, &row.refers_to)?,
    })
}

fn build_specific_asset_id(
    row: SpecificAssetIdRow,
    references: &HashMap<i64, Reference>,
) -> Result<SpecificAssetId, RepositoryError> {
    Ok(SpecificAssetId {
        name: row.name,
        value: row.value,
        semantic_id: row.semantic_id.map(|id| lookup(references, id)).transpose()?,
        supplemental_semantic_ids: lookup_all(references, &row.supplemental_semantic_ids)?,
        external_subject_id: row
            .external_subject_ref
            .map(|id| lookup(references, id))
            .transpose()?,
    })
}

fn build_submodel_descriptor(
    row: SubmodelDescriptorRow,
    fields: SharedFields,
    references: &HashMap<i64, Reference>,
) -> Result<SubmodelDescriptor, RepositoryError> {
    Ok(SubmodelDescriptor {
        description: fields.description,
        display_name: fields.display_name,
        extensions: fields.extensions,
        administration: fields.administration,
        id_short: non_empty(row.id_short),
        id: row.id,
        semantic_id: row.semantic_id.map(|id| lookup(references, id)).transpose()?,
        supplemental_semantic_id: lookup_all(references, &row.supplemental_semantic_ids)?,
        endpoints: fields.endpoints,
    })
}
