// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL AAS Repository
//!
//! Production row source backed by the registry and submodel schema via
//! `sqlx`. Every bulk read binds the full id set as one `BIGINT[]`
//! parameter (`= ANY($1)`), so a request costs one round trip per concern.
//!
//! Enum-valued columns (`reference.type`, `reference_key.type`) are stored
//! as their canonical names and parsed here. Child aggregates that the
//! builders decode themselves (security attributes, embedded data
//! specifications, submodel-element payloads) arrive as `jsonb`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::descriptor::DescriptorPageQuery;
use crate::domain::lang_string::LangStringKind;
use crate::domain::reference::{KeyTypes, ReferenceTypes};
use crate::domain::repository::{
    DescriptorRowSource, ReferenceRowSource, RepositoryError, SubmodelElementRowSource,
};
use crate::domain::rows::{
    AasDescriptorRow, DescriptorAdministrationRow, DescriptorExtensionRow, EndpointRow,
    LangStringRow, ReferenceRow, ReferredReferenceRow, SecurityAttributeRow, SpecificAssetIdRow,
    SubmodelDescriptorRow, SubmodelElementRow,
};

pub struct PostgresAasRepository {
    pool: PgPool,
}

impl PostgresAasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_key_type(raw: Option<String>) -> Result<Option<KeyTypes>, RepositoryError> {
    raw.map(|t| t.parse()).transpose()
}

fn aas_descriptor_row(row: &PgRow) -> Result<AasDescriptorRow, RepositoryError> {
    Ok(AasDescriptorRow {
        descriptor_id: row.try_get("descriptor_id")?,
        id: row.try_get("id")?,
        id_short: row.try_get("id_short")?,
        asset_kind: row.try_get("asset_kind")?,
        asset_type: row.try_get("asset_type")?,
        global_asset_id: row.try_get("global_asset_id")?,
    })
}

fn submodel_descriptor_row(row: &PgRow) -> Result<SubmodelDescriptorRow, RepositoryError> {
    Ok(SubmodelDescriptorRow {
        aas_descriptor_id: row.try_get("aas_descriptor_id")?,
        descriptor_id: row.try_get("descriptor_id")?,
        position: row.try_get("position")?,
        id: row.try_get("id")?,
        id_short: row.try_get("id_short")?,
        semantic_id: row.try_get("semantic_id")?,
        supplemental_semantic_ids: row.try_get("supplemental_semantic_ids")?,
    })
}

fn page_limit(limit: usize) -> Result<i64, RepositoryError> {
    i64::try_from(limit).map_err(|_| {
        RepositoryError::InvariantViolation(format!("page limit {limit} out of range"))
    })
}

#[async_trait]
impl ReferenceRowSource for PostgresAasRepository {
    async fn fetch_root_rows(&self, ids: &[i64]) -> Result<Vec<ReferenceRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.type, rk.id AS key_id, rk.type AS key_type, rk.value AS key_value
            FROM reference r
            LEFT JOIN reference_key rk ON rk.reference_id = r.id
            WHERE r.id = ANY($1)
            ORDER BY r.id, rk.id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load reference roots"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let reference_type: String = row.try_get("type")?;
            out.push(ReferenceRow {
                reference_id: row.try_get("id")?,
                reference_type: reference_type.parse()?,
                key_id: row.try_get("key_id")?,
                key_type: parse_key_type(row.try_get("key_type")?)?,
                key_value: row.try_get("key_value")?,
            });
        }
        Ok(out)
    }

    async fn fetch_descendant_rows(
        &self,
        root_ids: &[i64],
    ) -> Result<Vec<ReferredReferenceRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT ref.id, ref.type, ref.parentreference, ref.rootreference,
                   rk.id AS key_id, rk.type AS key_type, rk.value AS key_value
            FROM reference ref
            LEFT JOIN reference_key rk ON rk.reference_id = ref.id
            WHERE ref.rootreference = ANY($1)
              AND ref.id <> ref.rootreference
            ORDER BY ref.rootreference, ref.parentreference, ref.id, rk.id
            "#,
        )
        .bind(root_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load reference descendants"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let reference_type: Option<String> = row.try_get("type")?;
            out.push(ReferredReferenceRow {
                reference_id: row.try_get("id")?,
                reference_type: reference_type
                    .map(|t| t.parse::<ReferenceTypes>())
                    .transpose()?,
                parent_reference: row.try_get("parentreference")?,
                root_reference: row.try_get("rootreference")?,
                key_id: row.try_get("key_id")?,
                key_type: parse_key_type(row.try_get("key_type")?)?,
                key_value: row.try_get("key_value")?,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl DescriptorRowSource for PostgresAasRepository {
    async fn fetch_aas_descriptor(
        &self,
        id: &str,
    ) -> Result<Option<AasDescriptorRow>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT a.descriptor_id, a.id, a.id_short, a.asset_kind, a.asset_type,
                   a.global_asset_id
            FROM aas_descriptor a
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(aas_descriptor_row).transpose()
    }

    async fn fetch_aas_descriptor_page(
        &self,
        query: &DescriptorPageQuery,
        limit: usize,
    ) -> Result<Vec<AasDescriptorRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT a.descriptor_id, a.id, a.id_short, a.asset_kind, a.asset_type,
                   a.global_asset_id
            FROM aas_descriptor a
            WHERE ($1::text IS NULL OR a.id >= $1)
              AND ($2::text IS NULL OR a.asset_kind = $2)
              AND ($3::text IS NULL OR a.asset_type = $3)
            ORDER BY a.id
            LIMIT $4
            "#,
        )
        .bind(query.cursor.as_deref())
        .bind(query.asset_kind.map(|k| k.as_str()))
        .bind(query.asset_type.as_deref())
        .bind(page_limit(limit)?)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(aas_descriptor_row).collect()
    }

    async fn fetch_endpoints(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<EndpointRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT e.descriptor_id, e.id AS endpoint_id, e.position, e.interface, e.href,
                   e.endpoint_protocol, e.sub_protocol, e.sub_protocol_body,
                   e.sub_protocol_body_encoding,
                   ARRAY(
                       SELECT v.endpoint_protocol_version
                       FROM endpoint_protocol_version v
                       WHERE v.endpoint_id = e.id
                       ORDER BY v.id
                   ) AS endpoint_protocol_versions,
                   COALESCE((
                       SELECT jsonb_agg(jsonb_build_object(
                           'security_type', s.security_type,
                           'security_key', s.security_key,
                           'security_value', s.security_value
                       ) ORDER BY s.id)
                       FROM security_attributes s
                       WHERE s.endpoint_id = e.id
                   ), '[]'::jsonb) AS security_attributes
            FROM aas_descriptor_endpoint e
            WHERE e.descriptor_id = ANY($1)
            ORDER BY e.descriptor_id, e.position, e.id
            "#,
        )
        .bind(descriptor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load endpoints"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let security: serde_json::Value = row.try_get("security_attributes")?;
            let security_attributes: Vec<SecurityAttributeRow> =
                serde_json::from_value(security)?;
            out.push(EndpointRow {
                descriptor_id: row.try_get("descriptor_id")?,
                endpoint_id: row.try_get("endpoint_id")?,
                position: row.try_get("position")?,
                interface: row.try_get("interface")?,
                href: row.try_get("href")?,
                endpoint_protocol: row.try_get("endpoint_protocol")?,
                endpoint_protocol_versions: row.try_get("endpoint_protocol_versions")?,
                sub_protocol: row.try_get("sub_protocol")?,
                sub_protocol_body: row.try_get("sub_protocol_body")?,
                sub_protocol_body_encoding: row.try_get("sub_protocol_body_encoding")?,
                security_attributes,
            });
        }
        Ok(out)
    }

    async fn fetch_specific_asset_ids(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<SpecificAssetIdRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT sai.descriptor_id, sai.id, sai.position, sai.name, sai.value,
                   sai.semantic_id, sai.external_subject_ref,
                   ARRAY(
                       SELECT x.reference_id
                       FROM specific_asset_id_supplemental_semantic_id x
                       WHERE x.specific_asset_id_id = sai.id
                       ORDER BY x.id
                   ) AS supplemental_semantic_ids
            FROM specific_asset_id sai
            WHERE sai.descriptor_id = ANY($1)
            ORDER BY sai.descriptor_id, sai.position, sai.id
            "#,
        )
        .bind(descriptor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load specific asset ids"))?;

        rows.iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(SpecificAssetIdRow {
                    descriptor_id: row.try_get("descriptor_id")?,
                    specific_asset_id_id: row.try_get("id")?,
                    position: row.try_get("position")?,
                    name: row.try_get("name")?,
                    value: row.try_get("value")?,
                    semantic_id: row.try_get("semantic_id")?,
                    external_subject_ref: row.try_get("external_subject_ref")?,
                    supplemental_semantic_ids: row.try_get("supplemental_semantic_ids")?,
                })
            })
            .collect()
    }

    async fn fetch_extensions(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorExtensionRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT de.descriptor_id, x.id AS extension_id, x.position, x.name, x.value_type,
                   COALESCE(x.value_text, x.value_num::text, x.value_bool::text,
                            x.value_time::text, x.value_datetime::text) AS value,
                   x.semantic_id,
                   ARRAY(
                       SELECT s.reference_id
                       FROM extension_supplemental_semantic_id s
                       WHERE s.extension_id = x.id
                       ORDER BY s.id
                   ) AS supplemental_semantic_ids,
                   ARRAY(
                       SELECT r.reference_id
                       FROM extension_refers_to r
                       WHERE r.extension_id = x.id
                       ORDER BY r.id
                   ) AS refers_to
            FROM descriptor_extension de
            JOIN extension x ON x.id = de.extension_id
            WHERE de.descriptor_id = ANY($1)
            ORDER BY de.descriptor_id, x.position, x.id
            "#,
        )
        .bind(descriptor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load extensions"))?;

        rows.iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(DescriptorExtensionRow {
                    descriptor_id: row.try_get("descriptor_id")?,
                    extension_id: row.try_get("extension_id")?,
                    position: row.try_get("position")?,
                    name: row.try_get("name")?,
                    value_type: row.try_get("value_type")?,
                    value: row.try_get("value")?,
                    semantic_id: row.try_get("semantic_id")?,
                    supplemental_semantic_ids: row.try_get("supplemental_semantic_ids")?,
                    refers_to: row.try_get("refers_to")?,
                })
            })
            .collect()
    }

    async fn fetch_submodel_descriptors(
        &self,
        aas_descriptor_ids: &[i64],
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT smd.aas_descriptor_id, smd.descriptor_id, smd.position, smd.id,
                   smd.id_short, smd.semantic_id,
                   ARRAY(
                       SELECT s.reference_id
                       FROM submodel_descriptor_supplemental_semantic_id s
                       WHERE s.descriptor_id = smd.descriptor_id
                       ORDER BY s.id
                   ) AS supplemental_semantic_ids
            FROM submodel_descriptor smd
            WHERE smd.aas_descriptor_id = ANY($1)
            ORDER BY smd.aas_descriptor_id, smd.position, smd.descriptor_id
            "#,
        )
        .bind(aas_descriptor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load submodel descriptors"))?;

        rows.iter().map(submodel_descriptor_row).collect()
    }

    async fn fetch_submodel_descriptor_page(
        &self,
        aas_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SubmodelDescriptorRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT smd.aas_descriptor_id, smd.descriptor_id, smd.position, smd.id,
                   smd.id_short, smd.semantic_id,
                   ARRAY(
                       SELECT s.reference_id
                       FROM submodel_descriptor_supplemental_semantic_id s
                       WHERE s.descriptor_id = smd.descriptor_id
                       ORDER BY s.id
                   ) AS supplemental_semantic_ids
            FROM submodel_descriptor smd
            JOIN aas_descriptor a ON a.descriptor_id = smd.aas_descriptor_id
            WHERE a.id = $1
              AND ($2::text IS NULL OR smd.id >= $2)
            ORDER BY smd.id
            LIMIT $3
            "#,
        )
        .bind(aas_id)
        .bind(cursor)
        .bind(page_limit(limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context(format!("list submodels of {aas_id}")))?;

        rows.iter().map(submodel_descriptor_row).collect()
    }

    async fn fetch_submodel_descriptor(
        &self,
        aas_id: &str,
        submodel_id: &str,
    ) -> Result<Option<SubmodelDescriptorRow>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT smd.aas_descriptor_id, smd.descriptor_id, smd.position, smd.id,
                   smd.id_short, smd.semantic_id,
                   ARRAY(
                       SELECT s.reference_id
                       FROM submodel_descriptor_supplemental_semantic_id s
                       WHERE s.descriptor_id = smd.descriptor_id
                       ORDER BY s.id
                   ) AS supplemental_semantic_ids
            FROM submodel_descriptor smd
            JOIN aas_descriptor a ON a.descriptor_id = smd.aas_descriptor_id
            WHERE a.id = $1 AND smd.id = $2
            "#,
        )
        .bind(aas_id)
        .bind(submodel_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(submodel_descriptor_row).transpose()
    }

    async fn fetch_administration(
        &self,
        descriptor_ids: &[i64],
    ) -> Result<Vec<DescriptorAdministrationRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT d.id AS descriptor_id, ai.version, ai.revision, ai.templateid,
                   ai.creator, ai.embedded_data_specifications
            FROM descriptor d
            JOIN administrative_information ai ON ai.id = d.administrative_information_id
            WHERE d.id = ANY($1)
            ORDER BY d.id
            "#,
        )
        .bind(descriptor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).context("load administration"))?;

        rows.iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(DescriptorAdministrationRow {
                    descriptor_id: row.try_get("descriptor_id")?,
                    version: row.try_get("version")?,
                    revision: row.try_get("revision")?,
                    template_id: row.try_get("templateid")?,
                    creator: row.try_get("creator")?,
                    embedded_data_specifications: row.try_get("embedded_data_specifications")?,
                })
            })
            .collect()
    }

    async fn fetch_lang_strings(
        &self,
        kind: LangStringKind,
        descriptor_ids: &[i64],
    ) -> Result<Vec<LangStringRow>, RepositoryError> {
        let sql = match kind {
            LangStringKind::Description => {
                r#"
                SELECT d.id AS descriptor_id, l.id AS row_id, l.language, l.text
                FROM descriptor d
                JOIN lang_string_text_type l
                  ON l.lang_string_text_type_reference_id = d.description_id
                WHERE d.id = ANY($1)
                ORDER BY d.id, l.id
                "#
            }
            LangStringKind::DisplayName => {
                r#"
                SELECT d.id AS descriptor_id, l.id AS row_id, l.language, l.text
                FROM descriptor d
                JOIN lang_string_name_type l
                  ON l.lang_string_name_type_reference_id = d.displayname_id
                WHERE d.id = ANY($1)
                ORDER BY d.id, l.id
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(descriptor_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from(e).context(format!("load {kind:?} strings"))
            })?;

        rows.iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(LangStringRow {
                    descriptor_id: row.try_get("descriptor_id")?,
                    row_id: row.try_get("row_id")?,
                    language: row.try_get("language")?,
                    text: row.try_get("text")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SubmodelElementRowSource for PostgresAasRepository {
    async fn fetch_submodel_element_rows(
        &self,
        submodel_id: &str,
    ) -> Result<Vec<SubmodelElementRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT sme.id, sme.parent_sme_id, sme.root_sme_id, sme.id_short, sme.idshort_path,
                   sme.category, sme.model_type, sme.position,
                   p.value, p.semantic_id, p.semantic_id_referred, p.descriptions,
                   p.display_names, p.supplemental_semantic_ids,
                   p.supplemental_semantic_ids_referred, p.qualifiers, p.extensions,
                   p.embedded_data_specifications
            FROM submodel_element sme
            JOIN submodel s ON s.id = sme.submodel_id
            LEFT JOIN submodel_element_payload p ON p.submodel_element_id = sme.id
            WHERE s.submodel_identifier = $1
            ORDER BY sme.parent_sme_id NULLS FIRST, sme.position, sme.id
            "#,
        )
        .bind(submodel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from(e).context(format!("load elements of submodel {submodel_id}"))
        })?;

        rows.iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(SubmodelElementRow {
                    db_id: row.try_get("id")?,
                    parent_id: row.try_get("parent_sme_id")?,
                    root_id: row.try_get("root_sme_id")?,
                    id_short: row.try_get("id_short")?,
                    id_short_path: row.try_get("idshort_path")?,
                    category: row.try_get("category")?,
                    model_type: row.try_get("model_type")?,
                    position: row.try_get("position")?,
                    value: row.try_get("value")?,
                    semantic_id: row.try_get("semantic_id")?,
                    semantic_id_referred: row.try_get("semantic_id_referred")?,
                    descriptions: row.try_get("descriptions")?,
                    display_names: row.try_get("display_names")?,
                    supplemental_semantic_ids: row.try_get("supplemental_semantic_ids")?,
                    supplemental_semantic_ids_referred: row
                        .try_get("supplemental_semantic_ids_referred")?,
                    qualifiers: row.try_get("qualifiers")?,
                    extensions: row.try_get("extensions")?,
                    embedded_data_specifications: row.try_get("embedded_data_specifications")?,
                })
            })
            .collect()
    }
}
