// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Row Contracts
//!
//! Flat row shapes consumed by the hydration builders. JSON-aggregated rows
//! keep the field names written by the aggregate queries (`reference_id`,
//! `parentReference`, `semanticIdReferenceRows`, ...). Descriptor rows are
//! scanned column by column from bulk queries and carry raw reference row ids
//! that are hydrated in a second step.
//!
//! Row ids are transient construction identities. They never leak into the
//! hydrated aggregates.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::data_specification::LevelType;
use crate::domain::lang_string::{
    LangStringDefinitionTypeIec61360, LangStringPreferredNameTypeIec61360,
    LangStringShortNameTypeIec61360,
};
use crate::domain::reference::{KeyTypes, ReferenceTypes};

/// Treats an explicit JSON `null` like a missing array.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One key of one reference. A keyless reference yields a single row with
/// all key fields absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub reference_id: i64,
    pub reference_type: ReferenceTypes,
    #[serde(default)]
    pub key_id: Option<i64>,
    #[serde(default)]
    pub key_type: Option<KeyTypes>,
    #[serde(default)]
    pub key_value: Option<String>,
}

impl ReferenceRow {
    pub fn keyless(reference_id: i64, reference_type: ReferenceTypes) -> Self {
        Self {
            reference_id,
            reference_type,
            key_id: None,
            key_type: None,
            key_value: None,
        }
    }

    pub fn with_key(
        reference_id: i64,
        reference_type: ReferenceTypes,
        key_id: i64,
        key_type: KeyTypes,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            reference_id,
            reference_type,
            key_id: Some(key_id),
            key_type: Some(key_type),
            key_value: Some(key_value.into()),
        }
    }
}

/// One key of one descendant in a referred-semantic-id chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferredReferenceRow {
    #[serde(default)]
    pub reference_id: Option<i64>,
    #[serde(default)]
    pub reference_type: Option<ReferenceTypes>,
    #[serde(default, rename = "parentReference")]
    pub parent_reference: Option<i64>,
    #[serde(default, rename = "rootReference")]
    pub root_reference: Option<i64>,
    #[serde(default)]
    pub key_id: Option<i64>,
    #[serde(default)]
    pub key_type: Option<KeyTypes>,
    #[serde(default)]
    pub key_value: Option<String>,
}

impl ReferredReferenceRow {
    pub fn new(
        reference_id: i64,
        reference_type: ReferenceTypes,
        parent_reference: i64,
        root_reference: i64,
    ) -> Self {
        Self {
            reference_id: Some(reference_id),
            reference_type: Some(reference_type),
            parent_reference: Some(parent_reference),
            root_reference: Some(root_reference),
            ..Default::default()
        }
    }

    pub fn key(mut self, key_id: i64, key_type: KeyTypes, key_value: impl Into<String>) -> Self {
        self.key_id = Some(key_id);
        self.key_type = Some(key_type);
        self.key_value = Some(key_value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifierRow {
    #[serde(rename = "dbId")]
    pub db_id: i64,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(rename = "type")]
    pub qualifier_type: String,
    #[serde(default)]
    pub position: i32,
    pub value_type: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "semanticIdReferenceRows", deserialize_with = "null_as_empty")]
    pub semantic_id: Vec<ReferenceRow>,
    #[serde(
        default,
        rename = "semanticIdReferredReferencesRows",
        deserialize_with = "null_as_empty"
    )]
    pub semantic_id_referred: Vec<ReferredReferenceRow>,
    #[serde(default, rename = "valueIdReferenceRows", deserialize_with = "null_as_empty")]
    pub value_id: Vec<ReferenceRow>,
    #[serde(default, rename = "valueIdReferredReferencesRows", deserialize_with = "null_as_empty")]
    pub value_id_referred: Vec<ReferredReferenceRow>,
    #[serde(
        default,
        rename = "supplementalSemanticIdReferenceRows",
        deserialize_with = "null_as_empty"
    )]
    pub supplemental_semantic_ids: Vec<ReferenceRow>,
    #[serde(
        default,
        rename = "supplementalSemanticIdReferredReferenceRows",
        deserialize_with = "null_as_empty"
    )]
    pub supplemental_semantic_ids_referred: Vec<ReferredReferenceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRow {
    #[serde(rename = "dbId")]
    pub db_id: i64,
    #[serde(default)]
    pub position: i32,
    pub name: String,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "semanticIdReferenceRows", deserialize_with = "null_as_empty")]
    pub semantic_id: Vec<ReferenceRow>,
    #[serde(
        default,
        rename = "semanticIdReferredReferencesRows",
        deserialize_with = "null_as_empty"
    )]
    pub semantic_id_referred: Vec<ReferredReferenceRow>,
    #[serde(
        default,
        rename = "supplementalSemanticIdReferenceRows",
        deserialize_with = "null_as_empty"
    )]
    pub supplemental_semantic_ids: Vec<ReferenceRow>,
    #[serde(
        default,
        rename = "supplementalSemanticIdReferredReferenceRows",
        deserialize_with = "null_as_empty"
    )]
    pub supplemental_semantic_ids_referred: Vec<ReferredReferenceRow>,
    #[serde(default, rename = "refersToReferenceRows", deserialize_with = "null_as_empty")]
    pub refers_to: Vec<ReferenceRow>,
    #[serde(default, rename = "refersToReferredReferencesRows", deserialize_with = "null_as_empty")]
    pub refers_to_referred: Vec<ReferredReferenceRow>,
}

/// One key of the data-specification reference of one embedded data
/// specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdsReferenceRow {
    pub eds_id: i64,
    pub reference_id: i64,
    pub reference_type: ReferenceTypes,
    #[serde(default)]
    pub key_id: Option<i64>,
    #[serde(default)]
    pub key_type: Option<KeyTypes>,
    #[serde(default)]
    pub key_value: Option<String>,
}

impl EdsReferenceRow {
    pub fn as_reference_row(&self) -> ReferenceRow {
        ReferenceRow {
            reference_id: self.reference_id,
            reference_type: self.reference_type,
            key_id: self.key_id,
            key_type: self.key_type,
            key_value: self.key_value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueListRow {
    #[serde(rename = "value_pair_value")]
    pub value: String,
    #[serde(rename = "value_reference_pair_id")]
    pub value_ref_pair_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reference_rows: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referred_reference_rows: Vec<ReferredReferenceRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdsContentIec61360Row {
    pub eds_id: i64,
    pub iec_id: i64,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub source_of_definition: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub value_format: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub level_type: Option<LevelType>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub preferred_name: Vec<LangStringPreferredNameTypeIec61360>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub short_name: Vec<LangStringShortNameTypeIec61360>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub definition: Vec<LangStringDefinitionTypeIec61360>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub unit_reference_keys: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub unit_reference_referred: Vec<ReferredReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value_list_entries: Vec<ValueListRow>,
}

/// The `embeddedDataSpecifications` aggregate of one owning element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmbeddedDataSpecificationRows {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub references: Vec<EdsReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referred_references: Vec<ReferredReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub iec61360: Vec<EdsContentIec61360Row>,
}

/// One submodel element as loaded from storage. The JSON columns are kept
/// opaque here and decoded by the element constructor, one field per task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmodelElementRow {
    pub db_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub root_id: Option<i64>,
    #[serde(default)]
    pub id_short: Option<String>,
    #[serde(default)]
    pub id_short_path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub model_type: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, rename = "semanticId")]
    pub semantic_id: Option<Value>,
    #[serde(default, rename = "semanticIdReferred")]
    pub semantic_id_referred: Option<Value>,
    #[serde(default, rename = "descriptions")]
    pub descriptions: Option<Value>,
    #[serde(default, rename = "displayNames")]
    pub display_names: Option<Value>,
    #[serde(default, rename = "supplementalSemanticIdReferenceRows")]
    pub supplemental_semantic_ids: Option<Value>,
    #[serde(default, rename = "supplementalSemanticIdReferredReferenceRows")]
    pub supplemental_semantic_ids_referred: Option<Value>,
    #[serde(default)]
    pub qualifiers: Option<Value>,
    #[serde(default)]
    pub extensions: Option<Value>,
    #[serde(default, rename = "embeddedDataSpecifications")]
    pub embedded_data_specifications: Option<Value>,
}

// ============================================================================
// Descriptor rows (bulk queries keyed by parent descriptor id)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AasDescriptorRow {
    pub descriptor_id: i64,
    pub id: String,
    pub id_short: Option<String>,
    pub asset_kind: Option<String>,
    pub asset_type: Option<String>,
    pub global_asset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAttributeRow {
    pub security_type: String,
    pub security_key: String,
    pub security_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRow {
    pub descriptor_id: i64,
    pub endpoint_id: i64,
    pub position: i32,
    pub interface: String,
    pub href: String,
    pub endpoint_protocol: Option<String>,
    pub endpoint_protocol_versions: Vec<String>,
    pub sub_protocol: Option<String>,
    pub sub_protocol_body: Option<String>,
    pub sub_protocol_body_encoding: Option<String>,
    pub security_attributes: Vec<SecurityAttributeRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificAssetIdRow {
    pub descriptor_id: i64,
    pub specific_asset_id_id: i64,
    pub position: i32,
    pub name: String,
    pub value: String,
    pub semantic_id: Option<i64>,
    pub external_subject_ref: Option<i64>,
    pub supplemental_semantic_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorExtensionRow {
    pub descriptor_id: i64,
    pub extension_id: i64,
    pub position: i32,
    pub name: String,
    pub value_type: Option<String>,
    pub value: Option<String>,
    pub semantic_id: Option<i64>,
    pub supplemental_semantic_ids: Vec<i64>,
    pub refers_to: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmodelDescriptorRow {
    pub aas_descriptor_id: i64,
    pub descriptor_id: i64,
    pub position: i32,
    pub id: String,
    pub id_short: Option<String>,
    pub semantic_id: Option<i64>,
    pub supplemental_semantic_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorAdministrationRow {
    pub descriptor_id: i64,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub template_id: Option<String>,
    pub creator: Option<i64>,
    pub embedded_data_specifications: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangStringRow {
    pub descriptor_id: i64,
    pub row_id: i64,
    pub language: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_referred_row_uses_camel_case_links() {
        let row: ReferredReferenceRow = serde_json::from_value(json!({
            "reference_id": 101,
            "reference_type": "ModelReference",
            "parentReference": 100,
            "rootReference": 100,
            "key_id": 2,
            "key_type": "ConceptDescription",
            "key_value": "mid"
        }))
        .unwrap();
        assert_eq!(row.parent_reference, Some(100));
        assert_eq!(row.root_reference, Some(100));
        assert_eq!(row.key_type, Some(KeyTypes::ConceptDescription));
    }

    #[test]
    fn test_null_child_rows_decode_as_empty() {
        let row: QualifierRow = serde_json::from_value(json!({
            "dbId": 7,
            "type": "Cardinality",
            "value_type": "xs:string",
            "semanticIdReferenceRows": null,
            "valueIdReferenceRows": null
        }))
        .unwrap();
        assert!(row.semantic_id.is_empty());
        assert!(row.value_id.is_empty());
        assert_eq!(row.position, 0);
    }
}
