// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Registry Descriptors
//!
//! Composite aggregates returned by the descriptor registry:
//! `AssetAdministrationShellDescriptor` owns its endpoints, specific asset ids,
//! extensions and `SubmodelDescriptor`s. They are assembled by
//! `crate::application::descriptor_assembler` from independent bulk fetches.

use serde::{Deserialize, Serialize};

use crate::domain::data_specification::AdministrativeInformation;
use crate::domain::extension::Extension;
use crate::domain::lang_string::{LangStringNameType, LangStringTextType};
use crate::domain::reference::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Instance,
    NotApplicable,
    Type,
}

impl std::str::FromStr for AssetKind {
    type Err = crate::domain::repository::RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::domain::reference::parse_enum_name("asset kind", s)
    }
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Instance => "Instance",
            AssetKind::NotApplicable => "NotApplicable",
            AssetKind::Type => "Type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificAssetId {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_semantic_ids: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_subject_id: Option<Reference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityTypeEnum {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "RFC_TLSA")]
    RfcTlsa,
    #[serde(rename = "W3C_DID")]
    W3cDid,
}

impl std::str::FromStr for SecurityTypeEnum {
    type Err = crate::domain::repository::RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::domain::reference::parse_enum_name("security type", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAttribute {
    #[serde(rename = "type")]
    pub security_type: SecurityTypeEnum,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInformation {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoint_protocol_version: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol_body_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_attributes: Vec<SecurityAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub interface: String,
    pub protocol_information: ProtocolInformation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<LangStringTextType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_name: Vec<LangStringNameType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration: Option<AdministrativeInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_semantic_id: Vec<Reference>,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAdministrationShellDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<LangStringTextType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_name: Vec<LangStringNameType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration: Option<AdministrativeInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_asset_ids: Vec<SpecificAssetId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodel_descriptors: Vec<SubmodelDescriptor>,
}

/// Keyset pagination request for descriptor listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorPageQuery {
    /// Page size; `0` selects the configured default.
    pub limit: usize,
    /// Inclusive lower bound on the descriptor id.
    pub cursor: Option<String>,
    pub asset_kind: Option<AssetKind>,
    pub asset_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorPage {
    pub items: Vec<AssetAdministrationShellDescriptor>,
    /// Id of the first descriptor of the following page, if any.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmodelDescriptorPage {
    pub items: Vec<SubmodelDescriptor>,
    /// Id of the first submodel descriptor of the following page, if any.
    pub next_cursor: Option<String>,
}
