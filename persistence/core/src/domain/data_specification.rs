// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedded data specifications (IEC 61360 content) and administrative
//! information.

use serde::{Deserialize, Serialize};

use crate::domain::data_type::DataTypeIec61360;
use crate::domain::lang_string::{
    LangStringDefinitionTypeIec61360, LangStringPreferredNameTypeIec61360,
    LangStringShortNameTypeIec61360,
};
use crate::domain::reference::Reference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueReferencePair {
    pub value: String,
    pub value_id: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueList {
    pub value_reference_pairs: Vec<ValueReferencePair>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelType {
    #[serde(default)]
    pub min: bool,
    #[serde(default)]
    pub nom: bool,
    #[serde(default)]
    pub typ: bool,
    #[serde(default)]
    pub max: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSpecificationIec61360 {
    pub preferred_name: Vec<LangStringPreferredNameTypeIec61360>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_name: Vec<LangStringShortNameTypeIec61360>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_of_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataTypeIec61360>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definition: Vec<LangStringDefinitionTypeIec61360>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_list: Option<ValueList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_type: Option<LevelType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedDataSpecification {
    pub data_specification: Reference,
    pub data_specification_content: DataSpecificationIec61360,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrativeInformation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded_data_specifications: Vec<EmbeddedDataSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}
