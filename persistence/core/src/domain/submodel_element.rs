// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Submodel Elements
//!
//! A submodel element is one of a closed set of variants selected by the
//! `modelType` discriminator stored on its row. Attributes shared by all
//! variants live in [`ElementAttributes`]; variant-specific fields live in
//! [`SubmodelElementKind`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Closed sum type for the polymorphic element hierarchy
//!
//! Adding a variant to [`ModelType`] is a compile error in every exhaustive
//! match until the constructor and the tree reader handle it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::data_specification::EmbeddedDataSpecification;
use crate::domain::data_type::DataTypeDefXsd;
use crate::domain::descriptor::SpecificAssetId;
use crate::domain::extension::{Extension, Qualifier};
use crate::domain::lang_string::{LangStringNameType, LangStringTextType};
use crate::domain::reference::Reference;
use crate::domain::repository::RepositoryError;

/// Discriminator values accepted on a submodel-element row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    Property,
    MultiLanguageProperty,
    Range,
    File,
    Blob,
    ReferenceElement,
    RelationshipElement,
    AnnotatedRelationshipElement,
    Entity,
    BasicEventElement,
    EventElement,
    Operation,
    Capability,
    SubmodelElementCollection,
    SubmodelElementList,
}

impl ModelType {
    pub const ALL: [ModelType; 15] = [
        ModelType::Property,
        ModelType::MultiLanguageProperty,
        ModelType::Range,
        ModelType::File,
        ModelType::Blob,
        ModelType::ReferenceElement,
        ModelType::RelationshipElement,
        ModelType::AnnotatedRelationshipElement,
        ModelType::Entity,
        ModelType::BasicEventElement,
        ModelType::EventElement,
        ModelType::Operation,
        ModelType::Capability,
        ModelType::SubmodelElementCollection,
        ModelType::SubmodelElementList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Property => "Property",
            ModelType::MultiLanguageProperty => "MultiLanguageProperty",
            ModelType::Range => "Range",
            ModelType::File => "File",
            ModelType::Blob => "Blob",
            ModelType::ReferenceElement => "ReferenceElement",
            ModelType::RelationshipElement => "RelationshipElement",
            ModelType::AnnotatedRelationshipElement => "AnnotatedRelationshipElement",
            ModelType::Entity => "Entity",
            ModelType::BasicEventElement => "BasicEventElement",
            ModelType::EventElement => "EventElement",
            ModelType::Operation => "Operation",
            ModelType::Capability => "Capability",
            ModelType::SubmodelElementCollection => "SubmodelElementCollection",
            ModelType::SubmodelElementList => "SubmodelElementList",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RepositoryError::InvalidModelType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AasSubmodelElements {
    AnnotatedRelationshipElement,
    BasicEventElement,
    Blob,
    Capability,
    DataElement,
    Entity,
    EventElement,
    File,
    MultiLanguageProperty,
    Operation,
    Property,
    Range,
    ReferenceElement,
    RelationshipElement,
    SubmodelElement,
    SubmodelElementCollection,
    SubmodelElementList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    CoManagedEntity,
    SelfManagedEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateOfEvent {
    On,
    Off,
}

/// Attributes every submodel element carries regardless of its variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAttributes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_name: Vec<LangStringNameType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<LangStringTextType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplemental_semantic_ids: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded_data_specifications: Vec<EmbeddedDataSpecification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub value_type: DataTypeDefXsd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_id: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLanguageProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<LangStringTextType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_id: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub value_type: DataTypeDefXsd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipElement {
    pub first: Reference,
    pub second: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRelationshipElement {
    pub first: Reference,
    pub second: Reference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<SubmodelElement>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_asset_ids: Vec<SpecificAssetId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<SubmodelElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicEventElement {
    pub observed: Reference,
    pub direction: Direction,
    pub state: StateOfEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_broker: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_interval: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventElement {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationVariable {
    pub value: SubmodelElement,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_variables: Vec<OperationVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_variables: Vec<OperationVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inoutput_variables: Vec<OperationVariable>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Capability {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmodelElementCollection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<SubmodelElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelElementList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_relevant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id_list_element: Option<Reference>,
    pub type_value_list_element: AasSubmodelElements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type_list_element: Option<DataTypeDefXsd>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<SubmodelElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modelType")]
pub enum SubmodelElementKind {
    Property(Property),
    MultiLanguageProperty(MultiLanguageProperty),
    Range(Range),
    File(File),
    Blob(Blob),
    ReferenceElement(ReferenceElement),
    RelationshipElement(RelationshipElement),
    AnnotatedRelationshipElement(AnnotatedRelationshipElement),
    Entity(Entity),
    BasicEventElement(BasicEventElement),
    EventElement(EventElement),
    Operation(Operation),
    Capability(Capability),
    SubmodelElementCollection(SubmodelElementCollection),
    SubmodelElementList(SubmodelElementList),
}

impl SubmodelElementKind {
    pub fn model_type(&self) -> ModelType {
        match self {
            SubmodelElementKind::Property(_) => ModelType::Property,
            SubmodelElementKind::MultiLanguageProperty(_) => ModelType::MultiLanguageProperty,
            SubmodelElementKind::Range(_) => ModelType::Range,
            SubmodelElementKind::File(_) => ModelType::File,
            SubmodelElementKind::Blob(_) => ModelType::Blob,
            SubmodelElementKind::ReferenceElement(_) => ModelType::ReferenceElement,
            SubmodelElementKind::RelationshipElement(_) => ModelType::RelationshipElement,
            SubmodelElementKind::AnnotatedRelationshipElement(_) => {
                ModelType::AnnotatedRelationshipElement
            }
            SubmodelElementKind::Entity(_) => ModelType::Entity,
            SubmodelElementKind::BasicEventElement(_) => ModelType::BasicEventElement,
            SubmodelElementKind::EventElement(_) => ModelType::EventElement,
            SubmodelElementKind::Operation(_) => ModelType::Operation,
            SubmodelElementKind::Capability(_) => ModelType::Capability,
            SubmodelElementKind::SubmodelElementCollection(_) => {
                ModelType::SubmodelElementCollection
            }
            SubmodelElementKind::SubmodelElementList(_) => ModelType::SubmodelElementList,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmodelElement {
    #[serde(flatten)]
    pub attributes: ElementAttributes,
    #[serde(flatten)]
    pub kind: SubmodelElementKind,
}

impl SubmodelElement {
    pub fn new(kind: SubmodelElementKind) -> Self {
        Self {
            attributes: ElementAttributes::default(),
            kind,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.kind.model_type()
    }

    pub fn id_short(&self) -> Option<&str> {
        self.attributes.id_short.as_deref()
    }

    /// Slot that holds nested child elements, for the variants that have one.
    pub fn children_mut(&mut self) -> Option<&mut Vec<SubmodelElement>> {
        match &mut self.kind {
            SubmodelElementKind::SubmodelElementCollection(c) => Some(&mut c.value),
            SubmodelElementKind::SubmodelElementList(l) => Some(&mut l.value),
            SubmodelElementKind::Entity(e) => Some(&mut e.statements),
            SubmodelElementKind::AnnotatedRelationshipElement(a) => Some(&mut a.annotations),
            SubmodelElementKind::Property(_)
            | SubmodelElementKind::MultiLanguageProperty(_)
            | SubmodelElementKind::Range(_)
            | SubmodelElementKind::File(_)
            | SubmodelElementKind::Blob(_)
            | SubmodelElementKind::ReferenceElement(_)
            | SubmodelElementKind::RelationshipElement(_)
            | SubmodelElementKind::BasicEventElement(_)
            | SubmodelElementKind::EventElement(_)
            | SubmodelElementKind::Operation(_)
            | SubmodelElementKind::Capability(_) => None,
        }
    }
}
