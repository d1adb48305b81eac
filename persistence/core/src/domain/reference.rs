// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reference Value Objects
//!
//! `Reference` is the pointer type used throughout the AAS metamodel: a typed,
//! ordered path of keys that may carry one nested `referredSemanticId`.
//! Nested references form a chain, never a tree.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Typed reference model shared by every hydrated aggregate

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceTypes {
    ExternalReference,
    ModelReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyTypes {
    AnnotatedRelationshipElement,
    AssetAdministrationShell,
    BasicEventElement,
    Blob,
    Capability,
    ConceptDescription,
    DataElement,
    Entity,
    EventElement,
    File,
    FragmentReference,
    GlobalReference,
    Identifiable,
    MultiLanguageProperty,
    Operation,
    Property,
    Range,
    Referable,
    ReferenceElement,
    RelationshipElement,
    Submodel,
    SubmodelElement,
    SubmodelElementCollection,
    SubmodelElementList,
}

/// Parse a unit-variant enum from its serialized name.
pub(crate) fn parse_enum_name<T: serde::de::DeserializeOwned>(
    kind: &str,
    value: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_value(serde_json::Value::String(value.to_owned()))
        .map_err(|_| RepositoryError::MalformedPayload(format!("unknown {kind} '{value}'")))
}

impl FromStr for ReferenceTypes {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum_name("reference type", s)
    }
}

impl FromStr for KeyTypes {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum_name("key type", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "type")]
    pub key_type: KeyTypes,
    pub value: String,
}

impl Key {
    pub fn new(key_type: KeyTypes, value: impl Into<String>) -> Self {
        Self {
            key_type,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(rename = "type")]
    pub reference_type: ReferenceTypes,
    pub keys: Vec<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_semantic_id: Option<Box<Reference>>,
}

impl Reference {
    pub fn new(reference_type: ReferenceTypes) -> Self {
        Self {
            reference_type,
            keys: Vec::new(),
            referred_semantic_id: None,
        }
    }

    /// Number of nested `referredSemanticId` links below this reference.
    pub fn chain_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.referred_semantic_id.as_deref();
        while let Some(next) = current {
            depth += 1;
            current = next.referred_semantic_id.as_deref();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_types() {
        assert_eq!(
            "ModelReference".parse::<ReferenceTypes>().unwrap(),
            ReferenceTypes::ModelReference
        );
        assert!(matches!(
            "Model".parse::<ReferenceTypes>(),
            Err(RepositoryError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reference_serializes_camel_case() {
        let mut inner = Reference::new(ReferenceTypes::ExternalReference);
        inner.keys.push(Key::new(KeyTypes::GlobalReference, "leaf"));
        let mut outer = Reference::new(ReferenceTypes::ModelReference);
        outer.keys.push(Key::new(KeyTypes::Submodel, "urn:sm"));
        outer.referred_semantic_id = Some(Box::new(inner));

        let json = serde_json::to_value(&outer).unwrap();
        assert_eq!(json["type"], "ModelReference");
        assert_eq!(json["keys"][0]["type"], "Submodel");
        assert_eq!(json["referredSemanticId"]["keys"][0]["value"], "leaf");
        assert_eq!(outer.chain_depth(), 1);
    }
}
