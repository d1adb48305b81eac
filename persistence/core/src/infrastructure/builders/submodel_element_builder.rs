// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Polymorphic Submodel-Element Constructor
//!
//! Turns one [`SubmodelElementRow`] into a typed [`SubmodelElement`] in two
//! phases:
//!
//! 1. **Dispatch.** The `model_type` column selects one of the
//!    [`ModelType`] variants. A pure constructor decodes that variant's
//!    `value` payload, including any references it carries (`valueId`,
//!    `first`/`second`, `observed`, ...). Unknown discriminators fail with
//!    `InvalidModelType`.
//! 2. **Shared fields.** The seven attributes common to every variant are
//!    decoded in parallel on the rayon pool. Each task owns its own
//!    reference pool and finalizes it before returning, so nothing is shared
//!    between tasks. Results are collected all-or-nothing and merged in a
//!    fixed order.
//!
//! Children of container elements are not attached here; see
//! `crate::application::submodel_element_reader`.

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::data_specification::EmbeddedDataSpecification;
use crate::domain::data_type::DataTypeDefXsd;
use crate::domain::descriptor::SpecificAssetId;
use crate::domain::extension::{Extension, Qualifier};
use crate::domain::lang_string::{LangStringNameType, LangStringTextType};
use crate::domain::reference::Reference;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{
    null_as_empty, EmbeddedDataSpecificationRows, ExtensionRow, QualifierRow, ReferenceRow,
    ReferredReferenceRow, SubmodelElementRow,
};
use crate::domain::submodel_element::{
    AasSubmodelElements, AnnotatedRelationshipElement, BasicEventElement, Blob, Capability,
    Direction, ElementAttributes, Entity, EntityType, EventElement, File, ModelType,
    MultiLanguageProperty, Operation, OperationVariable, Property, Range, ReferenceElement,
    RelationshipElement, StateOfEvent, SubmodelElement, SubmodelElementCollection,
    SubmodelElementKind, SubmodelElementList,
};
use crate::infrastructure::builders::lang_string::parse_lang_strings;
use crate::infrastructure::builders::reference_pool::{build_references, build_single_reference};
use crate::infrastructure::builders::{
    non_empty, EmbeddedDataSpecificationBuilder, ExtensionBuilder, QualifierBuilder,
};

/// Build one fully populated submodel element from its row.
pub fn build_submodel_element(
    row: &SubmodelElementRow,
) -> Result<SubmodelElement, RepositoryError> {
    let model_type: ModelType = row.model_type.parse()?;
    let kind = build_kind(model_type, row.value.as_ref())
        .map_err(|e| e.context(format!("{} {}", model_type, row.db_id)))?;

    let parsed: Vec<SharedField> = SHARED_FIELDS
        .par_iter()
        .map(|field| field.parse(row))
        .collect::<Result<_, _>>()
        .map_err(|e| e.context(format!("{} {}", model_type, row.db_id)))?;

    let mut attributes = ElementAttributes {
        id_short: non_empty(row.id_short.clone()),
        category: non_empty(row.category.clone()),
        ..Default::default()
    };
    for field in parsed {
        field.merge_into(&mut attributes);
    }

    Ok(SubmodelElement { attributes, kind })
}

// ============================================================================
// Phase A: variant dispatch
// ============================================================================

fn build_kind(
    model_type: ModelType,
    payload: Option<&Value>,
) -> Result<SubmodelElementKind, RepositoryError> {
    Ok(match model_type {
        ModelType::Property => SubmodelElementKind::Property(build_property(payload)?),
        ModelType::MultiLanguageProperty => {
            SubmodelElementKind::MultiLanguageProperty(build_multi_language_property(payload)?)
        }
        ModelType::Range => SubmodelElementKind::Range(build_range(payload)?),
        ModelType::File => SubmodelElementKind::File(build_file(payload)?),
        ModelType::Blob => SubmodelElementKind::Blob(build_blob(payload)?),
        ModelType::ReferenceElement => {
            SubmodelElementKind::ReferenceElement(build_reference_element(payload)?)
        }
        ModelType::RelationshipElement => {
            let (first, second) = build_relationship(payload)?;
            SubmodelElementKind::RelationshipElement(RelationshipElement { first, second })
        }
        ModelType::AnnotatedRelationshipElement => {
            let (first, second) = build_relationship(payload)?;
            SubmodelElementKind::AnnotatedRelationshipElement(AnnotatedRelationshipElement {
                first,
                second,
                annotations: Vec::new(),
            })
        }
        ModelType::Entity => SubmodelElementKind::Entity(build_entity(payload)?),
        ModelType::BasicEventElement => {
            SubmodelElementKind::BasicEventElement(build_basic_event_element(payload)?)
        }
        ModelType::EventElement => SubmodelElementKind::EventElement(EventElement {}),
        ModelType::Operation => SubmodelElementKind::Operation(build_operation(payload)?),
        ModelType::Capability => SubmodelElementKind::Capability(Capability {}),
        ModelType::SubmodelElementCollection => {
            SubmodelElementKind::SubmodelElementCollection(SubmodelElementCollection::default())
        }
        ModelType::SubmodelElementList => {
            SubmodelElementKind::SubmodelElementList(build_submodel_element_list(payload)?)
        }
    })
}

/// Decode a variant payload. A missing payload decodes like `{}` so variants
/// whose fields are all optional still succeed.
fn decode_payload<T: DeserializeOwned>(payload: Option<&Value>) -> Result<T, RepositoryError> {
    let value = match payload {
        Some(v) if !v.is_null() => v.clone(),
        _ => Value::Object(Default::default()),
    };
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::MalformedPayload(format!("value: {e}")))
}

fn required(reference: Option<Reference>, field: &str) -> Result<Reference, RepositoryError> {
    reference.ok_or_else(|| {
        RepositoryError::MalformedPayload(format!("missing required reference '{field}'"))
    })
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    #[serde(default)]
    value: Option<String>,
    value_type: DataTypeDefXsd,
    #[serde(default, deserialize_with = "null_as_empty")]
    value_id: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    value_id_referred: Vec<ReferredReferenceRow>,
}

fn build_property(payload: Option<&Value>) -> Result<Property, RepositoryError> {
    let row: PropertyValue = decode_payload(payload)?;
    Ok(Property {
        value_type: row.value_type,
        value: row.value,
        value_id: build_single_reference(&row.value_id, &row.value_id_referred, "valueId")?,
    })
}

#[derive(Debug, Deserialize)]
struct MultiLanguagePropertyValue {
    #[serde(default, deserialize_with = "null_as_empty")]
    value: Vec<LangStringTextType>,
    #[serde(default, deserialize_with = "null_as_empty")]
    value_id: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    value_id_referred: Vec<ReferredReferenceRow>,
}

fn build_multi_language_property(
    payload: Option<&Value>,
) -> Result<MultiLanguageProperty, RepositoryError> {
    let row: MultiLanguagePropertyValue = decode_payload(payload)?;
    Ok(MultiLanguageProperty {
        value: row.value,
        value_id: build_single_reference(&row.value_id, &row.value_id_referred, "valueId")?,
    })
}

#[derive(Debug, Deserialize)]
struct RangeValue {
    #[serde(default)]
    min: Option<String>,
    #[serde(default)]
    max: Option<String>,
    value_type: DataTypeDefXsd,
}

fn build_range(payload: Option<&Value>) -> Result<Range, RepositoryError> {
    let row: RangeValue = decode_payload(payload)?;
    Ok(Range {
        value_type: row.value_type,
        min: non_empty(row.min),
        max: non_empty(row.max),
    })
}

#[derive(Debug, Deserialize)]
struct ContentValue {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

fn build_file(payload: Option<&Value>) -> Result<File, RepositoryError> {
    let row: ContentValue = decode_payload(payload)?;
    Ok(File {
        content_type: non_empty(row.content_type),
        value: non_empty(row.value),
    })
}

fn build_blob(payload: Option<&Value>) -> Result<Blob, RepositoryError> {
    let row: ContentValue = decode_payload(payload)?;
    Ok(Blob {
        content_type: non_empty(row.content_type),
        value: non_empty(row.value),
    })
}

#[derive(Debug, Deserialize)]
struct ReferenceElementValue {
    #[serde(default, deserialize_with = "null_as_empty")]
    value: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    value_referred: Vec<ReferredReferenceRow>,
}

fn build_reference_element(payload: Option<&Value>) -> Result<ReferenceElement, RepositoryError> {
    let row: ReferenceElementValue = decode_payload(payload)?;
    Ok(ReferenceElement {
        value: build_single_reference(&row.value, &row.value_referred, "value")?,
    })
}

#[derive(Debug, Deserialize)]
struct RelationshipValue {
    #[serde(default, deserialize_with = "null_as_empty")]
    first: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    first_referred: Vec<ReferredReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    second: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    second_referred: Vec<ReferredReferenceRow>,
}

fn build_relationship(payload: Option<&Value>) -> Result<(Reference, Reference), RepositoryError> {
    let row: RelationshipValue = decode_payload(payload)?;
    let first = build_single_reference(&row.first, &row.first_referred, "first")?;
    let second = build_single_reference(&row.second, &row.second_referred, "second")?;
    let (first, second) = (required(first, "first")?, required(second, "second")?);
    Ok((first, second))
}

#[derive(Debug, Deserialize)]
struct EntityValue {
    #[serde(default)]
    entity_type: Option<EntityType>,
    #[serde(default)]
    global_asset_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    specific_asset_ids: Vec<SpecificAssetId>,
}

fn build_entity(payload: Option<&Value>) -> Result<Entity, RepositoryError> {
    let row: EntityValue = decode_payload(payload)?;
    Ok(Entity {
        entity_type: row.entity_type,
        global_asset_id: non_empty(row.global_asset_id),
        specific_asset_ids: row.specific_asset_ids,
        statements: Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
struct BasicEventElementValue {
    direction: Direction,
    state: StateOfEvent,
    #[serde(default)]
    message_topic: Option<String>,
    #[serde(default)]
    last_update: Option<String>,
    #[serde(default)]
    min_interval: Option<String>,
    #[serde(default)]
    max_interval: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    observed_ref: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    observed_ref_referred: Vec<ReferredReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    message_broker_ref: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    message_broker_ref_referred: Vec<ReferredReferenceRow>,
}

fn build_basic_event_element(
    payload: Option<&Value>,
) -> Result<BasicEventElement, RepositoryError> {
    let row: BasicEventElementValue = decode_payload(payload)?;
    let observed = required(
        build_single_reference(&row.observed_ref, &row.observed_ref_referred, "observed")?,
        "observed",
    )?;
    Ok(BasicEventElement {
        observed,
        direction: row.direction,
        state: row.state,
        message_topic: non_empty(row.message_topic),
        message_broker: build_single_reference(
            &row.message_broker_ref,
            &row.message_broker_ref_referred,
            "messageBroker",
        )?,
        last_update: non_empty(row.last_update),
        min_interval: non_empty(row.min_interval),
        max_interval: non_empty(row.max_interval),
    })
}

#[derive(Debug, Deserialize)]
struct OperationValue {
    #[serde(default, deserialize_with = "null_as_empty")]
    input_variables: Vec<OperationVariable>,
    #[serde(default, deserialize_with = "null_as_empty")]
    output_variables: Vec<OperationVariable>,
    #[serde(default, deserialize_with = "null_as_empty")]
    inoutput_variables: Vec<OperationVariable>,
}

fn build_operation(payload: Option<&Value>) -> Result<Operation, RepositoryError> {
    let row: OperationValue = decode_payload(payload)?;
    Ok(Operation {
        input_variables: row.input_variables,
        output_variables: row.output_variables,
        inoutput_variables: row.inoutput_variables,
    })
}

#[derive(Debug, Deserialize)]
struct SubmodelElementListValue {
    #[serde(default)]
    order_relevant: Option<bool>,
    type_value_list_element: AasSubmodelElements,
    #[serde(default)]
    value_type_list_element: Option<DataTypeDefXsd>,
    #[serde(default, deserialize_with = "null_as_empty")]
    semantic_id_list_element: Vec<ReferenceRow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    semantic_id_list_element_referred: Vec<ReferredReferenceRow>,
}

fn build_submodel_element_list(
    payload: Option<&Value>,
) -> Result<SubmodelElementList, RepositoryError> {
    let row: SubmodelElementListValue = decode_payload(payload)?;
    Ok(SubmodelElementList {
        order_relevant: row.order_relevant,
        semantic_id_list_element: build_single_reference(
            &row.semantic_id_list_element,
            &row.semantic_id_list_element_referred,
            "semanticIdListElement",
        )?,
        type_value_list_element: row.type_value_list_element,
        value_type_list_element: row.value_type_list_element,
        value: Vec::new(),
    })
}

// ============================================================================
// Phase B: shared fields
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum SharedFieldKind {
    SemanticId,
    Descriptions,
    DisplayNames,
    EmbeddedDataSpecifications,
    SupplementalSemanticIds,
    Extensions,
    Qualifiers,
}

/// Merge order of the shared fields.
const SHARED_FIELDS: [SharedFieldKind; 7] = [
    SharedFieldKind::SemanticId,
    SharedFieldKind::Descriptions,
    SharedFieldKind::DisplayNames,
    SharedFieldKind::EmbeddedDataSpecifications,
    SharedFieldKind::SupplementalSemanticIds,
    SharedFieldKind::Extensions,
    SharedFieldKind::Qualifiers,
];

#[derive(Debug)]
enum SharedField {
    SemanticId(Option<Reference>),
    Descriptions(Vec<LangStringTextType>),
    DisplayNames(Vec<LangStringNameType>),
    EmbeddedDataSpecifications(Vec<EmbeddedDataSpecification>),
    SupplementalSemanticIds(Vec<Reference>),
    Extensions(Vec<Extension>),
    Qualifiers(Vec<Qualifier>),
}

impl SharedFieldKind {
    fn parse(self, row: &SubmodelElementRow) -> Result<SharedField, RepositoryError> {
        Ok(match self {
            SharedFieldKind::SemanticId => {
                let rows: Vec<ReferenceRow> = decode_rows(row.semantic_id.as_ref(), "semanticId")?;
                let referred: Vec<ReferredReferenceRow> =
                    decode_rows(row.semantic_id_referred.as_ref(), "semanticIdReferred")?;
                SharedField::SemanticId(build_single_reference(&rows, &referred, "semanticId")?)
            }
            SharedFieldKind::Descriptions => {
                SharedField::Descriptions(parse_lang_strings(row.descriptions.as_ref())?)
            }
            SharedFieldKind::DisplayNames => {
                SharedField::DisplayNames(parse_lang_strings(row.display_names.as_ref())?)
            }
            SharedFieldKind::EmbeddedDataSpecifications => {
                let rows: EmbeddedDataSpecificationRows =
                    match row.embedded_data_specifications.as_ref() {
                        Some(v) if !v.is_null() => {
                            serde_json::from_value(v.clone()).map_err(|e| {
                                RepositoryError::MalformedPayload(format!(
                                    "embeddedDataSpecifications: {e}"
                                ))
                            })?
                        }
                        _ => EmbeddedDataSpecificationRows::default(),
                    };
                let mut builder = EmbeddedDataSpecificationBuilder::new();
                builder.add_rows(&rows)?;
                SharedField::EmbeddedDataSpecifications(builder.build()?)
            }
            SharedFieldKind::SupplementalSemanticIds => {
                let rows: Vec<ReferenceRow> = decode_rows(
                    row.supplemental_semantic_ids.as_ref(),
                    "supplementalSemanticIds",
                )?;
                let referred: Vec<ReferredReferenceRow> = decode_rows(
                    row.supplemental_semantic_ids_referred.as_ref(),
                    "supplementalSemanticIdsReferred",
                )?;
                SharedField::SupplementalSemanticIds(build_references(&rows, &referred)?)
            }
            SharedFieldKind::Extensions => {
                let rows: Vec<ExtensionRow> = decode_rows(row.extensions.as_ref(), "extensions")?;
                let mut builder = ExtensionBuilder::new();
                builder.add_rows(&rows)?;
                SharedField::Extensions(builder.build()?)
            }
            SharedFieldKind::Qualifiers => {
                let rows: Vec<QualifierRow> = decode_rows(row.qualifiers.as_ref(), "qualifiers")?;
                let mut builder = QualifierBuilder::new();
                builder.add_rows(&rows)?;
                SharedField::Qualifiers(builder.build()?)
            }
        })
    }
}

impl SharedField {
    fn merge_into(self, attributes: &mut ElementAttributes) {
        match self {
            SharedField::SemanticId(reference) => attributes.semantic_id = reference,
            SharedField::Descriptions(values) => attributes.description = values,
            SharedField::DisplayNames(values) => attributes.display_name = values,
            SharedField::EmbeddedDataSpecifications(values) => {
                attributes.embedded_data_specifications = values
            }
            SharedField::SupplementalSemanticIds(values) => {
                attributes.supplemental_semantic_ids = values
            }
            SharedField::Extensions(values) => attributes.extensions = values,
            SharedField::Qualifiers(values) => attributes.qualifiers = values,
        }
    }
}

fn decode_rows<T: DeserializeOwned>(
    raw: Option<&Value>,
    field: &str,
) -> Result<Vec<T>, RepositoryError> {
    match raw {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map_err(|e| RepositoryError::MalformedPayload(format!("{field}: {e}"))),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(model_type: &str, value: Option<Value>) -> SubmodelElementRow {
        SubmodelElementRow {
            db_id: 1,
            id_short: Some("element".into()),
            model_type: model_type.into(),
            value,
            ..Default::default()
        }
    }

    fn reference_rows(id: i64, value: &str) -> Value {
        json!([{
            "reference_id": id,
            "reference_type": "ExternalReference",
            "key_id": id * 10,
            "key_type": "GlobalReference",
            "key_value": value
        }])
    }

    #[test]
    fn test_property_with_value_id() {
        let element = build_submodel_element(&row(
            "Property",
            Some(json!({
                "value": "21.5",
                "value_type": "xs:double",
                "value_id": reference_rows(5, "urn:value")
            })),
        ))
        .unwrap();

        let SubmodelElementKind::Property(property) = &element.kind else {
            panic!("expected property, got {:?}", element.model_type());
        };
        assert_eq!(property.value.as_deref(), Some("21.5"));
        assert_eq!(property.value_type, DataTypeDefXsd::Double);
        assert_eq!(property.value_id.as_ref().unwrap().keys[0].value, "urn:value");
        assert_eq!(element.id_short(), Some("element"));
    }

    #[test]
    fn test_unknown_model_type() {
        let err = build_submodel_element(&row("Submodel", None)).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidModelType(_)));
    }

    #[test]
    fn test_malformed_payload() {
        let err = build_submodel_element(&row("Range", Some(json!({"min": "1"})))).unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedPayload(_)));
    }

    #[test]
    fn test_relationship_requires_both_ends() {
        let err = build_submodel_element(&row(
            "RelationshipElement",
            Some(json!({"first": reference_rows(1, "a")})),
        ))
        .unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedPayload(_)));
    }

    #[test]
    fn test_two_semantic_ids_is_invariant_violation() {
        let mut element_row = row("Capability", None);
        element_row.semantic_id = Some(json!([
            {"reference_id": 1, "reference_type": "ExternalReference", "key_id": 1,
             "key_type": "GlobalReference", "key_value": "a"},
            {"reference_id": 2, "reference_type": "ExternalReference", "key_id": 2,
             "key_type": "GlobalReference", "key_value": "b"}
        ]));
        let err = build_submodel_element(&element_row).unwrap_err();
        assert!(matches!(err, RepositoryError::InvariantViolation(_)));
    }
}
