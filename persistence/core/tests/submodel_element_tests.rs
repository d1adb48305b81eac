// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for submodel-element construction and tree reading.
//!
//! - every discriminator dispatches to its own variant
//! - shared fields (extensions, qualifiers, lang strings, semantic ids) are
//!   decoded from stored row aggregates
//! - `SubmodelElementReader` nests children by parent and position

use std::sync::Arc;

use serde_json::{json, Value};

use aas_persistence_core::application::SubmodelElementReader;
use aas_persistence_core::domain::data_type::DataTypeDefXsd;
use aas_persistence_core::domain::reference::ReferenceTypes;
use aas_persistence_core::domain::repository::RepositoryError;
use aas_persistence_core::domain::rows::SubmodelElementRow;
use aas_persistence_core::domain::submodel_element::{ModelType, SubmodelElementKind};
use aas_persistence_core::infrastructure::builders::build_submodel_element;
use aas_persistence_core::infrastructure::repositories::InMemoryAasRepository;

fn reference_rows(id: i64, value: &str) -> Value {
    json!([{
        "reference_id": id,
        "reference_type": "ExternalReference",
        "key_id": id * 10,
        "key_type": "GlobalReference",
        "key_value": value
    }])
}

fn element_row(db_id: i64, model_type: &str, value: Option<Value>) -> SubmodelElementRow {
    SubmodelElementRow {
        db_id,
        id_short: Some(format!("e{db_id}")),
        model_type: model_type.into(),
        value,
        ..Default::default()
    }
}

fn minimal_payload(model_type: ModelType) -> Option<Value> {
    match model_type {
        ModelType::Property => Some(json!({"value_type": "xs:string"})),
        ModelType::Range => Some(json!({"value_type": "xs:int", "min": "0", "max": "10"})),
        ModelType::RelationshipElement | ModelType::AnnotatedRelationshipElement => Some(json!({
            "first": reference_rows(1, "urn:first"),
            "second": reference_rows(2, "urn:second")
        })),
        ModelType::BasicEventElement => Some(json!({
            "direction": "output",
            "state": "on",
            "observed_ref": reference_rows(3, "urn:observed")
        })),
        ModelType::SubmodelElementList => Some(json!({"type_value_list_element": "Property"})),
        ModelType::MultiLanguageProperty
        | ModelType::File
        | ModelType::Blob
        | ModelType::ReferenceElement
        | ModelType::Entity
        | ModelType::EventElement
        | ModelType::Operation
        | ModelType::Capability
        | ModelType::SubmodelElementCollection => None,
    }
}

#[test]
fn test_every_model_type_dispatches_to_its_variant() {
    for model_type in ModelType::ALL {
        let row = element_row(1, model_type.as_str(), minimal_payload(model_type));
        let element = build_submodel_element(&row)
            .unwrap_or_else(|e| panic!("{model_type} failed to build: {e}"));
        assert_eq!(element.model_type(), model_type);
        assert_eq!(element.id_short(), Some("e1"));
    }
}

#[test]
fn test_unknown_discriminator_is_rejected() {
    for raw in ["Submodel", "property", ""] {
        let err = build_submodel_element(&element_row(1, raw, None)).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidModelType(_)), "{raw}: {err}");
    }
}

#[test]
fn test_range_and_event_payloads() {
    let range = build_submodel_element(&element_row(
        1,
        "Range",
        minimal_payload(ModelType::Range),
    ))
    .unwrap();
    let SubmodelElementKind::Range(range) = range.kind else {
        panic!("expected range");
    };
    assert_eq!(range.value_type, DataTypeDefXsd::Int);
    assert_eq!(range.min.as_deref(), Some("0"));
    assert_eq!(range.max.as_deref(), Some("10"));

    let event = build_submodel_element(&element_row(
        2,
        "BasicEventElement",
        minimal_payload(ModelType::BasicEventElement),
    ))
    .unwrap();
    let SubmodelElementKind::BasicEventElement(event) = event.kind else {
        panic!("expected basic event element");
    };
    assert_eq!(event.observed.keys[0].value, "urn:observed");
    assert!(event.message_broker.is_none());
}

#[test]
fn test_event_element_without_observed_is_malformed() {
    let err = build_submodel_element(&element_row(
        1,
        "BasicEventElement",
        Some(json!({"direction": "input", "state": "off"})),
    ))
    .unwrap_err();
    assert!(matches!(err, RepositoryError::MalformedPayload(_)));
}

#[test]
fn test_operation_variables_decode_nested_elements() {
    let element = build_submodel_element(&element_row(
        1,
        "Operation",
        Some(json!({
            "input_variables": [
                {"value": {
                    "modelType": "Property",
                    "idShort": "setpoint",
                    "valueType": "xs:double"
                }}
            ],
            "output_variables": null
        })),
    ))
    .unwrap();
    let SubmodelElementKind::Operation(operation) = element.kind else {
        panic!("expected operation");
    };
    assert_eq!(operation.input_variables.len(), 1);
    assert_eq!(operation.input_variables[0].value.id_short(), Some("setpoint"));
    assert!(operation.output_variables.is_empty());
}

#[test]
fn test_shared_fields_are_decoded() {
    let mut row = element_row(
        1,
        "Property",
        Some(json!({"value": "21.5", "value_type": "xs:double"})),
    );
    row.category = Some(String::new());
    row.semantic_id = Some(reference_rows(5, "urn:semantic"));
    row.descriptions = Some(json!([
        {"id": 2, "language": "de", "text": "Temperatur"},
        {"id": 1, "language": "en", "text": "Temperature"}
    ]));
    row.display_names = Some(json!([{"id": 1, "language": "en", "text": "Temp"}]));
    row.supplemental_semantic_ids = Some(json!([
        {"reference_id": 8, "reference_type": "ExternalReference", "key_id": 80,
         "key_type": "GlobalReference", "key_value": "urn:b"},
        {"reference_id": 7, "reference_type": "ExternalReference", "key_id": 70,
         "key_type": "GlobalReference", "key_value": "urn:a"}
    ]));
    row.extensions = Some(json!([
        {"dbId": 11, "position": 1, "name": "second"},
        {"dbId": 10, "position": 0, "name": "first", "value_type": "xs:string", "value": "x"}
    ]));
    row.qualifiers = Some(json!([
        {"dbId": 20, "position": 0, "type": "Cardinality", "value_type": "xs:string",
         "value": "One", "kind": "ConceptQualifier"}
    ]));

    let element = build_submodel_element(&row).unwrap();
    let attributes = &element.attributes;

    assert_eq!(attributes.category, None);
    assert_eq!(attributes.semantic_id.as_ref().unwrap().keys[0].value, "urn:semantic");
    assert_eq!(attributes.description[0].language, "en");
    assert_eq!(attributes.display_name[0].text, "Temp");
    let supplemental: Vec<_> = attributes
        .supplemental_semantic_ids
        .iter()
        .map(|r| r.keys[0].value.as_str())
        .collect();
    assert_eq!(supplemental, vec!["urn:b", "urn:a"]);
    let names: Vec<_> = attributes.extensions.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(attributes.qualifiers[0].qualifier_type, "Cardinality");
}

fn referred_row(id: i64, parent: i64, root: i64, reference_type: &str, value: &str) -> Value {
    json!({
        "reference_id": id,
        "reference_type": reference_type,
        "parentReference": parent,
        "rootReference": root,
        "key_id": id * 10,
        "key_type": "GlobalReference",
        "key_value": value
    })
}

#[test]
fn test_semantic_id_chain_is_nested_from_referred_rows() {
    let mut row = element_row(1, "Capability", None);
    row.semantic_id = Some(reference_rows(100, "root"));
    row.semantic_id_referred = Some(json!([
        referred_row(102, 101, 100, "ExternalReference", "leaf"),
        referred_row(101, 100, 100, "ModelReference", "mid"),
        referred_row(101, 100, 100, "ModelReference", "mid")
    ]));
    row.qualifiers = Some(json!([{
        "dbId": 30,
        "type": "Unit",
        "value_type": "xs:string",
        "semanticIdReferenceRows": reference_rows(200, "q-root"),
        "semanticIdReferredReferencesRows": [
            referred_row(201, 200, 200, "ExternalReference", "q-mid")
        ]
    }]));

    let element = build_submodel_element(&row).unwrap();

    let semantic_id = element.attributes.semantic_id.as_ref().unwrap();
    assert_eq!(semantic_id.chain_depth(), 2);
    assert_eq!(semantic_id.keys[0].value, "root");

    let mid = semantic_id.referred_semantic_id.as_deref().unwrap();
    assert_eq!(mid.reference_type, ReferenceTypes::ModelReference);
    let mid_keys: Vec<_> = mid.keys.iter().map(|k| k.value.as_str()).collect();
    assert_eq!(mid_keys, vec!["mid"]);

    let leaf = mid.referred_semantic_id.as_deref().unwrap();
    assert_eq!(leaf.keys[0].value, "leaf");
    assert!(leaf.referred_semantic_id.is_none());

    let qualifier_id = element.attributes.qualifiers[0].semantic_id.as_ref().unwrap();
    assert_eq!(qualifier_id.chain_depth(), 1);
    assert_eq!(
        qualifier_id.referred_semantic_id.as_deref().unwrap().keys[0].value,
        "q-mid"
    );
}

#[test]
fn test_referred_rows_without_their_root_fail_the_element() {
    let mut row = element_row(1, "Capability", None);
    row.semantic_id_referred = Some(json!([referred_row(101, 100, 100, "ModelReference", "mid")]));

    let err = build_submodel_element(&row).unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[test]
fn test_bad_shared_field_fails_whole_element() {
    let mut row = element_row(1, "Capability", None);
    row.qualifiers = Some(json!([{"dbId": 1, "type": "x", "value_type": "xs:unknown"}]));
    let err = build_submodel_element(&row).unwrap_err();
    assert!(matches!(err, RepositoryError::MalformedPayload(_)));
}

// ============================================================================
// Tree reader
// ============================================================================

fn child(
    db_id: i64,
    parent: i64,
    position: i32,
    model_type: &str,
    value: Option<Value>,
) -> SubmodelElementRow {
    SubmodelElementRow {
        parent_id: Some(parent),
        root_id: Some(1),
        position,
        ..element_row(db_id, model_type, value)
    }
}

fn reader(repo: &InMemoryAasRepository) -> SubmodelElementReader {
    SubmodelElementReader::new(Arc::new(repo.clone()))
}

#[tokio::test]
async fn test_tree_nests_children_by_position() {
    let repo = InMemoryAasRepository::new();
    let property = Some(json!({"value_type": "xs:string"}));
    repo.insert_submodel_element("urn:sm", element_row(1, "SubmodelElementCollection", None));
    repo.insert_submodel_element("urn:sm", child(4, 1, 2, "Property", property.clone()));
    repo.insert_submodel_element("urn:sm", child(2, 1, 0, "Property", property.clone()));
    repo.insert_submodel_element("urn:sm", child(3, 1, 1, "Entity", None));
    repo.insert_submodel_element("urn:sm", child(5, 3, 0, "Property", property));
    repo.insert_submodel_element(
        "urn:sm",
        SubmodelElementRow {
            position: 1,
            ..element_row(6, "Capability", None)
        },
    );

    let tree = reader(&repo).read_submodel_elements("urn:sm").await.unwrap();

    let top: Vec<_> = tree.iter().map(|e| e.id_short().unwrap()).collect();
    assert_eq!(top, vec!["e1", "e6"]);

    let SubmodelElementKind::SubmodelElementCollection(collection) = &tree[0].kind else {
        panic!("expected collection");
    };
    let nested: Vec<_> = collection.value.iter().map(|e| e.id_short().unwrap()).collect();
    assert_eq!(nested, vec!["e2", "e3", "e4"]);

    let SubmodelElementKind::Entity(entity) = &collection.value[1].kind else {
        panic!("expected entity");
    };
    assert_eq!(entity.statements[0].id_short(), Some("e5"));
}

#[tokio::test]
async fn test_unknown_submodel_is_empty() {
    let repo = InMemoryAasRepository::new();
    assert!(reader(&repo).read_submodel_elements("urn:none").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_child_of_missing_parent_is_not_found() {
    let repo = InMemoryAasRepository::new();
    repo.insert_submodel_element("urn:sm", child(2, 99, 0, "Capability", None));

    let err = reader(&repo).read_submodel_elements("urn:sm").await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_child_of_non_container_is_invariant_violation() {
    let repo = InMemoryAasRepository::new();
    repo.insert_submodel_element(
        "urn:sm",
        element_row(1, "Property", Some(json!({"value_type": "xs:string"}))),
    );
    repo.insert_submodel_element("urn:sm", child(2, 1, 0, "Capability", None));

    let err = reader(&repo).read_submodel_elements("urn:sm").await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvariantViolation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_concurrent_reads_on_a_single_worker() {
    let repo = InMemoryAasRepository::new();
    for submodel in ["urn:sm:a", "urn:sm:b"] {
        repo.insert_submodel_element(submodel, element_row(1, "SubmodelElementCollection", None));
        repo.insert_submodel_element(submodel, child(2, 1, 0, "Capability", None));
    }
    let reader = reader(&repo);

    let (a, b) = tokio::try_join!(
        reader.read_submodel_elements("urn:sm:a"),
        reader.read_submodel_elements("urn:sm:b"),
    )
    .unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
}
