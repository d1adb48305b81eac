// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for AAS descriptor assembly.
//!
//! Seeds an `InMemoryAasRepository` with descriptor rows and checks that
//! `DescriptorAssembler`:
//! - hydrates every child collection and reference
//! - leaves collections empty for descriptors without child rows
//! - pages by identifier with a `next_cursor` only when more rows exist
//! - lists, fetches and checks existence of submodel descriptors per AAS

use std::sync::Arc;

use serde_json::json;

use aas_persistence_core::application::DescriptorAssembler;
use aas_persistence_core::domain::config::HydrationConfig;
use aas_persistence_core::domain::descriptor::{
    AssetKind, DescriptorPageQuery, SecurityTypeEnum,
};
use aas_persistence_core::domain::lang_string::LangStringKind;
use aas_persistence_core::domain::reference::{KeyTypes, ReferenceTypes};
use aas_persistence_core::domain::repository::RepositoryError;
use aas_persistence_core::domain::rows::{
    AasDescriptorRow, DescriptorAdministrationRow, DescriptorExtensionRow, EndpointRow,
    LangStringRow, SecurityAttributeRow, SpecificAssetIdRow, SubmodelDescriptorRow,
};
use aas_persistence_core::infrastructure::repositories::InMemoryAasRepository;

fn assembler(repo: &InMemoryAasRepository) -> DescriptorAssembler {
    let shared = Arc::new(repo.clone());
    DescriptorAssembler::new(shared.clone(), shared, HydrationConfig::default())
}

fn aas_row(descriptor_id: i64, id: &str, asset_kind: &str) -> AasDescriptorRow {
    AasDescriptorRow {
        descriptor_id,
        id: id.into(),
        id_short: Some(format!("shell{descriptor_id}")),
        asset_kind: Some(asset_kind.into()),
        asset_type: None,
        global_asset_id: Some(format!("urn:asset:{descriptor_id}")),
    }
}

fn endpoint(descriptor_id: i64, endpoint_id: i64, position: i32, interface: &str) -> EndpointRow {
    EndpointRow {
        descriptor_id,
        endpoint_id,
        position,
        interface: interface.into(),
        href: format!("http://localhost/{endpoint_id}"),
        endpoint_protocol: Some("HTTP".into()),
        endpoint_protocol_versions: vec!["1.1".into()],
        sub_protocol: None,
        sub_protocol_body: None,
        sub_protocol_body_encoding: Some(String::new()),
        security_attributes: Vec::new(),
    }
}

fn lang_string(descriptor_id: i64, row_id: i64, language: &str, text: &str) -> LangStringRow {
    LangStringRow {
        descriptor_id,
        row_id,
        language: language.into(),
        text: text.into(),
    }
}

fn seeded() -> InMemoryAasRepository {
    let repo = InMemoryAasRepository::new();

    repo.insert_reference(
        500,
        ReferenceTypes::ExternalReference,
        &[(1, KeyTypes::GlobalReference, "urn:sem")],
    );
    repo.insert_referred_reference(
        501,
        ReferenceTypes::ModelReference,
        500,
        500,
        &[(2, KeyTypes::ConceptDescription, "urn:cd")],
    );
    repo.insert_reference(
        510,
        ReferenceTypes::ExternalReference,
        &[(3, KeyTypes::GlobalReference, "urn:subject")],
    );
    repo.insert_reference(
        520,
        ReferenceTypes::ExternalReference,
        &[(4, KeyTypes::GlobalReference, "urn:creator")],
    );
    repo.insert_reference(
        530,
        ReferenceTypes::ModelReference,
        &[(5, KeyTypes::Submodel, "urn:target")],
    );

    repo.insert_aas_descriptor(aas_row(1, "urn:aas:a", "Instance"));
    repo.insert_aas_descriptor(aas_row(2, "urn:aas:b", "Type"));
    repo.insert_aas_descriptor(aas_row(3, "urn:aas:c", "Instance"));

    repo.insert_endpoint(endpoint(1, 12, 1, "AAS-REPOSITORY-3.0"));
    let mut secured = endpoint(1, 11, 0, "AAS-3.0");
    secured.security_attributes = vec![SecurityAttributeRow {
        security_type: "RFC_TLSA".into(),
        security_key: "key".into(),
        security_value: "value".into(),
    }];
    repo.insert_endpoint(secured);

    repo.insert_specific_asset_id(SpecificAssetIdRow {
        descriptor_id: 1,
        specific_asset_id_id: 40,
        position: 0,
        name: "serialNumber".into(),
        value: "SN-1".into(),
        semantic_id: Some(500),
        external_subject_ref: Some(510),
        supplemental_semantic_ids: Vec::new(),
    });

    repo.insert_extension(DescriptorExtensionRow {
        descriptor_id: 1,
        extension_id: 60,
        position: 0,
        name: "origin".into(),
        value_type: Some("xs:string".into()),
        value: Some("plant-7".into()),
        semantic_id: None,
        supplemental_semantic_ids: Vec::new(),
        refers_to: vec![530],
    });

    repo.insert_administration(DescriptorAdministrationRow {
        descriptor_id: 1,
        version: Some("1".into()),
        revision: Some("0".into()),
        template_id: None,
        creator: Some(520),
        embedded_data_specifications: None,
    });

    repo.insert_lang_string(LangStringKind::Description, lang_string(1, 2, "de", "Hülle"));
    repo.insert_lang_string(LangStringKind::Description, lang_string(1, 1, "en", "Shell"));
    repo.insert_lang_string(
        LangStringKind::DisplayName,
        lang_string(10, 3, "en", "Nameplate"),
    );

    for (descriptor_id, position, id) in [(11, 1, "urn:sm:tech"), (10, 0, "urn:sm:nameplate")] {
        repo.insert_submodel_descriptor(SubmodelDescriptorRow {
            aas_descriptor_id: 1,
            descriptor_id,
            position,
            id: id.into(),
            id_short: None,
            semantic_id: (descriptor_id == 10).then_some(500),
            supplemental_semantic_ids: Vec::new(),
        });
    }
    repo.insert_endpoint(endpoint(10, 13, 0, "SUBMODEL-3.0"));

    repo
}

#[tokio::test]
async fn test_get_assembles_every_child_collection() {
    let repo = seeded();
    let descriptor = assembler(&repo).get_aas_descriptor("urn:aas:a").await.unwrap();

    assert_eq!(descriptor.id_short.as_deref(), Some("shell1"));
    assert_eq!(descriptor.asset_kind, Some(AssetKind::Instance));

    let interfaces: Vec<_> = descriptor
        .endpoints
        .iter()
        .map(|e| e.interface.as_str())
        .collect();
    assert_eq!(interfaces, vec!["AAS-3.0", "AAS-REPOSITORY-3.0"]);
    let protocol = &descriptor.endpoints[0].protocol_information;
    assert_eq!(protocol.security_attributes[0].security_type, SecurityTypeEnum::RfcTlsa);
    assert_eq!(protocol.endpoint_protocol_version, vec!["1.1".to_string()]);
    assert_eq!(protocol.subprotocol_body_encoding, None);

    let asset_id = &descriptor.specific_asset_ids[0];
    assert_eq!(asset_id.value, "SN-1");
    let semantic_id = asset_id.semantic_id.as_ref().unwrap();
    assert_eq!(semantic_id.keys[0].value, "urn:sem");
    assert_eq!(semantic_id.chain_depth(), 1);
    let subject = asset_id.external_subject_id.as_ref().unwrap();
    assert_eq!(subject.keys[0].value, "urn:subject");

    assert_eq!(descriptor.extensions[0].refers_to[0].keys[0].value, "urn:target");

    let administration = descriptor.administration.as_ref().unwrap();
    assert_eq!(administration.version.as_deref(), Some("1"));
    assert_eq!(administration.creator.as_ref().unwrap().keys[0].value, "urn:creator");

    let languages: Vec<_> = descriptor
        .description
        .iter()
        .map(|d| d.language.as_str())
        .collect();
    assert_eq!(languages, vec!["en", "de"]);

    let submodels: Vec<_> = descriptor
        .submodel_descriptors
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(submodels, vec!["urn:sm:nameplate", "urn:sm:tech"]);
    let nameplate = &descriptor.submodel_descriptors[0];
    assert_eq!(nameplate.display_name[0].text, "Nameplate");
    assert_eq!(nameplate.endpoints[0].interface, "SUBMODEL-3.0");
    assert!(nameplate.semantic_id.is_some());
    assert!(descriptor.submodel_descriptors[1].endpoints.is_empty());
}

#[tokio::test]
async fn test_descriptor_without_children_has_empty_collections() {
    let repo = seeded();
    let descriptor = assembler(&repo).get_aas_descriptor("urn:aas:b").await.unwrap();

    assert!(descriptor.endpoints.is_empty());
    assert!(descriptor.specific_asset_ids.is_empty());
    assert!(descriptor.extensions.is_empty());
    assert!(descriptor.submodel_descriptors.is_empty());
    assert!(descriptor.description.is_empty());
    assert!(descriptor.administration.is_none());
}

#[tokio::test]
async fn test_unknown_descriptor_is_not_found() {
    let repo = seeded();
    let err = assembler(&repo).get_aas_descriptor("urn:aas:zzz").await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_pages_follow_the_cursor() {
    let repo = seeded();
    let assembler = assembler(&repo);

    let first = assembler
        .list_aas_descriptors(&DescriptorPageQuery {
            limit: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = first.items.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["urn:aas:a", "urn:aas:b"]);
    assert_eq!(first.next_cursor.as_deref(), Some("urn:aas:c"));

    let second = assembler
        .list_aas_descriptors(&DescriptorPageQuery {
            limit: 2,
            cursor: first.next_cursor,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn test_page_filters_by_asset_kind() {
    let repo = seeded();
    let page = assembler(&repo)
        .list_aas_descriptors(&DescriptorPageQuery {
            asset_kind: Some(AssetKind::Instance),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["urn:aas:a", "urn:aas:c"]);
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn test_dangling_reference_fails_the_request() {
    let repo = seeded();
    repo.insert_extension(DescriptorExtensionRow {
        descriptor_id: 3,
        extension_id: 61,
        position: 0,
        name: "broken".into(),
        value_type: None,
        value: None,
        semantic_id: Some(999),
        supplemental_semantic_ids: Vec::new(),
        refers_to: Vec::new(),
    });

    let err = assembler(&repo).get_aas_descriptor("urn:aas:c").await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_administration_with_embedded_data_specification() {
    let repo = seeded();
    repo.insert_administration(DescriptorAdministrationRow {
        descriptor_id: 2,
        version: None,
        revision: None,
        template_id: Some("urn:template".into()),
        creator: None,
        embedded_data_specifications: Some(json!({
            "references": [{
                "eds_id": 1, "reference_id": 700, "reference_type": "ExternalReference",
                "key_id": 7000, "key_type": "GlobalReference",
                "key_value":
                    "https://admin-shell.io/DataSpecificationTemplates/DataSpecificationIec61360/3/0"
            }],
            "iec61360": [{
                "eds_id": 1, "iec_id": 1, "position": 0,
                "preferred_name": [{"language": "en", "text": "Temperature"}]
            }]
        })),
    });

    let descriptor = assembler(&repo).get_aas_descriptor("urn:aas:b").await.unwrap();
    let administration = descriptor.administration.unwrap();
    assert_eq!(administration.template_id.as_deref(), Some("urn:template"));
    assert_eq!(administration.embedded_data_specifications.len(), 1);
}

// ============================================================================
// Submodel descriptors per AAS
// ============================================================================

#[tokio::test]
async fn test_submodel_pages_follow_the_cursor() {
    let repo = seeded();
    let assembler = assembler(&repo);

    let first = assembler
        .list_submodel_descriptors("urn:aas:a", 1, None)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 1);
    let nameplate = &first.items[0];
    assert_eq!(nameplate.id, "urn:sm:nameplate");
    assert_eq!(nameplate.display_name[0].text, "Nameplate");
    assert_eq!(nameplate.endpoints[0].interface, "SUBMODEL-3.0");
    assert_eq!(nameplate.semantic_id.as_ref().unwrap().chain_depth(), 1);
    assert_eq!(first.next_cursor.as_deref(), Some("urn:sm:tech"));

    let second = assembler
        .list_submodel_descriptors("urn:aas:a", 1, first.next_cursor.as_deref())
        .await
        .unwrap();
    let ids: Vec<_> = second.items.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["urn:sm:tech"]);
    assert_eq!(second.next_cursor, None);

    let all = assembler
        .list_submodel_descriptors("urn:aas:a", 0, None)
        .await
        .unwrap();
    assert_eq!(all.items.len(), 2);
    assert_eq!(all.next_cursor, None);
}

#[tokio::test]
async fn test_submodels_of_unknown_or_empty_aas_are_empty() {
    let repo = seeded();
    let assembler = assembler(&repo);

    let unknown = assembler
        .list_submodel_descriptors("urn:aas:zzz", 10, None)
        .await
        .unwrap();
    assert!(unknown.items.is_empty());
    assert_eq!(unknown.next_cursor, None);

    let empty = assembler
        .list_submodel_descriptors("urn:aas:b", 10, None)
        .await
        .unwrap();
    assert!(empty.items.is_empty());
}

#[tokio::test]
async fn test_get_submodel_descriptor_is_scoped_to_its_aas() {
    let repo = seeded();
    let assembler = assembler(&repo);

    let tech = assembler
        .get_submodel_descriptor("urn:aas:a", "urn:sm:tech")
        .await
        .unwrap();
    assert_eq!(tech.id, "urn:sm:tech");
    assert!(tech.endpoints.is_empty());
    assert!(tech.semantic_id.is_none());

    let err = assembler
        .get_submodel_descriptor("urn:aas:b", "urn:sm:tech")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));

    let err = assembler
        .get_submodel_descriptor("urn:aas:a", "urn:sm:missing")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_existence_checks() {
    let repo = seeded();
    let assembler = assembler(&repo);

    assert!(assembler.aas_descriptor_exists("urn:aas:b").await.unwrap());
    assert!(!assembler.aas_descriptor_exists("urn:aas:zzz").await.unwrap());

    assert!(assembler
        .submodel_descriptor_exists("urn:aas:a", "urn:sm:nameplate")
        .await
        .unwrap());
    assert!(!assembler
        .submodel_descriptor_exists("urn:aas:c", "urn:sm:nameplate")
        .await
        .unwrap());
    assert!(!assembler
        .submodel_descriptor_exists("urn:aas:zzz", "urn:sm:nameplate")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_unbounded_page_limit_does_not_overflow() {
    let repo = seeded();
    let shared = Arc::new(repo.clone());
    let hydration = HydrationConfig {
        max_page_limit: usize::MAX,
        ..HydrationConfig::default()
    };
    let page = DescriptorAssembler::new(shared.clone(), shared, hydration)
        .list_aas_descriptors(&DescriptorPageQuery {
            limit: usize::MAX,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.next_cursor, None);
}
