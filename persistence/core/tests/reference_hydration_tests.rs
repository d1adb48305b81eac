// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for batch reference hydration.
//!
//! Exercises `ReferenceBatchFetcher` against `InMemoryAasRepository`:
//! - chain depth and key order of hydrated references
//! - batch completeness (absent ids, duplicates, empty input)
//! - data-integrity failures in stored chains

use std::sync::Arc;

use aas_persistence_core::application::ReferenceBatchFetcher;
use aas_persistence_core::domain::reference::{KeyTypes, ReferenceTypes};
use aas_persistence_core::domain::repository::RepositoryError;
use aas_persistence_core::infrastructure::repositories::InMemoryAasRepository;

fn fetcher(repo: &InMemoryAasRepository) -> ReferenceBatchFetcher {
    ReferenceBatchFetcher::new(Arc::new(repo.clone()))
}

#[tokio::test]
async fn test_three_level_chain() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(
        100,
        ReferenceTypes::ExternalReference,
        &[(1, KeyTypes::GlobalReference, "urn:root")],
    );
    repo.insert_referred_reference(
        101,
        ReferenceTypes::ModelReference,
        100,
        100,
        &[(2, KeyTypes::ConceptDescription, "urn:mid")],
    );
    repo.insert_referred_reference(
        102,
        ReferenceTypes::ExternalReference,
        101,
        100,
        &[(3, KeyTypes::GlobalReference, "urn:leaf")],
    );

    let references = fetcher(&repo).build_references_batch(&[100]).await.unwrap();

    let root = &references[&100];
    assert_eq!(root.reference_type, ReferenceTypes::ExternalReference);
    assert_eq!(root.keys[0].value, "urn:root");
    assert_eq!(root.chain_depth(), 2);

    let mid = root.referred_semantic_id.as_deref().unwrap();
    assert_eq!(mid.reference_type, ReferenceTypes::ModelReference);
    assert_eq!(mid.keys[0].value, "urn:mid");

    let leaf = mid.referred_semantic_id.as_deref().unwrap();
    assert_eq!(leaf.keys[0].value, "urn:leaf");
    assert!(leaf.referred_semantic_id.is_none());
}

#[tokio::test]
async fn test_keys_keep_key_row_order() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(
        7,
        ReferenceTypes::ModelReference,
        &[
            (30, KeyTypes::Property, "temperature"),
            (10, KeyTypes::Submodel, "urn:sm"),
            (20, KeyTypes::SubmodelElementCollection, "sensors"),
        ],
    );

    let references = fetcher(&repo).build_references_batch(&[7]).await.unwrap();
    let values: Vec<_> = references[&7].keys.iter().map(|k| k.value.as_str()).collect();
    assert_eq!(values, vec!["urn:sm", "sensors", "temperature"]);
}

#[tokio::test]
async fn test_batch_skips_absent_and_collapses_duplicates() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(
        1,
        ReferenceTypes::ExternalReference,
        &[(11, KeyTypes::GlobalReference, "a")],
    );
    repo.insert_reference(2, ReferenceTypes::ExternalReference, &[]);

    let references = fetcher(&repo)
        .build_references_batch(&[2, 1, 2, 99])
        .await
        .unwrap();

    assert_eq!(references.len(), 2);
    assert!(references[&2].keys.is_empty());
    assert!(!references.contains_key(&99));
}

#[tokio::test]
async fn test_empty_input_and_no_roots() {
    let repo = InMemoryAasRepository::new();
    assert!(fetcher(&repo).build_references_batch(&[]).await.unwrap().is_empty());
    assert!(fetcher(&repo).build_references_batch(&[5, 6]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chains_do_not_leak_between_roots() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(100, ReferenceTypes::ExternalReference, &[]);
    repo.insert_referred_reference(101, ReferenceTypes::ModelReference, 100, 100, &[]);
    repo.insert_reference(200, ReferenceTypes::ExternalReference, &[]);

    let references = fetcher(&repo).build_references_batch(&[100, 200]).await.unwrap();
    assert_eq!(references[&100].chain_depth(), 1);
    assert_eq!(references[&200].chain_depth(), 0);
}

#[tokio::test]
async fn test_branching_chain_is_invariant_violation() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(100, ReferenceTypes::ExternalReference, &[]);
    repo.insert_referred_reference(101, ReferenceTypes::ModelReference, 100, 100, &[]);
    repo.insert_referred_reference(102, ReferenceTypes::ModelReference, 100, 100, &[]);

    let err = fetcher(&repo).build_references_batch(&[100]).await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvariantViolation(_)));
}

#[tokio::test]
async fn test_missing_parent_is_not_found() {
    let repo = InMemoryAasRepository::new();
    repo.insert_reference(100, ReferenceTypes::ExternalReference, &[]);
    repo.insert_referred_reference(102, ReferenceTypes::ModelReference, 555, 100, &[]);

    let err = fetcher(&repo).build_references_batch(&[100]).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}
