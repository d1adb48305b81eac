// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Row-to-aggregate builders
//!
//! Pure, synchronous builders that turn flat rows into domain aggregates.
//! Every builder owns its reference pool and finalizes it exactly once in
//! `build()`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Hydrate references, child collections and elements from rows

pub mod administration;
pub mod embedded_data_specification_builder;
pub mod extension_builder;
pub mod lang_string;
pub mod qualifier_builder;
pub mod reference_builder;
pub mod reference_pool;
pub mod submodel_element_builder;

pub use embedded_data_specification_builder::EmbeddedDataSpecificationBuilder;
pub use extension_builder::ExtensionBuilder;
pub use qualifier_builder::QualifierBuilder;
pub use reference_builder::ReferenceBuilder;
pub use reference_pool::{ReferencePool, ResolvedReferences};
pub use submodel_element_builder::build_submodel_element;

/// Empty strings are stored for absent optional text columns.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn push_distinct(target: &mut Vec<i64>, handles: Vec<i64>) {
    for handle in handles {
        if !target.contains(&handle) {
            target.push(handle);
        }
    }
}

/// Order `(position, row id, entity)` entries by position, then row id.
pub(crate) fn sort_by_position<T>(mut entries: Vec<(i32, i64, T)>) -> Vec<T> {
    entries.sort_by_key(|(position, row_id, _)| (*position, *row_id));
    entries.into_iter().map(|(_, _, entity)| entity).collect()
}
