// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Administrative information of descriptors.

use crate::domain::data_specification::AdministrativeInformation;
use crate::domain::reference::Reference;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::{DescriptorAdministrationRow, EmbeddedDataSpecificationRows};
use crate::infrastructure::builders::non_empty;
use crate::infrastructure::builders::EmbeddedDataSpecificationBuilder;

/// Build administrative information from its row and the already hydrated
/// creator reference.
pub fn build_administration(
    row: DescriptorAdministrationRow,
    creator: Option<Reference>,
) -> Result<AdministrativeInformation, RepositoryError> {
    let embedded_data_specifications = match row.embedded_data_specifications {
        Some(raw) if !raw.is_null() => {
            let rows: EmbeddedDataSpecificationRows = serde_json::from_value(raw).map_err(|e| {
                RepositoryError::MalformedPayload(format!(
                    "administration of descriptor {}: {e}",
                    row.descriptor_id
                ))
            })?;
            let mut builder = EmbeddedDataSpecificationBuilder::new();
            builder.add_rows(&rows)?;
            builder.build()?
        }
        _ => Vec::new(),
    };

    Ok(AdministrativeInformation {
        embedded_data_specifications,
        version: non_empty(row.version),
        revision: non_empty(row.revision),
        creator,
        template_id: non_empty(row.template_id),
    })
}
