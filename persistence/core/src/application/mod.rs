// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod descriptor_assembler;
pub mod reference_batch;
pub mod submodel_element_reader;

// Re-export services for convenience
pub use descriptor_assembler::DescriptorAssembler;
pub use reference_batch::ReferenceBatchFetcher;
pub use submodel_element_reader::SubmodelElementReader;
