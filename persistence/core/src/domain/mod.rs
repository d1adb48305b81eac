// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! AAS metamodel aggregates, row contracts and repository ports.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types shared by the hydration builders and services

pub mod config;
pub mod data_specification;
pub mod data_type;
pub mod descriptor;
pub mod extension;
pub mod lang_string;
pub mod reference;
pub mod repository;
pub mod rows;
pub mod submodel_element;
