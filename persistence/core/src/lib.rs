// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AAS Persistence Core
//!
//! Object-graph hydration engine for Asset Administration Shell storage:
//! rebuilds reference chains, polymorphic submodel elements and registry
//! descriptors from flat relational rows.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Hydrate typed AAS aggregates from batched row fetches

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
