// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure layer: row builders, storage adapters and process setup.

pub mod builders;
pub mod db;
pub mod repositories;
pub mod telemetry;
