// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reference Builder
//!
//! Builds one [`Reference`] and its `referredSemanticId` chain from rows keyed
//! by transient row ids.
//!
//! Descendants are held in an arena (`Vec<ReferenceNode>`) indexed by a
//! `row id -> slot` map. Each node records only its parent's row id; linking
//! happens once, in [`ReferenceBuilder::build_nested_structure`], by resolving
//! parent ids to slots and folding the chain from the leaf upwards. No node is
//! reachable from another until that final pass.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::domain::reference::{Key, KeyTypes, Reference, ReferenceTypes};
use crate::domain::repository::RepositoryError;

#[derive(Debug)]
struct ReferenceNode {
    row_id: i64,
    parent_row_id: i64,
    reference_type: ReferenceTypes,
    keys: Vec<Key>,
    applied_key_ids: HashSet<i64>,
}

impl ReferenceNode {
    fn new(row_id: i64, parent_row_id: i64, reference_type: ReferenceTypes) -> Self {
        Self {
            row_id,
            parent_row_id,
            reference_type,
            keys: Vec::new(),
            applied_key_ids: HashSet::new(),
        }
    }

    fn apply_key(&mut self, key_row_id: i64, key_type: KeyTypes, value: String) {
        if self.applied_key_ids.insert(key_row_id) {
            self.keys.push(Key::new(key_type, value));
        }
    }

    fn into_reference(self) -> Reference {
        Reference {
            reference_type: self.reference_type,
            keys: self.keys,
            referred_semantic_id: None,
        }
    }
}

#[derive(Debug)]
pub struct ReferenceBuilder {
    root_id: i64,
    root_type: ReferenceTypes,
    root_keys: Vec<Key>,
    applied_key_ids: HashSet<i64>,
    nodes: Vec<ReferenceNode>,
    slots: HashMap<i64, usize>,
    /// Child slot wired directly below the root, if any.
    root_child: Option<usize>,
}

impl ReferenceBuilder {
    pub fn new(root_id: i64, reference_type: ReferenceTypes) -> Self {
        Self {
            root_id,
            root_type: reference_type,
            root_keys: Vec::new(),
            applied_key_ids: HashSet::new(),
            nodes: Vec::new(),
            slots: HashMap::new(),
            root_child: None,
        }
    }

    pub fn root_id(&self) -> i64 {
        self.root_id
    }

    pub fn descendant_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a key to the root unless `key_row_id` was already applied.
    pub fn create_key(&mut self, key_row_id: i64, key_type: KeyTypes, value: impl Into<String>) {
        if self.applied_key_ids.insert(key_row_id) {
            self.root_keys.push(Key::new(key_type, value));
        }
    }

    /// Register a descendant. Re-registering a known row id is a no-op.
    ///
    /// A descendant whose parent is the root occupies the root's
    /// `referredSemanticId` slot immediately; any other is linked when the
    /// structure is built.
    pub fn create_referred_semantic_id(
        &mut self,
        child_row_id: i64,
        parent_row_id: i64,
        reference_type: ReferenceTypes,
    ) -> Result<(), RepositoryError> {
        if child_row_id == self.root_id || self.slots.contains_key(&child_row_id) {
            return Ok(());
        }

        let below_root = parent_row_id == self.root_id;
        if let (true, Some(existing)) = (below_root, self.root_child) {
            return Err(RepositoryError::InvariantViolation(format!(
                "reference {} has two referred semantic ids ({} and {})",
                self.root_id, self.nodes[existing].row_id, child_row_id
            )));
        }

        let slot = self.nodes.len();
        self.nodes
            .push(ReferenceNode::new(child_row_id, parent_row_id, reference_type));
        self.slots.insert(child_row_id, slot);
        if below_root {
            self.root_child = Some(slot);
        }

        Ok(())
    }

    /// Append a key to a registered descendant.
    pub fn create_referred_semantic_id_key(
        &mut self,
        child_row_id: i64,
        key_row_id: i64,
        key_type: KeyTypes,
        value: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let slot = *self.slots.get(&child_row_id).ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "referred reference {} is not registered under root {}",
                child_row_id, self.root_id
            ))
        })?;
        self.nodes[slot].apply_key(key_row_id, key_type, value.into());
        Ok(())
    }

    /// Link every descendant into its parent's `referredSemanticId` slot and
    /// return the finished root. Consumes the builder.
    pub fn build_nested_structure(self) -> Result<Reference, RepositoryError> {
        let root_id = self.root_id;

        // parent slot -> child slot, for descendants below another descendant
        let mut child_of: HashMap<usize, usize> = HashMap::new();
        for (slot, node) in self.nodes.iter().enumerate() {
            if node.parent_row_id == root_id {
                continue;
            }
            let parent_slot = *self.slots.get(&node.parent_row_id).ok_or_else(|| {
                RepositoryError::NotFound(format!(
                    "parent {} of referred reference {} is missing under root {}",
                    node.parent_row_id, node.row_id, root_id
                ))
            })?;
            if let Some(previous) = child_of.insert(parent_slot, slot) {
                return Err(RepositoryError::InvariantViolation(format!(
                    "referred reference {} has two children ({} and {}) under root {}",
                    node.parent_row_id, self.nodes[previous].row_id, node.row_id, root_id
                )));
            }
        }

        let mut chain = Vec::new();
        let mut cursor = self.root_child;
        while let Some(slot) = cursor {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(slot);
            cursor = child_of.get(&slot).copied();
        }

        if chain.len() < self.nodes.len() {
            warn!(
                root_id,
                linked = chain.len(),
                registered = self.nodes.len(),
                "Dropping referred references unreachable from their root"
            );
        }

        let mut nodes: Vec<Option<ReferenceNode>> = self.nodes.into_iter().map(Some).collect();
        let mut nested: Option<Box<Reference>> = None;
        for slot in chain.into_iter().rev() {
            let Some(node) = nodes[slot].take() else {
                continue;
            };
            let mut reference = node.into_reference();
            reference.referred_semantic_id = nested.take();
            nested = Some(Box::new(reference));
        }

        Ok(Reference {
            reference_type: self.root_type,
            keys: self.root_keys,
            referred_semantic_id: nested,
        })
    }
}
