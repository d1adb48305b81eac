// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Localized string value objects (`LangStringTextType`, `LangStringNameType`
//! and the IEC 61360 variants). All share the `{language, text}` shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringTextType {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringNameType {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringPreferredNameTypeIec61360 {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringShortNameTypeIec61360 {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangStringDefinitionTypeIec61360 {
    pub language: String,
    pub text: String,
}

/// Common constructor over the `{language, text}` shapes.
pub trait LangString: Sized {
    fn from_parts(language: String, text: String) -> Self;
}

impl LangString for LangStringTextType {
    fn from_parts(language: String, text: String) -> Self {
        Self { language, text }
    }
}

impl LangString for LangStringNameType {
    fn from_parts(language: String, text: String) -> Self {
        Self { language, text }
    }
}

/// Which lang-string table a bulk fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangStringKind {
    Description,
    DisplayName,
}
