// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Decoding of aggregated lang-string JSON (`[{id, language, text}, ...]`)
//! and of flat lang-string rows.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::lang_string::LangString;
use crate::domain::repository::RepositoryError;
use crate::domain::rows::LangStringRow;

#[derive(Debug, Deserialize)]
struct LangStringEntry {
    #[serde(default)]
    id: Option<i64>,
    language: String,
    text: String,
}

/// Decode a lang-string aggregate. `None` and JSON `null` yield an empty list.
/// Entries are returned in row-id order when ids are present.
pub fn parse_lang_strings<T: LangString>(raw: Option<&Value>) -> Result<Vec<T>, RepositoryError> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };

    let mut entries: Vec<LangStringEntry> = serde_json::from_value(raw.clone())
        .map_err(|e| RepositoryError::MalformedPayload(format!("lang strings: {e}")))?;
    entries.sort_by_key(|e| e.id.unwrap_or(i64::MAX));

    Ok(entries
        .into_iter()
        .map(|e| T::from_parts(e.language, e.text))
        .collect())
}

/// Group flat lang-string rows by descriptor id, in row-id order. Every id of
/// `parent_ids` gets an entry.
pub fn group_lang_string_rows<T: LangString>(
    parent_ids: &[i64],
    mut rows: Vec<LangStringRow>,
) -> HashMap<i64, Vec<T>> {
    rows.sort_by_key(|r| (r.descriptor_id, r.row_id));

    let mut grouped: HashMap<i64, Vec<T>> =
        parent_ids.iter().map(|id| (*id, Vec::new())).collect();
    for row in rows {
        grouped
            .entry(row.descriptor_id)
            .or_default()
            .push(T::from_parts(row.language, row.text));
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lang_string::{LangStringNameType, LangStringTextType};
    use serde_json::json;

    #[test]
    fn test_parse_orders_by_id() {
        let raw = json!([
            {"id": 9, "language": "de", "text": "Temperatur"},
            {"id": 3, "language": "en", "text": "Temperature"}
        ]);
        let parsed: Vec<LangStringTextType> = parse_lang_strings(Some(&raw)).unwrap();
        assert_eq!(parsed[0].language, "en");
        assert_eq!(parsed[1].text, "Temperatur");
    }

    #[test]
    fn test_null_is_empty() {
        let parsed: Vec<LangStringNameType> = parse_lang_strings(Some(&Value::Null)).unwrap();
        assert!(parsed.is_empty());
        let parsed: Vec<LangStringNameType> = parse_lang_strings(None).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let raw = json!({"language": "en"});
        let err = parse_lang_strings::<LangStringTextType>(Some(&raw)).unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedPayload(_)));
    }

    #[test]
    fn test_group_rows_fills_missing_parents() {
        let rows = vec![LangStringRow {
            descriptor_id: 1,
            row_id: 1,
            language: "en".into(),
            text: "Pump".into(),
        }];
        let grouped: HashMap<i64, Vec<LangStringNameType>> = group_lang_string_rows(&[1, 2], rows);
        assert_eq!(grouped[&1].len(), 1);
        assert!(grouped[&2].is_empty());
    }
}
