// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted replacement: render `text` inside the element `selector` resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub selector: String,
    pub text: String,
    /// Milliseconds since the Unix epoch at save time.
    pub timestamp: i64,
}

impl OverrideRecord {
    pub fn new(selector: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// The overrides of one page, in insertion order. Selectors are unique within a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideList {
    records: Vec<OverrideRecord>,
}

impl OverrideList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient decoding of a stored value: anything but an array is `None`, and array entries
    /// that are not records are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_array()?;
        let mut list = Self::new();
        for entry in entries {
            match OverrideRecord::deserialize(entry) {
                Ok(record) => list.upsert(record),
                Err(err) => tracing::debug!(%err, "dropping malformed override entry"),
            }
        }
        Some(list)
    }

    /// The stored shape: a plain array of records.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OverrideRecord> {
        self.records.iter()
    }

    pub fn get(&self, selector: &str) -> Option<&OverrideRecord> {
        self.records.iter().find(|record| record.selector == selector)
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|record| record.selector.as_str())
    }

    /// Removes any record with the same selector, then appends `record`.
    pub fn upsert(&mut self, record: OverrideRecord) {
        self.remove(&record.selector);
        self.records.push(record);
    }

    /// Returns whether a record was removed.
    pub fn remove(&mut self, selector: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.selector != selector);
        before != self.records.len()
    }

    /// Display order: newest first, ties in insertion order.
    pub fn recent_first(&self) -> Vec<&OverrideRecord> {
        let mut out: Vec<&OverrideRecord> = self.records.iter().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }
}

impl<'a> IntoIterator for &'a OverrideList {
    type Item = &'a OverrideRecord;
    type IntoIter = std::slice::Iter<'a, OverrideRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<OverrideRecord> for OverrideList {
    fn from_iter<I: IntoIterator<Item = OverrideRecord>>(iter: I) -> Self {
        let mut list = Self::new();
        for record in iter {
            list.upsert(record);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{OverrideList, OverrideRecord};

    #[test]
    fn upsert_replaces_and_moves_to_end() {
        let mut list = OverrideList::new();
        list.upsert(OverrideRecord::new("#a", "one", 1));
        list.upsert(OverrideRecord::new("#b", "two", 2));
        list.upsert(OverrideRecord::new("#a", "three", 3));

        assert_eq!(list.len(), 2);
        let selectors: Vec<&str> = list.selectors().collect();
        assert_eq!(selectors, vec!["#b", "#a"]);
        assert_eq!(list.get("#a").map(|r| r.text.as_str()), Some("three"));
    }

    #[test]
    fn remove_reports_presence() {
        let mut list: OverrideList = [OverrideRecord::new("#a", "x", 1)].into_iter().collect();
        assert!(!list.remove("#missing"));
        assert_eq!(list.len(), 1);
        assert!(list.remove("#a"));
        assert!(list.is_empty());
    }

    #[test]
    fn recent_first_is_stable_on_ties() {
        let list: OverrideList = [
            OverrideRecord::new("#old", "a", 10),
            OverrideRecord::new("#tie-1", "b", 20),
            OverrideRecord::new("#tie-2", "c", 20),
            OverrideRecord::new("#mid", "d", 15),
        ]
        .into_iter()
        .collect();

        let order: Vec<&str> = list
            .recent_first()
            .into_iter()
            .map(|r| r.selector.as_str())
            .collect();
        assert_eq!(order, vec!["#tie-1", "#tie-2", "#mid", "#old"]);
    }

    #[test]
    fn stored_shape_is_a_plain_array() {
        let list: OverrideList = [OverrideRecord::new("span[data-testid=\"hero\"]", "World", 7)]
            .into_iter()
            .collect();
        let value = list.to_value().expect("encode");
        assert_eq!(
            value,
            json!([{ "selector": "span[data-testid=\"hero\"]", "text": "World", "timestamp": 7 }])
        );
        assert_eq!(OverrideList::from_value(&value), Some(list));
    }

    #[test]
    fn from_value_is_lenient() {
        assert_eq!(OverrideList::from_value(&json!({"selector": "#a"})), None);
        assert_eq!(OverrideList::from_value(&json!("nope")), None);

        let list = OverrideList::from_value(&json!([
            { "selector": "#a", "text": "kept", "timestamp": 1 },
            { "selector": "#b" },
            42,
        ]))
        .expect("array");
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("#a").map(|r| r.text.as_str()), Some("kept"));
    }
}
