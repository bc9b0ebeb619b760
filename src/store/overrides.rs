// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{OverrideList, OverrideRecord, PageKey};

use super::kv::{KeyValueStore, StoreError};

/// Accessor for per-page override lists.
///
/// Never fails towards the caller: unreadable or malformed data loads as an empty list and
/// failed writes are logged and dropped. The empty [`PageKey`] turns every operation into a
/// no-op. There is no concurrency control; the last write wins.
#[derive(Clone)]
pub struct OverrideStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for OverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideStore").finish_non_exhaustive()
    }
}

impl OverrideStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub async fn load(&self, key: &PageKey) -> OverrideList {
        if key.is_empty() {
            return OverrideList::new();
        }
        match self.backend.get(key.as_str()).await {
            Ok(Some(value)) => OverrideList::from_value(&value).unwrap_or_else(|| {
                tracing::debug!(%key, "stored overrides are not a list; treating as empty");
                OverrideList::new()
            }),
            Ok(None) => OverrideList::new(),
            Err(err) => {
                tracing::warn!(%key, %err, "failed to load overrides");
                OverrideList::new()
            }
        }
    }

    /// Upserts `{selector, text}` with a fresh timestamp.
    pub async fn save(&self, key: &PageKey, selector: &str, text: &str) {
        if key.is_empty() {
            return;
        }
        let mut list = self.load(key).await;
        list.upsert(OverrideRecord::new(selector, text, now_millis()));
        self.write(key, &list).await;
    }

    pub async fn delete(&self, key: &PageKey, selector: &str) {
        if key.is_empty() {
            return;
        }
        let mut list = self.load(key).await;
        list.remove(selector);
        self.write(key, &list).await;
    }

    pub async fn clear(&self, key: &PageKey) {
        if key.is_empty() {
            return;
        }
        self.write(key, &OverrideList::new()).await;
    }

    async fn write(&self, key: &PageKey, list: &OverrideList) {
        if let Err(err) = self.try_write(key, list).await {
            tracing::warn!(%key, %err, "failed to persist overrides");
        }
    }

    async fn try_write(&self, key: &PageKey, list: &OverrideList) -> Result<(), StoreError> {
        let value = list.to_value().map_err(StoreError::Encode)?;
        self.backend.set(key.as_str(), value).await?;
        tracing::debug!(%key, count = list.len(), "persisted overrides");
        Ok(())
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
