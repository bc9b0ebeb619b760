// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Override reconciliation.
//!
//! The [`Reconciler`] owns the mapping from a page's persisted overrides onto the live document:
//! it applies every override it can resolve, masks the ones it cannot, and re-runs whenever the
//! document's body mutates (debounced). A pass never fails; unresolvable or invalid selectors
//! are reported as skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::dom::{
    split_selector_list, Document, MutationRecord, NodeId, ObserveOptions, ObserverId,
};
use crate::model::{OverrideList, PageKey};
use crate::store::OverrideStore;

/// The page document shared between the reconciler, the edit controller and the host.
pub type SharedDocument = Arc<tokio::sync::Mutex<Document>>;

const MASK_DECLARATION: &str = "color: transparent !important;";

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Overrides whose selector resolved to a node.
    pub applied: usize,
    /// Selectors that matched nothing or could not be evaluated, in list order.
    pub skipped: Vec<String>,
}

#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

struct Inner {
    document: SharedDocument,
    store: OverrideStore,
    page: PageKey,
    config: EngineConfig,
    observation: Mutex<Option<Observation>>,
    passes: AtomicU64,
}

struct Observation {
    observer: ObserverId,
    task: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = match self.observation.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(observation) = slot.take() {
            observation.task.abort();
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("page", &self.inner.page)
            .field("observing", &self.is_observing())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        document: SharedDocument,
        store: OverrideStore,
        page: PageKey,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                document,
                store,
                page,
                config,
                observation: Mutex::new(None),
                passes: AtomicU64::new(0),
            }),
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.inner.document
    }

    pub fn store(&self) -> &OverrideStore {
        &self.inner.store
    }

    pub fn page(&self) -> &PageKey {
        &self.inner.page
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Number of [`Reconciler::apply_all`] passes run so far, including debounced ones.
    pub fn pass_count(&self) -> u64 {
        self.inner.passes.load(Ordering::Relaxed)
    }

    /// Loads the page's overrides and applies each one to the first node its selector resolves
    /// to, then rewrites the mask from whatever was skipped. Idempotent.
    pub async fn apply_all(&self) -> ApplyReport {
        let list = self.inner.store.load(&self.inner.page).await;
        self.apply_list(&list).await
    }

    async fn apply_list(&self, list: &OverrideList) -> ApplyReport {
        self.inner.passes.fetch_add(1, Ordering::Relaxed);
        let mut doc = self.inner.document.lock().await;
        let report = apply_overrides(&mut doc, list);
        write_mask(&mut doc, &self.inner.config.mask_style_id, &report.skipped);
        tracing::debug!(
            page = %self.inner.page,
            applied = report.applied,
            skipped = report.skipped.len(),
            "reconciliation pass"
        );
        report
    }

    /// Page-load entry point: masks every persisted selector up front (unless a mask is already
    /// present), applies, reveals the document and starts observing if there is anything to
    /// keep applied.
    pub async fn init(&self) -> ApplyReport {
        let list = self.inner.store.load(&self.inner.page).await;
        {
            let mut doc = self.inner.document.lock().await;
            let mask_id = &self.inner.config.mask_style_id;
            if doc.element_by_id(mask_id).is_none() {
                let selectors: Vec<String> = list.selectors().map(str::to_owned).collect();
                write_mask(&mut doc, mask_id, &selectors);
            }
        }

        let report = self.apply_list(&list).await;

        {
            let mut doc = self.inner.document.lock().await;
            if let Some(root) = doc.document_element() {
                doc.add_class(root, &self.inner.config.reveal_class);
            }
        }

        if !list.is_empty() {
            self.start_observing().await;
        }
        tracing::info!(
            page = %self.inner.page,
            applied = report.applied,
            skipped = report.skipped.len(),
            "overrides initialised"
        );
        report
    }

    pub fn is_observing(&self) -> bool {
        self.observation_slot().is_some()
    }

    /// Watches the body for child-list, subtree and character-data mutations, re-applying after
    /// each burst. Does nothing when the page has no overrides. Returns whether observation is
    /// active afterwards.
    pub async fn start_observing(&self) -> bool {
        if self.is_observing() {
            return true;
        }
        if self.inner.store.load(&self.inner.page).await.is_empty() {
            return false;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut doc = self.inner.document.lock().await;
        if self.is_observing() {
            return true;
        }
        let Some(body) = doc.body() else {
            tracing::debug!(page = %self.inner.page, "no body to observe");
            return false;
        };
        let observer = doc.observe(
            body,
            ObserveOptions {
                child_list: true,
                subtree: true,
                character_data: true,
            },
            sender,
        );
        drop(doc);

        let task = tokio::spawn(run_debounced(
            Arc::downgrade(&self.inner),
            receiver,
            self.inner.config.debounce(),
        ));
        *self.observation_slot() = Some(Observation { observer, task });
        tracing::info!(page = %self.inner.page, "observing document mutations");
        true
    }

    pub async fn stop_observing(&self) {
        let Some(observation) = self.observation_slot().take() else {
            return;
        };
        observation.task.abort();
        self.inner
            .document
            .lock()
            .await
            .disconnect(observation.observer);
        tracing::info!(page = %self.inner.page, "stopped observing document mutations");
    }

    fn observation_slot(&self) -> std::sync::MutexGuard<'_, Option<Observation>> {
        self.inner
            .observation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The first record of a burst opens a quiet window; everything arriving before it closes is
/// folded into the same pass.
async fn run_debounced(
    inner: Weak<Inner>,
    mut receiver: UnboundedReceiver<MutationRecord>,
    delay: Duration,
) {
    while receiver.recv().await.is_some() {
        tokio::time::sleep(delay).await;
        while receiver.try_recv().is_ok() {}

        let Some(inner) = inner.upgrade() else {
            break;
        };
        Reconciler { inner }.apply_all().await;
    }
}

fn resolve_first(doc: &Document, selector: &str) -> Option<NodeId> {
    match doc.query_selector(selector) {
        Ok(found) => found,
        Err(err) => {
            tracing::debug!(%selector, %err, "override selector is invalid");
            None
        }
    }
}

fn apply_overrides(doc: &mut Document, list: &OverrideList) -> ApplyReport {
    let mut report = ApplyReport::default();
    for record in list {
        let Some(node) = resolve_first(doc, &record.selector) else {
            tracing::debug!(selector = %record.selector, "override target not found");
            report.skipped.push(record.selector.clone());
            continue;
        };
        if doc.text_content(node) != record.text {
            doc.set_text_content(node, &record.text);
        }
        if doc.style_property(node, "color") != Some(("inherit".to_owned(), true)) {
            doc.set_style_property(node, "color", "inherit", true);
        }
        report.applied += 1;
    }
    report
}

/// Renders the masking rules for `selectors`, one per line. Each member of a selector list gets
/// its own descendant clause.
pub fn mask_css(selectors: &[String]) -> String {
    selectors
        .iter()
        .map(|selector| {
            let targets = split_selector_list(selector)
                .into_iter()
                .map(|member| format!("{member}, {member} *"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{targets} {{ {MASK_DECLARATION} }}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Creates, rewrites or removes the mask style element so it hides exactly `selectors`.
pub fn write_mask(doc: &mut Document, style_id: &str, selectors: &[String]) {
    let existing = doc.element_by_id(style_id);
    if selectors.is_empty() {
        if let Some(style) = existing {
            doc.remove(style);
        }
        return;
    }

    let style = match existing {
        Some(style) => style,
        None => {
            let Some(parent) = doc.head().or_else(|| doc.document_element()) else {
                return;
            };
            let style = doc.create_element("style");
            doc.set_attribute(style, "id", style_id);
            if let Err(err) = doc.append_child(parent, style) {
                tracing::warn!(%err, "failed to insert mask style");
                return;
            }
            style
        }
    };

    let css = mask_css(selectors);
    if doc.text_content(style) != css {
        doc.set_text_content(style, &css);
    }
}
