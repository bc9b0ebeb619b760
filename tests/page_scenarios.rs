// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use overtext::config::EngineConfig;
use overtext::dom::{parse_html, Document};
use overtext::edit::{ClickEvent, Disposition, EditController, EditSurface, KeyInput};
use overtext::model::PageKey;
use overtext::reconcile::{Reconciler, SharedDocument};
use overtext::store::{FileStore, OverrideStore};
use overtext::synthesis::synthesize;

const PAGE_URL: &str = "https://shop.example.com/landing?utm=1";

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "overtext-it-{prefix}-{}-{n}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

struct NoSurface;

impl EditSurface for NoSurface {
    fn open(&mut self, _target: overtext::dom::NodeId, _initial_text: &str) {}
    fn close(&mut self) {}
}

fn read_page(name: &str) -> Document {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("pages")
        .join(name);
    let html =
        fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read {path:?}: {err}"));
    parse_html(&html).unwrap_or_else(|err| panic!("failed to parse {name}: {err}"))
}

fn load(name: &str, store: &OverrideStore) -> Reconciler {
    let document: SharedDocument = Arc::new(tokio::sync::Mutex::new(read_page(name)));
    Reconciler::new(
        document,
        store.clone(),
        PageKey::from_url(PAGE_URL),
        EngineConfig::default(),
    )
}

async fn text_at(reconciler: &Reconciler, selector: &str) -> Option<String> {
    let doc = reconciler.document().lock().await;
    let node = doc.query_selector(selector).expect("valid selector")?;
    Some(doc.text_content(node))
}

#[tokio::test]
async fn edited_hero_survives_a_reload() {
    let dir = TempDir::new("hero");
    let store = OverrideStore::new(Arc::new(FileStore::new(dir.path())));

    let first = load("hero.html", &store);
    assert!(first.init().await.skipped.is_empty());
    let hero = {
        let doc = first.document().lock().await;
        doc.query_selector(".hero").expect("query").expect("hero")
    };

    let mut controller = EditController::new(first.clone(), Box::new(NoSurface));
    controller.enable();
    let clicked = controller
        .on_click(ClickEvent {
            target: hero,
            within_edit_ui: false,
        })
        .await;
    assert_eq!(clicked, Disposition::Consumed);
    assert_eq!(controller.draft(), Some("Hello"));
    controller.set_draft("World");
    let committed = controller.on_key(&KeyInput::new("Enter").with_meta()).await;
    assert_eq!(committed, Disposition::Consumed);
    assert_eq!(
        text_at(&first, "span[data-testid=\"hero\"]").await.as_deref(),
        Some("World")
    );
    first.stop_observing().await;
    drop(controller);
    drop(first);

    let reloaded = load("hero.html", &store);
    let report = reloaded.init().await;
    assert_eq!(report.applied, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(
        text_at(&reloaded, "span[data-testid=\"hero\"]").await.as_deref(),
        Some("World")
    );
    assert!(reloaded.is_observing());

    let doc = reloaded.document().lock().await;
    let root = doc.document_element().expect("html");
    assert!(doc
        .attribute(root, "class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == "ot-unhide")));
    assert!(doc.element_by_id("overtext-mask-style").is_none());
    drop(doc);
    reloaded.stop_observing().await;
}

#[tokio::test]
async fn overrides_orphaned_by_a_redesign_are_masked() {
    let dir = TempDir::new("redesign");
    let store = OverrideStore::new(Arc::new(FileStore::new(dir.path())));
    let key = PageKey::from_url(PAGE_URL);
    store.save(&key, "span[data-testid=\"hero\"]", "World").await;

    let reconciler = load("redesign.html", &store);
    let report = reconciler.apply_all().await;
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, vec!["span[data-testid=\"hero\"]".to_owned()]);

    let doc = reconciler.document().lock().await;
    let style = doc
        .element_by_id("overtext-mask-style")
        .expect("mask style");
    assert_eq!(doc.parent_element(style), doc.head());
    assert_eq!(
        doc.text_content(style),
        "span[data-testid=\"hero\"], span[data-testid=\"hero\"] * { color: transparent !important; }"
    );
    let banner = doc.query_selector(".banner").expect("query").expect("banner");
    assert_eq!(doc.text_content(banner), "Hello");
}

#[test]
fn positional_siblings_get_distinct_unique_selectors() {
    let doc = read_page("siblings.html");
    let config = EngineConfig::default().synthesis();
    let items = doc.query_selector_all("section li").expect("query");
    assert_eq!(items.len(), 3);

    let selectors: Vec<String> = items
        .iter()
        .map(|item| synthesize(&doc, *item, &config))
        .collect();
    for (item, selector) in items.iter().zip(&selectors) {
        assert_eq!(doc.count_matches(selector).expect("count"), 1, "{selector}");
        assert_eq!(doc.query_selector(selector).expect("query"), Some(*item));
    }
    let mut deduped = selectors.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), 3, "{selectors:?}");
}
