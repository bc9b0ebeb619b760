// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use overtext::dom::{parse_html, Document};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("overtext_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// Repeated `<section class="card">` blocks under `<main>`.
    pub sections: usize,
    /// `<li>` items per section; none carry ids or stable attributes.
    pub items_per_section: usize,
    /// Every n-th item gets a `data-testid`; 0 disables.
    pub testid_every: usize,
    /// Extra `<div>` wrappers around each section's list.
    pub wrapper_depth: usize,
}

impl PageParams {
    pub const fn new(
        sections: usize,
        items_per_section: usize,
        testid_every: usize,
        wrapper_depth: usize,
    ) -> Self {
        Self {
            sections,
            items_per_section,
            testid_every,
            wrapper_depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Small,
    MediumNested,
    LargeAnonymous,
}

impl Case {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::MediumNested => "medium_nested",
            Self::LargeAnonymous => "large_anonymous",
        }
    }

    pub const fn params(self) -> PageParams {
        match self {
            Self::Small => PageParams::new(4, 8, 3, 0),
            Self::MediumNested => PageParams::new(20, 20, 5, 2),
            Self::LargeAnonymous => PageParams::new(80, 40, 0, 3),
        }
    }
}

/// Deterministic page generator.
///
/// Sections share tag and classes so anonymous items need positional, multi-level selectors.
pub fn page_html(params: PageParams) -> String {
    let mut out = String::from("<html><head><title>bench</title></head><body><main>");
    for section in 0..params.sections {
        out.push_str("<section class=\"card\">");
        for _ in 0..params.wrapper_depth {
            out.push_str("<div class=\"wrap\">");
        }
        out.push_str("<ul>");
        for item in 0..params.items_per_section {
            let flat = section * params.items_per_section + item;
            if params.testid_every > 0 && flat % params.testid_every == 0 {
                let _ = write!(out, "<li data-testid=\"item-{flat}\">item {flat}</li>");
            } else {
                let _ = write!(out, "<li>item {flat}</li>");
            }
        }
        out.push_str("</ul>");
        for _ in 0..params.wrapper_depth {
            out.push_str("</div>");
        }
        out.push_str("</section>");
    }
    out.push_str("</main></body></html>");
    out
}

pub fn fixture(case: Case) -> Document {
    parse_html(&page_html(case.params())).expect("fixture page parses")
}
