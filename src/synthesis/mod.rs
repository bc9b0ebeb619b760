// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Selector synthesis.
//!
//! Mints a selector string for an element that, on the current document, should resolve back to
//! that element. Uniqueness is best effort: strategies are tried in priority order and the
//! ancestor path is verified against the live document after every step, but the result is
//! always a string, never an error.

use smallvec::SmallVec;

use crate::config::SynthesisConfig;
use crate::dom::{css_escape, Document, NodeId};

/// Synthesis strategies in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `#id`; trusted without verification.
    HostId,
    /// `tag[data-*="value"]` / `tag[aria-*="value"]`.
    StableAttribute,
    /// Bounded climb towards the body, verified by querying the document.
    AncestorPath,
}

pub const STRATEGIES: [Strategy; 3] = [
    Strategy::HostId,
    Strategy::StableAttribute,
    Strategy::AncestorPath,
];

type Segments = SmallVec<[String; 5]>;

pub fn synthesize(doc: &Document, node: NodeId, config: &SynthesisConfig) -> String {
    synthesize_with(doc, node, config).0
}

/// Like [`synthesize`], also reporting which strategy produced the selector (`None` for the
/// terminal fallback).
pub fn synthesize_with(
    doc: &Document,
    node: NodeId,
    config: &SynthesisConfig,
) -> (String, Option<Strategy>) {
    let mut best_path = String::new();
    for strategy in STRATEGIES {
        let attempt = match strategy {
            Strategy::HostId => host_id_selector(doc, node),
            Strategy::StableAttribute => stable_attribute_selector(doc, node, config)
                .map(|attr| format!("{}{attr}", tag_of(doc, node))),
            Strategy::AncestorPath => match ancestor_path(doc, node, config) {
                PathOutcome::Unique(selector) => Some(selector),
                PathOutcome::Best(selector) => {
                    best_path = selector;
                    None
                }
            },
        };
        if let Some(selector) = attempt {
            tracing::debug!(?strategy, %selector, "synthesized selector");
            return (selector, Some(strategy));
        }
    }

    let fallback = if best_path.is_empty() {
        tag_of(doc, node).to_owned()
    } else {
        best_path
    };
    tracing::debug!(selector = %fallback, "selector not verified unique");
    (fallback, None)
}

fn tag_of(doc: &Document, node: NodeId) -> &str {
    doc.tag_name(node).unwrap_or("*")
}

fn host_id_selector(doc: &Document, node: NodeId) -> Option<String> {
    let id = doc.element(node)?.id()?;
    Some(format!("#{}", css_escape(id)))
}

/// `[name="value"]` for the first non-`id` attribute with a stable prefix and a short,
/// non-empty value.
fn stable_attribute_selector(
    doc: &Document,
    node: NodeId,
    config: &SynthesisConfig,
) -> Option<String> {
    let element = doc.element(node)?;
    element.attributes().find_map(|(name, value)| {
        if name == "id" {
            return None;
        }
        let stable = config
            .stable_attr_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()));
        let usable = !value.is_empty() && value.chars().count() <= config.max_attr_value_len;
        (stable && usable).then(|| format!("[{}=\"{}\"]", css_escape(name), css_escape(value)))
    })
}

fn is_plain_class_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn segment(doc: &Document, node: NodeId, config: &SynthesisConfig) -> String {
    if let Some(id) = host_id_selector(doc, node) {
        return id;
    }
    let tag = tag_of(doc, node);
    if let Some(attr) = stable_attribute_selector(doc, node, config) {
        return format!("{tag}{attr}");
    }

    let mut out = tag.to_owned();
    if let Some(element) = doc.element(node) {
        for class in element
            .classes()
            .filter(|c| is_plain_class_token(c))
            .take(config.max_class_tokens)
        {
            out.push('.');
            out.push_str(&css_escape(class));
        }
    }

    if let Some(parent) = doc.parent_element(node) {
        let same_tag: Vec<NodeId> = doc
            .element_children(parent)
            .filter(|sibling| doc.tag_name(*sibling) == Some(tag))
            .collect();
        if same_tag.len() > 1 {
            if let Some(position) = same_tag.iter().position(|sibling| *sibling == node) {
                out.push_str(&format!(":nth-of-type({})", position + 1));
            }
        }
    }
    out
}

enum PathOutcome {
    Unique(String),
    Best(String),
}

fn ancestor_path(doc: &Document, node: NodeId, config: &SynthesisConfig) -> PathOutcome {
    let body = doc.body();
    let mut segments = Segments::new();
    let mut cursor = Some(node).filter(|n| doc.element(*n).is_some());
    let mut depth = 0;

    while let Some(current) = cursor {
        if Some(current) == body || depth >= config.max_depth {
            break;
        }
        segments.insert(0, segment(doc, current, config));
        let selector = segments.join(" ");
        // A selector the document cannot evaluate is simply not unique yet.
        if doc.count_matches(&selector).ok() == Some(1) {
            return PathOutcome::Unique(selector);
        }
        if selector.len() > config.max_selector_len {
            return PathOutcome::Best(selector);
        }
        depth += 1;
        cursor = doc.parent_element(current);
    }

    PathOutcome::Best(segments.join(" "))
}
