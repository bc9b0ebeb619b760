// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Arena-backed document tree.
//!
//! This is the crate's model of the page the overrides are reconciled against: elements, text,
//! selector queries and a mutation-observer hook. Node ids are indices into the arena and stay
//! valid for the lifetime of the document, including after a node is detached.

mod escape;
mod html;
mod selector;

use std::fmt::Write as _;

use tokio::sync::mpsc::UnboundedSender;

pub use escape::css_escape;
pub use html::{parse_html, HtmlParseError};
pub use selector::{split_selector_list, Selector, SelectorError};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in source order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `id` attribute, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id").filter(|id| !id.is_empty())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value.to_owned();
        } else {
            self.attrs.push((name, value.to_owned()));
        }
    }

    fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        before != self.attrs.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub character_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug)]
struct Observer {
    id: ObserverId,
    target: NodeId,
    options: ObserveOptions,
    sender: UnboundedSender<MutationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),
    #[error("appending {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    observers: Vec<Observer>,
    next_observer: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with the `html`/`head`/`body` skeleton in place.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            observers: Vec::new(),
            next_observer: 0,
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(doc.root(), html);
        doc.link(html, head);
        doc.link(html, body);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root())
            .find(|id| self.tag_name(*id) == Some("html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|id| self.tag_name(*id) == Some("head"))
    }

    /// The root content container.
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|id| self.tag_name(*id) == Some("body"))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root() {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_owned()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Links without validation or notification; callers guarantee `child` is detached.
    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(child.0)?.parent?;
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.nodes[child.0].parent = None;
        Some(parent)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent).ok_or(DomError::UnknownNode(parent))?;
        if matches!(parent_node.kind, NodeKind::Text(_)) {
            return Err(DomError::NotAContainer(parent));
        }
        if self.node(child).is_none() {
            return Err(DomError::UnknownNode(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }
        if let Some(old_parent) = self.unlink(child) {
            self.notify(MutationKind::ChildList, old_parent);
        }
        self.link(parent, child);
        self.notify(MutationKind::ChildList, parent);
        Ok(())
    }

    /// Detaches `id` from its parent. The subtree stays in the arena.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.unlink(id) {
            self.notify(MutationKind::ChildList, parent);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    /// Attribute names in source order; empty for non-elements.
    pub fn attribute_names(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|element| element.attributes().map(|(name, _)| name).collect())
            .unwrap_or_default()
    }

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|element| element.classes().collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        self.element_mut(id)
            .map(|element| element.remove_attribute(name))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class_name: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        if element.has_class(class_name) {
            return;
        }
        let mut value = element.attribute("class").unwrap_or_default().trim().to_owned();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class_name);
        element.set_attribute("class", &value);
    }

    /// First connected element in tree order carrying `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendant_elements(self.root())
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Document | NodeKind::Element(_) => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replaces every child of an element with a single text node (none for `""`). On a text
    /// node this rewrites its data instead.
    pub fn set_text_content(&mut self, id: NodeId, value: &str) {
        match self.kind(id) {
            Some(NodeKind::Text(_)) => {
                if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
                    *text = value.to_owned();
                }
                self.notify(MutationKind::CharacterData, id);
            }
            Some(NodeKind::Element(_)) => {
                let old_children = std::mem::take(&mut self.nodes[id.0].children);
                for child in old_children {
                    self.nodes[child.0].parent = None;
                }
                if !value.is_empty() {
                    let text = self.create_text(value);
                    self.link(id, text);
                }
                self.notify(MutationKind::ChildList, id);
            }
            Some(NodeKind::Document) | None => {}
        }
    }

    /// Inline style declaration `name` as `(value, important)`.
    pub fn style_property(&self, id: NodeId, name: &str) -> Option<(String, bool)> {
        let style = self.attribute(id, "style")?;
        parse_style_declarations(style)
            .into_iter()
            .find(|decl| decl.name.eq_ignore_ascii_case(name))
            .map(|decl| (decl.value, decl.important))
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str, important: bool) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let mut decls = parse_style_declarations(element.attribute("style").unwrap_or_default());
        let name = name.trim().to_ascii_lowercase();
        let decl = StyleDeclaration {
            name: name.clone(),
            value: value.trim().to_owned(),
            important,
        };
        match decls.iter_mut().find(|d| d.name == name) {
            Some(slot) => *slot = decl,
            None => decls.push(decl),
        }
        element.set_attribute("style", &serialize_style_declarations(&decls));
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_first(&selector))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_all(&selector))
    }

    pub fn count_matches(&self, selector: &str) -> Result<usize, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendant_elements(self.root())
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .count())
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(selector.matches(self, id))
    }

    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        let mut cursor = Some(id).filter(|node| self.element(*node).is_some());
        while let Some(current) = cursor {
            if selector.matches(self, current) {
                return Ok(Some(current));
            }
            cursor = self.parent_element(current);
        }
        Ok(None)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.descendant_elements(self.root())
            .into_iter()
            .find(|node| selector.matches(self, *node))
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendant_elements(self.root())
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Registers a mutation observer on `target`. Records are delivered over `sender` until
    /// [`Document::disconnect`] is called or the receiver is dropped.
    pub fn observe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        sender: UnboundedSender<MutationRecord>,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(Observer {
            id,
            target,
            options,
            sender,
        });
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|observer| observer.id != id);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn notify(&mut self, kind: MutationKind, target: NodeId) {
        if self.observers.is_empty() {
            return;
        }
        for observer in &self.observers {
            let wanted = match kind {
                MutationKind::ChildList => observer.options.child_list,
                MutationKind::CharacterData => observer.options.character_data,
            };
            if !wanted {
                continue;
            }
            let in_scope = observer.target == target
                || (observer.options.subtree && self.is_inclusive_ancestor(observer.target, target));
            if in_scope {
                let _ = observer.sender.send(MutationRecord { kind, target });
            }
        }
        self.observers.retain(|observer| !observer.sender.is_closed());
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_html(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Document => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Text(text) => {
                let raw = self
                    .parent(id)
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(is_raw_text_element);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_html_text(text));
                }
            }
            NodeKind::Element(element) => {
                let _ = write!(out, "<{}", element.tag);
                for (name, value) in &element.attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape_html_attr(value));
                }
                out.push('>');
                if is_void_element(&element.tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StyleDeclaration {
    name: String,
    value: String,
    important: bool,
}

fn parse_style_declarations(style: &str) -> Vec<StyleDeclaration> {
    let mut out = Vec::new();
    for raw in style.split(';') {
        let Some((name, value)) = raw.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let mut value = value.trim();
        let mut important = false;
        if let Some(idx) = value.to_ascii_lowercase().rfind("!important") {
            if value[idx + "!important".len()..].trim().is_empty() {
                important = true;
                value = value[..idx].trim_end();
            }
        }
        out.push(StyleDeclaration {
            name,
            value: value.to_owned(),
            important,
        });
    }
    out
}

fn serialize_style_declarations(decls: &[StyleDeclaration]) -> String {
    let mut out = String::new();
    for decl in decls {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{}: {}", decl.name, decl.value);
        if decl.important {
            out.push_str(" !important");
        }
        out.push(';');
    }
    out
}

fn escape_html_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
