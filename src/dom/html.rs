// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Small, forgiving HTML reader.
//!
//! Good enough for well-formed pages and test fixtures: it does not implement the HTML5 tree
//! construction algorithm, only tag nesting with implicit closing on mismatched end tags. Content
//! outside `<head>`/`<body>` is routed onto the document skeleton.

use super::{is_raw_text_element, is_void_element, Document, NodeId};

const HEAD_ELEMENTS: &[&str] = &["base", "link", "meta", "script", "style", "title"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HtmlParseError {
    #[error("unclosed comment starting at byte {0}")]
    UnclosedComment(usize),
    #[error("unclosed tag starting at byte {0}")]
    UnclosedTag(usize),
    #[error("invalid tag name at byte {0}")]
    InvalidTagName(usize),
    #[error("unclosed <{tag}> starting at byte {offset}")]
    UnclosedRawText { tag: String, offset: usize },
}

pub fn parse_html(html: &str) -> Result<Document, HtmlParseError> {
    let mut builder = TreeBuilder::new();
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            let end = find(bytes, i + 4, b"-->").ok_or(HtmlParseError::UnclosedComment(i))?;
            i = end + 3;
            continue;
        }
        if bytes[i..].starts_with(b"<!") || bytes[i..].starts_with(b"<?") {
            let end = find(bytes, i, b">").ok_or(HtmlParseError::UnclosedTag(i))?;
            i = end + 1;
            continue;
        }
        if bytes[i..].starts_with(b"</") {
            let end = find(bytes, i, b">").ok_or(HtmlParseError::UnclosedTag(i))?;
            let name = html[i + 2..end].trim().to_ascii_lowercase();
            builder.close(&name);
            i = end + 1;
            continue;
        }
        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let tag = parse_start_tag(html, i)?;
            i = tag.end;
            let node = builder.open(&tag.name, &tag.attrs, tag.self_closing);

            if is_raw_text_element(&tag.name) && !tag.self_closing {
                let close = find_end_tag(bytes, i, tag.name.as_bytes()).ok_or_else(|| {
                    HtmlParseError::UnclosedRawText {
                        tag: tag.name.clone(),
                        offset: i,
                    }
                })?;
                if close > i {
                    let text = builder.doc.create_text(&html[i..close]);
                    builder.doc.link(node, text);
                }
                builder.close(&tag.name);
                let end = find(bytes, close, b">").ok_or(HtmlParseError::UnclosedTag(close))?;
                i = end + 1;
            }
            continue;
        }

        let start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        builder.text(&decode_character_references(&html[start..i]));
    }

    Ok(builder.doc)
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    end: usize,
}

fn parse_start_tag(html: &str, at: usize) -> Result<StartTag, HtmlParseError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b':'))
    {
        i += 1;
    }
    if i == name_start {
        return Err(HtmlParseError::InvalidTagName(at));
    }
    let name = html[name_start..i].to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(HtmlParseError::UnclosedTag(at)),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            Some(b'/') => {
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = html[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let close = find(bytes, i + 1, &[quote]).ok_or(HtmlParseError::UnclosedTag(at))?;
                    value = decode_character_references(&html[i + 1..close]);
                    i = close + 1;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_character_references(&html[value_start..i]);
                }
                None => return Err(HtmlParseError::UnclosedTag(at)),
            }
        }

        if !attr_name.is_empty() && !attrs.iter().any(|(k, _)| *k == attr_name) {
            attrs.push((attr_name, value));
        }
    }

    Ok(StartTag {
        name,
        attrs,
        self_closing,
        end: i,
    })
}

struct TreeBuilder {
    doc: Document,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let doc = Document::new();
        let stack = vec![doc.root()];
        Self { doc, stack }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn at_document_level(&self) -> bool {
        let current = self.current();
        current == self.doc.root() || Some(current) == self.doc.document_element()
    }

    fn skeleton(&self, name: &str) -> Option<NodeId> {
        match name {
            "html" => self.doc.document_element(),
            "head" => self.doc.head(),
            "body" => self.doc.body(),
            _ => None,
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)], self_closing: bool) -> NodeId {
        if let Some(node) = self.skeleton(name) {
            for (key, value) in attrs {
                self.doc.set_attribute(node, key, value);
            }
            self.stack.truncate(1);
            if let Some(html) = self.doc.document_element() {
                if html != node {
                    self.stack.push(html);
                }
            }
            self.stack.push(node);
            return node;
        }

        let parent = self.insertion_parent(name);
        let node = self.doc.create_element(name);
        for (key, value) in attrs {
            self.doc.set_attribute(node, key, value);
        }
        self.doc.link(parent, node);
        // Implicitly routed content keeps the builder at document level so later siblings are
        // routed again instead of nesting under head.
        if parent != self.current() {
            self.stack.truncate(1);
            if let Some(html) = self.doc.document_element() {
                self.stack.push(html);
            }
        }
        if !self_closing && !is_void_element(name) {
            self.stack.push(node);
        }
        node
    }

    fn insertion_parent(&self, name: &str) -> NodeId {
        if !self.at_document_level() {
            return self.current();
        }
        let head_content = HEAD_ELEMENTS.contains(&name)
            && self
                .doc
                .body()
                .map_or(true, |body| self.doc.children(body).is_empty());
        let target = if head_content {
            self.doc.head()
        } else {
            self.doc.body()
        };
        target.unwrap_or_else(|| self.doc.root())
    }

    fn close(&mut self, name: &str) {
        let Some(idx) = self
            .stack
            .iter()
            .rposition(|node| self.doc.tag_name(*node) == Some(name))
        else {
            return;
        };
        self.stack.truncate(idx.max(1));
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = if self.at_document_level() {
            if text.trim().is_empty() {
                return;
            }
            match self.doc.body() {
                Some(body) => body,
                None => return,
            }
        } else {
            self.current()
        };
        let node = self.doc.create_text(text);
        self.doc.link(parent, node);
    }
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn find_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while let Some(pos) = find(bytes, i, b"</") {
        let name_start = pos + 2;
        let name_end = name_start + tag.len();
        if bytes.len() >= name_end && bytes[name_start..name_end].eq_ignore_ascii_case(tag) {
            return Some(pos);
        }
        i = pos + 2;
    }
    None
}

fn decode_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_owned();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest[1..].find(';').map(|p| p + 1).filter(|p| *p <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity.strip_prefix('#').and_then(|num| {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            }),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
