// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Selector parsing and matching.
//!
//! Supports the subset of Selectors Level 4 that overrides are expressed in: type, universal,
//! `#id`, `.class`, attribute selectors (`[a]`, `=`, `^=`, `$=`, `*=`, `~=`, `|=`, with the `i`/`s`
//! flags), the structural pseudo-classes `:first-child`, `:last-child`, `:only-child`,
//! `:first-of-type`, `:last-of-type`, `:only-of-type`, `:nth-child()`, `:nth-of-type()`, the four
//! combinators, selector lists and CSS backslash escapes. Anything else is a parse error, never a
//! panic.

use std::fmt;
use std::str::FromStr;

use super::{Document, Element, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("unexpected {found:?} at offset {offset}")]
    Unexpected { offset: usize, found: char },
    #[error("unsupported pseudo-class :{0}")]
    UnsupportedPseudo(String),
    #[error("invalid An+B expression {0:?}")]
    InvalidNth(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left; `None` for the leftmost part.
    combinator: Option<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists {
        name: String,
    },
    Match {
        name: String,
        op: AttrOp,
        value: String,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Prefix,
    Suffix,
    Substring,
    Includes,
    DashMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    NthChild(Nth),
    NthOfType(Nth),
    LastChild,
    LastOfType,
    OnlyChild,
    OnlyOfType,
}

/// `An+B` with 1-based positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Nth {
    a: i64,
    b: i64,
}

impl Nth {
    fn first() -> Self {
        Self { a: 0, b: 1 }
    }

    /// Widened to `i128` so extreme `a`/`b` from stored selectors cannot overflow.
    fn matches(self, position: usize) -> bool {
        let Ok(p) = i128::try_from(position) else {
            return false;
        };
        let (a, b) = (i128::from(self.a), i128::from(self.b));
        if a == 0 {
            return p == b;
        }
        let diff = p - b;
        diff % a == 0 && diff / a >= 0
    }
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser::new(input);
        let groups = parser.parse_list()?;
        Ok(Self {
            source: input.to_owned(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether element `node` matches any selector in the list.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if doc.element(node).is_none() {
            return false;
        }
        self.groups
            .iter()
            .any(|complex| matches_parts(doc, node, &complex.parts))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_parts(doc: &Document, node: NodeId, parts: &[Part]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !last.compound.matches(doc, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => doc
            .parent_element(node)
            .is_some_and(|parent| matches_parts(doc, parent, rest)),
        Combinator::Descendant => {
            let mut cursor = doc.parent_element(node);
            while let Some(ancestor) = cursor {
                if matches_parts(doc, ancestor, rest) {
                    return true;
                }
                cursor = doc.parent_element(ancestor);
            }
            false
        }
        Combinator::NextSibling => previous_element_sibling(doc, node)
            .is_some_and(|sibling| matches_parts(doc, sibling, rest)),
        Combinator::SubsequentSibling => {
            let mut cursor = previous_element_sibling(doc, node);
            while let Some(sibling) = cursor {
                if matches_parts(doc, sibling, rest) {
                    return true;
                }
                cursor = previous_element_sibling(doc, sibling);
            }
            false
        }
    }
}

fn element_siblings(doc: &Document, node: NodeId) -> Vec<NodeId> {
    match doc.parent(node) {
        Some(parent) => doc.element_children(parent).collect(),
        None => vec![node],
    }
}

fn previous_element_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let siblings = element_siblings(doc, node);
    let idx = siblings.iter().position(|s| *s == node)?;
    idx.checked_sub(1).map(|prev| siblings[prev])
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if self.ids.iter().any(|id| element.attribute("id") != Some(id.as_str())) {
            return false;
        }
        if self.classes.iter().any(|class| !element.has_class(class)) {
            return false;
        }
        if !self.attrs.iter().all(|cond| cond.matches(element)) {
            return false;
        }
        self.pseudos.iter().all(|pseudo| pseudo.matches(doc, node, element))
    }
}

impl AttrCondition {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Exists { name } => element.attribute(name).is_some(),
            Self::Match {
                name,
                op,
                value,
                case_insensitive,
            } => {
                let Some(actual) = element.attribute(name) else {
                    return false;
                };
                let (actual, value) = if *case_insensitive {
                    (actual.to_lowercase(), value.to_lowercase())
                } else {
                    (actual.to_owned(), value.clone())
                };
                match op {
                    AttrOp::Equals => actual == value,
                    AttrOp::Prefix => !value.is_empty() && actual.starts_with(&value),
                    AttrOp::Suffix => !value.is_empty() && actual.ends_with(&value),
                    AttrOp::Substring => !value.is_empty() && actual.contains(&value),
                    AttrOp::Includes => actual.split_ascii_whitespace().any(|t| t == value),
                    AttrOp::DashMatch => {
                        actual == value || actual.starts_with(&format!("{value}-"))
                    }
                }
            }
        }
    }
}

impl Pseudo {
    fn matches(&self, doc: &Document, node: NodeId, element: &Element) -> bool {
        let siblings = element_siblings(doc, node);
        let same_type = || {
            siblings
                .iter()
                .copied()
                .filter(|s| doc.tag_name(*s) == Some(element.tag()))
                .collect::<Vec<_>>()
        };
        let position = |list: &[NodeId]| list.iter().position(|s| *s == node).map(|i| i + 1);

        match self {
            Self::NthChild(nth) => position(&siblings).is_some_and(|p| nth.matches(p)),
            Self::NthOfType(nth) => position(&same_type()).is_some_and(|p| nth.matches(p)),
            Self::LastChild => siblings.last() == Some(&node),
            Self::LastOfType => same_type().last() == Some(&node),
            Self::OnlyChild => siblings.len() == 1,
            Self::OnlyOfType => same_type().len() == 1,
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_css_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                offset: self.pos,
                found,
            },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), SelectorError> {
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            groups.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => return Ok(groups),
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![Part {
            compound: self.parse_compound()?,
            combinator: None,
        }];

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_ws();
            }
            parts.push(Part {
                compound: self.parse_compound()?,
                combinator: Some(combinator),
            });
        }

        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.pos += 1;
        } else if self.starts_ident() {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrCondition, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.pos += 1;
                return Ok(AttrCondition::Exists { name });
            }
            (Some('='), _) => {
                self.pos += 1;
                AttrOp::Equals
            }
            (Some(prefix), Some('=')) => {
                let op = match prefix {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    _ => return Err(self.unexpected()),
                };
                self.pos += 2;
                op
            }
            _ => return Err(self.unexpected()),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_ws();

        let mut case_insensitive = false;
        match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                case_insensitive = true;
                self.skip_ws();
            }
            Some('s' | 'S') => {
                self.pos += 1;
                self.skip_ws();
            }
            _ => {}
        }
        self.expect(']')?;

        Ok(AttrCondition::Match {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    /// `:first-child` and `:first-of-type` are folded into their `nth` forms.
    fn parse_pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        if self.peek() == Some('(') {
            self.pos += 1;
            let mut arg = String::new();
            loop {
                match self.bump() {
                    None => return Err(SelectorError::UnexpectedEnd),
                    Some(')') => break,
                    Some(ch) => arg.push(ch),
                }
            }
            let nth = parse_nth(&arg)?;
            return match name.as_str() {
                "nth-child" => Ok(Pseudo::NthChild(nth)),
                "nth-of-type" => Ok(Pseudo::NthOfType(nth)),
                _ => Err(SelectorError::UnsupportedPseudo(name)),
            };
        }

        match name.as_str() {
            "first-child" => Ok(Pseudo::NthChild(Nth::first())),
            "first-of-type" => Ok(Pseudo::NthOfType(Nth::first())),
            "last-child" => Ok(Pseudo::LastChild),
            "last-of-type" => Ok(Pseudo::LastOfType),
            "only-child" => Ok(Pseudo::OnlyChild),
            "only-of-type" => Ok(Pseudo::OnlyOfType),
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }

    fn starts_ident(&self) -> bool {
        let first = self.peek();
        let second = self.peek_at(1);
        match first {
            Some('-') => match second {
                Some('-') => true,
                Some('\\') => self.peek_at(2).is_some_and(|c| c != '\n'),
                Some(ch) => is_name_start(ch),
                None => false,
            },
            Some('\\') => second.is_some_and(|c| c != '\n'),
            Some(ch) => is_name_start(ch),
            None => false,
        }
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        if !self.starts_ident() {
            return Err(self.unexpected());
        }
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape()?);
            } else if is_name_char(ch) {
                self.pos += 1;
                out.push(ch);
            } else {
                break;
            }
        }
        Ok(out)
    }

    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(SelectorError::UnexpectedEnd),
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => {}
                        Some('\n') => self.pos += 1,
                        Some(_) => out.push(self.parse_escape()?),
                    }
                }
                Some('\n') => return Err(self.unexpected()),
                Some(ch) => {
                    self.pos += 1;
                    out.push(ch);
                }
            }
        }
    }

    /// Consumes an escape body; the backslash has already been consumed.
    fn parse_escape(&mut self) -> Result<char, SelectorError> {
        let Some(first) = self.peek() else {
            return Ok('\u{fffd}');
        };
        if first == '\n' {
            return Err(self.unexpected());
        }
        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return Ok(first);
        }

        let mut value: u32 = 0;
        let mut digits = 0;
        while digits < 6 {
            let Some(digit) = self.peek().and_then(|c| c.to_digit(16)) else {
                break;
            };
            value = value * 16 + digit;
            digits += 1;
            self.pos += 1;
        }
        if self.peek().is_some_and(is_css_whitespace) {
            self.pos += 1;
        }
        if value == 0 {
            return Ok('\u{fffd}');
        }
        Ok(char::from_u32(value).unwrap_or('\u{fffd}'))
    }
}

fn parse_nth(raw: &str) -> Result<Nth, SelectorError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let invalid = || SelectorError::InvalidNth(raw.to_owned());

    match compact.as_str() {
        "" => return Err(invalid()),
        "odd" => return Ok(Nth { a: 2, b: 1 }),
        "even" => return Ok(Nth { a: 2, b: 0 }),
        _ => {}
    }

    match compact.split_once('n') {
        None => {
            let b = compact.parse::<i64>().map_err(|_| invalid())?;
            Ok(Nth { a: 0, b })
        }
        Some((a_raw, b_raw)) => {
            let a = match a_raw {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse::<i64>().map_err(|_| invalid())?,
            };
            let b = if b_raw.is_empty() {
                0
            } else if b_raw.starts_with(|c| c == '+' || c == '-') {
                b_raw.parse::<i64>().map_err(|_| invalid())?
            } else {
                return Err(invalid());
            };
            Ok(Nth { a, b })
        }
    }
}

/// Splits a selector list at top-level commas, trimming each member. Commas inside brackets,
/// parentheses, quotes or after a backslash are kept. Works on invalid input too.
pub fn split_selector_list(input: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                members.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    members.push(input[start..].trim());
    members.retain(|member| !member.is_empty());
    if members.is_empty() {
        members.push(input.trim());
    }
    members
}

fn is_css_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{c}')
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit() || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::{parse_nth, split_selector_list, Nth, Selector, SelectorError};

    #[test]
    fn parses_synthesized_shapes() {
        for source in [
            "#main",
            "span[data-testid=\"hero\"]",
            "ul li:nth-of-type(2)",
            "div.card.primary > p:nth-of-type(3)",
            "#\\31 st",
            "a[href^='https:' i]",
            "h1, h2 ~ p",
        ] {
            let parsed = Selector::parse(source).unwrap_or_else(|err| {
                panic!("expected {source:?} to parse, got {err}");
            });
            assert_eq!(parsed.as_str(), source);
        }
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert_eq!(Selector::parse("   ").unwrap_err(), SelectorError::Empty);
        assert_eq!(Selector::parse("div >").unwrap_err(), SelectorError::UnexpectedEnd);
        assert!(matches!(
            Selector::parse("#1abc").unwrap_err(),
            SelectorError::Unexpected { offset: 1, found: '1' }
        ));
        assert!(Selector::parse("[data-x=\"open").is_err());
        assert!(Selector::parse("div,,p").is_err());
        assert_eq!(
            Selector::parse("a:hover").unwrap_err(),
            SelectorError::UnsupportedPseudo("hover".to_owned())
        );
    }

    #[test]
    fn nth_expressions() {
        assert_eq!(parse_nth("3").unwrap(), Nth { a: 0, b: 3 });
        assert_eq!(parse_nth("odd").unwrap(), Nth { a: 2, b: 1 });
        assert_eq!(parse_nth(" 2n + 1 ").unwrap(), Nth { a: 2, b: 1 });
        assert_eq!(parse_nth("-n+3").unwrap(), Nth { a: -1, b: 3 });
        assert!(parse_nth("n3").is_err());
        assert!(parse_nth("").is_err());

        let first_three = parse_nth("-n+3").unwrap();
        assert!(first_three.matches(1));
        assert!(first_three.matches(3));
        assert!(!first_three.matches(4));
        let even = parse_nth("even").unwrap();
        assert!(even.matches(2));
        assert!(!even.matches(3));
    }

    #[test]
    fn selector_lists_split_at_top_level_commas() {
        assert_eq!(split_selector_list("#a"), vec!["#a"]);
        assert_eq!(
            split_selector_list(" a , li:nth-child(2n+1), [x=\"1,2\"] "),
            vec!["a", "li:nth-child(2n+1)", "[x=\"1,2\"]"]
        );
        assert_eq!(split_selector_list("div["), vec!["div["]);
        assert_eq!(split_selector_list("a\\,b"), vec!["a\\,b"]);
    }

    #[test]
    fn extreme_nth_coefficients_do_not_overflow() {
        let every = parse_nth("n-9223372036854775808").unwrap();
        assert!(every.matches(1));
        assert!(every.matches(usize::MAX));

        let none = parse_nth("-n-9223372036854775808").unwrap();
        assert!(!none.matches(1));

        let huge_step = parse_nth("-9223372036854775808n+9223372036854775807").unwrap();
        assert!(!huge_step.matches(2));
    }
}
