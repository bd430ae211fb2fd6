//! CSS-style selector parsing and matching.
//!
//! Covers the subset a content script actually reaches for: type selectors,
//! `*`, `#id`, `.class`, `[attr]` / `[attr=value]`, compound selectors,
//! descendant and child (`>`) combinators, and comma-separated lists.
//! Matching runs right-to-left, walking parent links.

use arrive_core::{Criteria, Criterion, TreeNode};
use thiserror::Error;

/// Why a selector string failed to parse.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector was empty or whitespace-only.
    #[error("empty selector")]
    Empty,

    /// A character that cannot start or continue a selector part.
    #[error("unexpected character `{found}` at position {at}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Character offset into the source.
        at: usize,
    },

    /// An identifier was required (after `.`, `#`, or inside `[...]`).
    #[error("expected an identifier at position {at}")]
    ExpectedIdent {
        /// Character offset into the source.
        at: usize,
    },

    /// An attribute test was opened but never closed.
    #[error("unclosed attribute test starting at position {at}")]
    UnclosedAttribute {
        /// Character offset of the opening `[`.
        at: usize,
    },

    /// A combinator with nothing on its right.
    #[error("dangling combinator at position {at}")]
    DanglingCombinator {
        /// Character offset of the combinator.
        at: usize,
    },

    /// A `,` with nothing after it.
    #[error("expected a selector after `,` at position {at}")]
    ExpectedSelector {
        /// Character offset past the comma.
        at: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches<N: TreeNode>(&self, node: &N) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if self.classes.iter().any(|class| !node.has_class(class)) {
            return false;
        }
        for test in &self.attrs {
            match (&test.value, node.attr(&test.name)) {
                (None, Some(_)) => {}
                (Some(want), Some(have)) if *want == have => {}
                _ => return false,
            }
        }
        true
    }
}

/// One complex selector: the rightmost compound plus ancestor constraints,
/// stored nearest-first.
#[derive(Debug, Clone)]
struct Complex {
    last: Compound,
    rest: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches<N: TreeNode>(&self, node: &N) -> bool {
        self.last.matches(node) && rest_matches(&self.rest, node)
    }
}

fn rest_matches<N: TreeNode>(rest: &[(Combinator, Compound)], node: &N) -> bool {
    let Some(((combinator, compound), tail)) = rest.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => match node.parent() {
            Some(parent) => compound.matches(&parent) && rest_matches(tail, &parent),
            None => false,
        },
        Combinator::Descendant => {
            // Backtracking walk: any ancestor may anchor the remaining
            // constraints.
            let mut current = node.parent();
            while let Some(ancestor) = current {
                if compound.matches(&ancestor) && rest_matches(tail, &ancestor) {
                    return true;
                }
                current = ancestor.parent();
            }
            false
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(source);
        parser.skip_ws();
        if parser.peek().is_none() {
            return Err(SelectorError::Empty);
        }
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(parser.complex()?);
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.bump();
                    parser.skip_ws();
                    if parser.peek().is_none() {
                        return Err(SelectorError::ExpectedSelector { at: parser.pos });
                    }
                }
                Some(found) => {
                    return Err(SelectorError::UnexpectedChar {
                        found,
                        at: parser.pos,
                    });
                }
            }
        }
        Ok(Self {
            source: source.to_owned(),
            alternatives,
        })
    }

    /// The original selector text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the node matches any alternative in the list.
    pub fn matches<N: TreeNode>(&self, node: &N) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(node))
    }
}

impl<N: TreeNode> Criterion<N> for Selector {
    fn matches(&self, node: &N) -> bool {
        Selector::matches(self, node)
    }

    fn describe(&self) -> String {
        format!("selector({})", self.source)
    }
}

/// Builder extension wiring [`Selector`] into [`Criteria`].
pub trait CriteriaSelectorExt<N: TreeNode>: Sized {
    /// Require a CSS-style selector match, rejecting unparseable input.
    fn selector(self, source: &str) -> Result<Criteria<N>, SelectorError>;
}

impl<N: TreeNode> CriteriaSelectorExt<N> for Criteria<N> {
    fn selector(self, source: &str) -> Result<Criteria<N>, SelectorError> {
        Ok(self.push(Selector::parse(source)?))
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn is_ident_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '-' || ch == '_'
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(Self::is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(SelectorError::ExpectedIdent { at: start });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let opened_at = self.pos;
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|ch| ch != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(SelectorError::UnclosedAttribute { at: opened_at });
                }
                let value = self.chars[start..self.pos].iter().collect();
                self.bump();
                Ok(value)
            }
            _ => self.ident(),
        }
    }

    /// Parse one compound selector; `None` means nothing was consumed.
    fn compound(&mut self) -> Result<Option<Compound>, SelectorError> {
        let mut compound = Compound::default();
        let mut parsed_any = false;
        loop {
            match self.peek() {
                Some('*') if !parsed_any => {
                    self.bump();
                    parsed_any = true;
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                    parsed_any = true;
                }
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                    parsed_any = true;
                }
                Some('[') => {
                    let opened_at = self.pos;
                    self.bump();
                    self.skip_ws();
                    let name = self.ident()?;
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_ws();
                        let value = self.attr_value()?;
                        self.skip_ws();
                        Some(value)
                    } else {
                        None
                    };
                    if self.peek() != Some(']') {
                        return Err(SelectorError::UnclosedAttribute { at: opened_at });
                    }
                    self.bump();
                    compound.attrs.push(AttrTest { name, value });
                    parsed_any = true;
                }
                Some(ch) if !parsed_any && Self::is_ident_char(ch) => {
                    compound.tag = Some(self.ident()?);
                    parsed_any = true;
                }
                _ => break,
            }
        }
        Ok(if parsed_any { Some(compound) } else { None })
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let first_at = self.pos;
        let Some(first) = self.compound()? else {
            let found = self.peek().unwrap_or(',');
            return Err(SelectorError::UnexpectedChar {
                found,
                at: first_at,
            });
        };
        let mut compounds = vec![first];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    let at = self.pos;
                    self.bump();
                    self.skip_ws();
                    match self.compound()? {
                        Some(next) => {
                            combinators.push(Combinator::Child);
                            compounds.push(next);
                        }
                        None => return Err(SelectorError::DanglingCombinator { at }),
                    }
                }
                Some(found) if !had_ws => {
                    return Err(SelectorError::UnexpectedChar {
                        found,
                        at: self.pos,
                    });
                }
                Some(_) => match self.compound()? {
                    Some(next) => {
                        combinators.push(Combinator::Descendant);
                        compounds.push(next);
                    }
                    None => {
                        let found = self.peek().unwrap_or(' ');
                        return Err(SelectorError::UnexpectedChar {
                            found,
                            at: self.pos,
                        });
                    }
                },
            }
        }
        let last = compounds.pop().unwrap_or_default();
        let rest = combinators
            .into_iter()
            .zip(compounds)
            .rev()
            .collect();
        Ok(Complex { last, rest })
    }
}

#[cfg(test)]
mod tests {
    use super::{Selector, SelectorError};
    use crate::tree::{Document, Element};

    fn fixture() -> (Document, Element, Element, Element) {
        // <html><div id=menu class=open><ul><li class=active data-key=welcome></li></ul></div></html>
        let doc = Document::new();
        let menu = doc.create_element("div");
        menu.set_id("menu");
        menu.add_class("open");
        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        item.add_class("active");
        item.set_attr("data-key", "welcome");
        list.append_child(&item);
        menu.append_child(&list);
        doc.root().append_child(&menu);
        (doc, menu, list, item)
    }

    #[test]
    fn simple_forms_match() {
        let (_doc, menu, _list, item) = fixture();
        assert!(Selector::parse("div").unwrap().matches(&menu));
        assert!(Selector::parse("#menu").unwrap().matches(&menu));
        assert!(Selector::parse(".open").unwrap().matches(&menu));
        assert!(Selector::parse("*").unwrap().matches(&item));
        assert!(Selector::parse("[data-key]").unwrap().matches(&item));
        assert!(Selector::parse("[data-key=welcome]").unwrap().matches(&item));
        assert!(!Selector::parse("[data-key=other]").unwrap().matches(&item));
        assert!(!Selector::parse("span").unwrap().matches(&menu));
    }

    #[test]
    fn compound_selectors_require_every_part() {
        let (_doc, menu, _list, item) = fixture();
        assert!(Selector::parse("div#menu.open").unwrap().matches(&menu));
        assert!(!Selector::parse("div#menu.closed").unwrap().matches(&menu));
        assert!(
            Selector::parse("li.active[data-key='welcome']")
                .unwrap()
                .matches(&item)
        );
    }

    #[test]
    fn child_and_descendant_combinators() {
        let (_doc, menu, list, item) = fixture();
        assert!(Selector::parse("#menu > ul > li").unwrap().matches(&item));
        assert!(Selector::parse("#menu li").unwrap().matches(&item));
        assert!(Selector::parse("html li").unwrap().matches(&item));
        assert!(!Selector::parse("#menu > li").unwrap().matches(&item));
        assert!(Selector::parse("#menu > ul").unwrap().matches(&list));
        assert!(!Selector::parse("ul div").unwrap().matches(&menu));
    }

    #[test]
    fn descendant_matching_backtracks() {
        // div > div > span: the outer div also satisfies "div span".
        let doc = Document::new();
        let outer = doc.create_element("div");
        outer.add_class("outer");
        let inner = doc.create_element("div");
        let span = doc.create_element("span");
        inner.append_child(&span);
        outer.append_child(&inner);
        doc.root().append_child(&outer);

        assert!(Selector::parse(".outer span").unwrap().matches(&span));
        assert!(Selector::parse("div div span").unwrap().matches(&span));
        assert!(!Selector::parse("div div div span").unwrap().matches(&span));
    }

    #[test]
    fn selector_lists_match_any_alternative() {
        let (_doc, menu, _list, item) = fixture();
        let selector = Selector::parse("span, li.active, form").unwrap();
        assert!(selector.matches(&item));
        assert!(!selector.matches(&menu));
    }

    #[test]
    fn parse_errors_carry_positions() {
        assert!(matches!(Selector::parse("   "), Err(SelectorError::Empty)));
        assert!(matches!(
            Selector::parse("div >"),
            Err(SelectorError::DanglingCombinator { .. })
        ));
        assert!(matches!(
            Selector::parse("."),
            Err(SelectorError::ExpectedIdent { .. })
        ));
        assert!(matches!(
            Selector::parse("[data-key"),
            Err(SelectorError::UnclosedAttribute { .. })
        ));
        assert!(matches!(
            Selector::parse("div,"),
            Err(SelectorError::ExpectedSelector { .. })
        ));
        assert!(matches!(
            Selector::parse("div ! span"),
            Err(SelectorError::UnexpectedChar { found: '!', .. })
        ));
    }
}
