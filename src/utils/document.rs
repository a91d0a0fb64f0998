// src/utils/document.rs

//! Queryable HTML documents.
//!
//! Thin wrapper over `scraper` exposing only what the extractors need:
//! selection, text, attributes, emptiness and content iteration including
//! bare text nodes.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};

/// Parse a CSS selector, mapping failures into [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

/// Build a document from markup.
///
/// The HTML5 parser builds a tree from any text, so blank or text-only
/// input yields a document with no matching elements. Only payloads
/// carrying NUL bytes are refused; those are binary, not a page.
pub fn parse(markup: &str) -> Result<Document> {
    if markup.contains('\0') {
        return Err(AppError::parse("document contains NUL bytes"));
    }

    let html = Html::parse_document(markup);
    if !html.errors.is_empty() {
        log::debug!("Recovered from {} HTML parse error(s)", html.errors.len());
    }
    Ok(Document { html })
}

impl Document {
    /// All elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<Node<'_>>> {
        let selector = parse_selector(selector)?;
        Ok(self.select_with(&selector).collect())
    }

    /// Like [`Document::select`] with a pre-parsed selector.
    pub fn select_with<'a>(&'a self, selector: &Selector) -> impl Iterator<Item = Node<'a>> {
        self.html.select(selector).map(Node::from)
    }
}

/// An element inside a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

/// A direct child of a node: either an element or a text run.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    Element(Node<'a>),
    Text(&'a str),
}

impl<'a> From<ElementRef<'a>> for Node<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> Node<'a> {
    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Attribute value; `None` when the attribute is absent.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Tag name check, case-insensitive.
    pub fn is(&self, tag: &str) -> bool {
        self.element.value().name().eq_ignore_ascii_case(tag)
    }

    /// True when the node has neither child elements nor text (CSS `:empty`).
    pub fn is_empty(&self) -> bool {
        !self
            .element
            .children()
            .any(|child| child.value().is_element() || child.value().is_text())
    }

    /// Descendants matching `selector`.
    pub fn select(self, selector: &Selector) -> impl Iterator<Item = Node<'a>> {
        self.element.select(selector).map(Node::from)
    }

    /// First descendant matching `selector`.
    pub fn find(self, selector: &Selector) -> Option<Node<'a>> {
        self.select(selector).next()
    }

    /// Text of every descendant matching `selector`, concatenated.
    pub fn select_text(self, selector: &Selector) -> String {
        self.select(selector).map(|node| node.text()).collect()
    }

    /// Direct child elements whose tag is `tag`.
    pub fn child_elements(self, tag: &str) -> impl Iterator<Item = Node<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(Node::from)
            .filter(move |node| node.is(tag))
    }

    /// Direct children, including bare text nodes. Comments are skipped.
    pub fn contents(self) -> impl Iterator<Item = Content<'a>> {
        self.element.children().filter_map(|child| {
            if let Some(element) = ElementRef::wrap(child) {
                Some(Content::Element(Node::from(element)))
            } else {
                child.value().as_text().map(|text| Content::Text(&**text))
            }
        })
    }
}

impl Content<'_> {
    /// Text carried by this child.
    pub fn text(&self) -> String {
        match self {
            Content::Element(node) => node.text(),
            Content::Text(text) => text.to_string(),
        }
    }

    /// Whether this child is an element with the given tag.
    pub fn is(&self, tag: &str) -> bool {
        matches!(self, Content::Element(node) if node.is(tag))
    }
}
