//! Locator expressions: XPath 1.0 evaluated over `dom_query` trees.
//!
//! A [`Locator`] is compiled once and evaluated against any node of a parsed
//! [`dom_query::Document`]. Relative locators are evaluated from the given
//! node; absolute ones (`/…`, `//…`) from the root of its document.
//!
//! ## Supported syntax
//!
//! The full XPath 1.0 expression language:
//!
//! - Location paths with all thirteen axes, abbreviated steps (`.`, `..`,
//!   `@`, `//`) and the node tests `name`, `*`, `prefix:*`, `text()`,
//!   `comment()`, `processing-instruction()` and `node()`
//! - Filter expressions such as `(.//td)[last()]` and `id('main')//p`
//! - `or`, `and`, `=`, `!=`, `<`, `<=`, `>`, `>=`, `+`, `-`, `*`, `div`,
//!   `mod`, unary `-` and `|`
//! - The XPath 1.0 core function library, plus `ends-with`
//!
//! A locator must select nodes: `count(//li)` or `'text'` do not compile.
//! Variable references have no bindings and are rejected. Documents are
//! HTML, so `namespace::` is always empty and `namespace-uri()` is `''`.
//!
//! Element names match ASCII case-insensitively, as HTML tag names do.
//!
//! ```rust
//! use div2csv::dom::Document;
//! use div2csv::locator::Locator;
//!
//! let doc = Document::from(r#"<ul><li>a</li><li class="x">b</li></ul>"#);
//! let locator = Locator::compile("//li[@class='x']")?;
//! let hits = locator.select(doc.root());
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].string_value(), "b");
//! # Ok::<(), div2csv::locator::LocatorError>(())
//! ```

mod ast;
mod eval;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;

use dom_query::{NodeData, NodeRef};

use ast::Expr;

/// A locator that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct LocatorError {
    /// Byte offset into the expression where the problem was detected.
    pub offset: usize,
    /// Description of the problem.
    pub message: String,
}

impl LocatorError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// One item selected by a locator.
#[derive(Clone)]
pub enum Hit<'a> {
    /// An element, text, comment, processing instruction or document node.
    Node(NodeRef<'a>),
    /// An attribute of `owner`.
    Attribute {
        /// Element carrying the attribute.
        owner: NodeRef<'a>,
        /// Attribute name (lowercase).
        name: String,
        /// Attribute value.
        value: String,
    },
}

impl<'a> Hit<'a> {
    /// The node itself, or the owning element for attributes.
    #[must_use]
    pub fn node(&self) -> NodeRef<'a> {
        match self {
            Self::Node(node) => *node,
            Self::Attribute { owner, .. } => *owner,
        }
    }

    /// XPath string value: descendant text for elements and documents, the
    /// contents of comments and processing instructions, the value for
    /// attributes.
    #[must_use]
    pub fn string_value(&self) -> String {
        match self {
            Self::Node(node) => node
                .query(|n| match &n.data {
                    NodeData::Comment { contents }
                    | NodeData::ProcessingInstruction { contents, .. } => {
                        Some(contents.to_string())
                    }
                    _ => None,
                })
                .flatten()
                .unwrap_or_else(|| node.text().to_string()),
            Self::Attribute { value, .. } => value.clone(),
        }
    }

    /// Lowercase element or attribute name, or a processing instruction's
    /// target; empty for other nodes.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Node(node) if node.is_element() => node
                .node_name()
                .map(|tag| tag.to_ascii_lowercase())
                .unwrap_or_default(),
            Self::Node(node) => node
                .query(|n| match &n.data {
                    NodeData::ProcessingInstruction { target, .. } => target.to_string(),
                    _ => String::new(),
                })
                .unwrap_or_default(),
            Self::Attribute { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for Hit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(_) => f
                .debug_struct("Node")
                .field("name", &self.name())
                .field("text", &self.string_value())
                .finish(),
            Self::Attribute { name, value, .. } => f
                .debug_struct("Attribute")
                .field("name", name)
                .field("value", value)
                .finish(),
        }
    }
}

/// A compiled locator expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    source: String,
    expr: Expr,
}

impl Locator {
    /// Compiles a locator, reporting the first syntax error.
    pub fn compile(source: &str) -> Result<Self, LocatorError> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    /// The expression this locator was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the locator can select attributes.
    #[must_use]
    pub fn selects_attributes(&self) -> bool {
        self.expr.selects_attributes()
    }

    /// Every hit, de-duplicated, in document order.
    #[must_use]
    pub fn select<'a>(&self, context: NodeRef<'a>) -> Vec<Hit<'a>> {
        eval::select(&self.expr, context)
    }

    /// The first hit in document order, if any.
    #[must_use]
    pub fn select_first<'a>(&self, context: NodeRef<'a>) -> Option<Hit<'a>> {
        self.select(context).into_iter().next()
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::compile(source)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
