//! DOM helpers over `dom_query`.
//!
//! Thin adapter used by the extractor: tag inspection, text access and the
//! markup rewriting needed to keep hyperlinks live in output cells.

// Re-export core types for external use
pub use dom_query::{Document, NodeRef};

pub use tendril::StrTendril;

/// Tag names treated as hyperlinks.
const HYPERLINK_TAGS: &[&str] = &["a"];

/// Parses an HTML document.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Lowercase tag name of an element node.
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    if !node.is_element() {
        return None;
    }
    node.node_name().map(|t| t.to_ascii_lowercase())
}

/// True for `<a>` elements, whose markup is preserved in output cells.
#[must_use]
pub fn is_hyperlink(node: &NodeRef) -> bool {
    tag_name(node).is_some_and(|tag| HYPERLINK_TAGS.contains(&tag.as_str()))
}

/// All text content of the node and its descendants.
///
/// Returns `StrTendril` for zero-copy passing.
#[inline]
#[must_use]
pub fn text_content(node: &NodeRef) -> StrTendril {
    node.text()
}

/// Outer HTML of the node; empty if it cannot be serialized.
#[inline]
#[must_use]
pub fn outer_html(node: &NodeRef) -> StrTendril {
    node.try_html().unwrap_or_default()
}

/// Serializes `node` with its inner content replaced by `text`.
///
/// The start tag (and so every attribute) is kept byte-for-byte as the
/// serializer produced it; `text` is escaped so the result stays valid markup.
#[must_use]
pub fn with_inner_text(node: &NodeRef, text: &str) -> String {
    let outer = outer_html(node);
    match split_element_markup(&outer) {
        Some((start_tag, end_tag)) => format!("{start_tag}{}{end_tag}", escape_text(text)),
        None => outer.to_string(),
    }
}

/// Splits serialized element markup into its start tag and end tag.
///
/// The start tag ends at the first `>` outside a quoted attribute value.
fn split_element_markup(outer: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    let mut start_len = None;
    for (i, c) in outer.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => {
                start_len = Some(i + 1);
                break;
            }
            None => {}
        }
    }

    let start_len = start_len?;
    let end_at = outer.rfind("</")?;
    (end_at >= start_len).then(|| (&outer[..start_len], &outer[end_at..]))
}

/// Escapes text for inclusion as HTML character data.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whitespace-collapsed text of `node`, cut to `limit` characters.
///
/// Used for error diagnostics, where a record's full text could be arbitrarily large.
#[must_use]
pub fn text_excerpt(node: &NodeRef, limit: usize) -> String {
    let text = text_content(node);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        return collapsed;
    }
    let mut excerpt: String = collapsed.chars().take(limit).collect();
    excerpt.push('…');
    excerpt
}
