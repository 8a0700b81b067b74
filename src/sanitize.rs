//! Text sanitization for extracted cell values.
//!
//! Steps, in order:
//! 1. remove markup tags and non-breaking spaces (`&nbsp;` and U+00A0)
//! 2. remove every configured strip term, ignoring case, in list order
//! 3. remove line breaks
//! 4. trim surrounding whitespace
//!
//! [`Sanitizer::sanitize`] takes raw markup and runs all four steps.
//! [`Sanitizer::sanitize_text`] takes text the HTML parser has already
//! decoded, which holds no tags: step 1 only drops U+00A0 there, so a decoded
//! `&lt;b&gt;` stays `<b>`.
//!
//! Sanitization never fails; terms that do not occur are no-ops.

use crate::patterns::MARKUP;

/// A strip list prepared once and applied to many values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitizer {
    /// Strip terms, lowercased, empty terms dropped.
    terms: Vec<String>,
}

impl Sanitizer {
    /// Prepares a sanitizer for the given strip terms.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(AsRef::as_ref)
                .filter(|term| !term.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }

    /// Cleans raw markup `raw` (see the module docs for the exact steps).
    #[must_use]
    pub fn sanitize(&self, raw: &str) -> String {
        self.finish(MARKUP.replace_all(raw, "").into_owned())
    }

    /// Cleans entity-decoded text, such as a node's string value.
    #[must_use]
    pub fn sanitize_text(&self, text: &str) -> String {
        let mut text = text.to_string();
        text.retain(|c| c != '\u{A0}');
        self.finish(text)
    }

    fn finish(&self, mut text: String) -> String {
        for term in &self.terms {
            text = remove_ignore_case(&text, term);
        }
        text.retain(|c| !is_line_break(c));
        text.trim().to_string()
    }
}

/// One-shot form of [`Sanitizer::sanitize`].
///
/// # Example
///
/// ```rust
/// use div2csv::sanitize;
///
/// let clean = sanitize("<b>Price:</b>&nbsp;12 EUR\r\n", &["eur"]);
/// assert_eq!(clean, "Price:12");
/// ```
#[must_use]
pub fn sanitize<S: AsRef<str>>(raw: &str, strip: &[S]) -> String {
    Sanitizer::new(strip).sanitize(raw)
}

/// CR, LF, FF, NEL, LS and PS; CRLF goes as two characters.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\r' | '\n' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Removes every occurrence of `needle` (already lowercase) from `text`, ignoring case.
fn remove_ignore_case(text: &str, needle: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if let Some(len) = match_len_ignore_case(rest, needle) {
            rest = &rest[len..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Byte length of the prefix of `haystack` equal to `needle` ignoring case.
fn match_len_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut expected = needle.chars().peekable();
    let mut matched = 0;
    for (i, c) in haystack.char_indices() {
        if expected.peek().is_none() {
            return Some(i);
        }
        for lower in c.to_lowercase() {
            if expected.next() != Some(lower) {
                return None;
            }
        }
        matched = i + c.len_utf8();
    }
    expected.peek().is_none().then_some(matched)
}
