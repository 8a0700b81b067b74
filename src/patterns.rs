//! Compiled regex patterns.
//!
//! All patterns are compiled once on first use via `LazyLock`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

/// Markup tags plus the non-breaking space, either as the literal entity or
/// as the U+00A0 character the HTML parser decodes it to.
pub static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>|&nbsp;|\x{A0}").expect("MARKUP regex"));

/// `<meta charset="...">`
pub static CHARSET_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>/]+)"#).expect("CHARSET_META regex")
});

/// `<meta http-equiv="Content-Type" content="...; charset=...">`
pub static CONTENT_TYPE_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>]+)"#)
        .expect("CONTENT_TYPE_CHARSET regex")
});
