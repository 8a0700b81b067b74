//! # div2csv
//!
//! Extracts repeated records from an HTML page into a CSV table, driven by a
//! declarative column specification.
//!
//! A specification names one `root` locator selecting the record fragments
//! (list items, table rows, cards...) and any number of output columns, each
//! with a priority list of locators evaluated relative to a fragment.
//!
//! ## Quick Start
//!
//! ```rust
//! use div2csv::{extract, ColumnSpec, Specification};
//!
//! let html = r#"<ul>
//!   <li><h2>Widget</h2><span class="price">10 USD</span></li>
//!   <li><h2>Gadget</h2></li>
//! </ul>"#;
//!
//! let spec = Specification::new(vec![
//!     ColumnSpec::root("//li"),
//!     ColumnSpec::new("name").required().locator("h2"),
//!     ColumnSpec::new("price").locator("span[@class='price']").strip("usd"),
//! ]);
//!
//! let table = extract(html, &spec)?;
//! assert_eq!(table.columns(), ["name", "price"]);
//! assert_eq!(table.row(0).and_then(|r| r.get("price")), Some("10"));
//! assert_eq!(table.row(1).and_then(|r| r.get("price")), Some("<empty>"));
//! # Ok::<(), div2csv::Error>(())
//! ```
//!
//! ## Behavior
//!
//! - **First match wins**: a column's locators are tried in order.
//! - **All or nothing**: a record missing a required column fails the whole
//!   run unless [`RecordPolicy::Skip`] is selected.
//! - **Sanitized cells**: non-breaking spaces, configured strip terms and
//!   line breaks are removed from the matched text, then it is trimmed.
//!   Escaped markup such as `&lt;b&gt;` stays as text.
//! - **Live links**: matched `<a>` elements keep their tag and attributes
//!   around the sanitized text.

mod error;
mod extract;
mod options;
mod patterns;
mod spec;
mod table;

/// DOM helpers over `dom_query`.
pub mod dom;

/// Input decoding with charset detection.
pub mod encoding;

/// XPath 1.0 locators.
pub mod locator;

/// Text sanitization for cell values.
pub mod sanitize;

use std::path::Path;

// Public API - re-exports
pub use error::{Error, Result};
pub use extract::Extractor;
pub use options::{ExtractOptions, RecordPolicy, DEFAULT_CONTEXT_LIMIT, DEFAULT_MISSING_VALUE};
pub use sanitize::{sanitize, Sanitizer};
pub use spec::{ColumnSpec, Specification, ROOT_COLUMN};
pub use table::{Row, Table};

/// Extracts a table from an HTML string using default options.
pub fn extract(html: &str, spec: &Specification) -> Result<Table> {
    extract_with_options(html, spec, &ExtractOptions::default())
}

/// Extracts a table from an HTML string with custom options.
///
/// # Example
///
/// ```rust
/// use div2csv::{extract_with_options, ColumnSpec, ExtractOptions, RecordPolicy, Specification};
///
/// let spec = Specification::new(vec![
///     ColumnSpec::root("//tr"),
///     ColumnSpec::new("id").required().locator("td[1]"),
/// ]);
/// let options = ExtractOptions {
///     on_invalid_record: RecordPolicy::Skip,
///     ..ExtractOptions::default()
/// };
///
/// let html = "<table><tr><th>header</th></tr><tr><td>7</td></tr></table>";
/// let table = extract_with_options(html, &spec, &options)?;
/// assert_eq!(table.len(), 1);
/// # Ok::<(), div2csv::Error>(())
/// ```
pub fn extract_with_options(
    html: &str,
    spec: &Specification,
    options: &ExtractOptions,
) -> Result<Table> {
    Extractor::new(spec, options.clone())?.extract_html(html)
}

/// Extracts a table from raw HTML bytes, detecting the character encoding.
pub fn extract_bytes(html: &[u8], spec: &Specification, options: &ExtractOptions) -> Result<Table> {
    Extractor::new(spec, options.clone())?.extract_bytes(html)
}

/// Reads an HTML file and extracts a table from it.
pub fn extract_file(
    path: impl AsRef<Path>,
    spec: &Specification,
    options: &ExtractOptions,
) -> Result<Table> {
    Extractor::new(spec, options.clone())?.extract_file(path.as_ref())
}
