//! Record extraction.
//!
//! The root locator is evaluated against the whole document; every node it
//! selects is one record. For each record, every output column tries its
//! locators in order and takes the first hit:
//!
//! - `<a>` elements keep their start and end tag around the sanitized text
//! - attribute hits yield the sanitized attribute value
//! - any other node yields its sanitized text content
//!
//! A column no locator matches becomes the missing-value sentinel, or fails
//! the run when the column is required.

use std::path::Path;

use dom_query::{Document, NodeRef};
use tracing::{debug, warn};

use crate::dom;
use crate::encoding;
use crate::error::{Error, Result};
use crate::locator::Hit;
use crate::options::{ExtractOptions, RecordPolicy};
use crate::spec::{CompiledColumn, CompiledSpec, Specification};
use crate::table::Table;

/// Extracts tables from documents with one validated specification.
///
/// Compiling the specification once and reusing the extractor avoids
/// re-parsing locators for every document.
#[derive(Debug, Clone)]
pub struct Extractor {
    spec: CompiledSpec,
    options: ExtractOptions,
}

impl Extractor {
    /// Validates `spec` and prepares it for extraction.
    pub fn new(spec: &Specification, options: ExtractOptions) -> Result<Self> {
        Ok(Self {
            spec: spec.compile()?,
            options,
        })
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Output column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.spec.column_names()
    }

    /// Parses `html` and extracts its records.
    pub fn extract_html(&self, html: &str) -> Result<Table> {
        self.extract_document(&dom::parse(html))
    }

    /// Decodes `html` (see [`encoding::decode_html`]), parses it and extracts its records.
    pub fn extract_bytes(&self, html: &[u8]) -> Result<Table> {
        self.extract_html(&encoding::decode_html(html))
    }

    /// Reads the HTML file at `path` and extracts its records.
    pub fn extract_file(&self, path: &Path) -> Result<Table> {
        let context = format!("loading {}", path.display());
        if !path.is_file() {
            return Err(Error::extraction(context, "HTML file does not exist"));
        }
        let bytes = std::fs::read(path).map_err(|e| Error::extraction(context, e))?;
        self.extract_bytes(&bytes)
    }

    /// Extracts one row per record fragment of an already parsed document.
    pub fn extract_document(&self, document: &Document) -> Result<Table> {
        let root_locator = self.spec.root_locator();
        let fragments = root_locator.select(document.root());
        if fragments.is_empty() {
            return Err(Error::NoRecordsFound {
                locator: root_locator.to_string(),
            });
        }
        debug!(records = fragments.len(), root = %root_locator, "matched record fragments");

        let mut table = Table::new(self.spec.column_names());
        for (index, fragment) in fragments.iter().enumerate() {
            match self.extract_record(index, fragment.node()) {
                Ok(cells) => table.push_row(cells),
                Err(err @ Error::MissingRequiredColumn { .. })
                    if self.options.on_invalid_record == RecordPolicy::Skip =>
                {
                    warn!(record = index, "skipping record: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        if table.is_empty() {
            return Err(Error::NoRecordsFound {
                locator: root_locator.to_string(),
            });
        }
        debug!(rows = table.len(), "extraction complete");
        Ok(table)
    }

    fn extract_record(&self, index: usize, fragment: NodeRef<'_>) -> Result<Vec<String>> {
        let mut cells = Vec::with_capacity(self.spec.columns.len());

        for column in &self.spec.columns {
            let hit = column
                .locators
                .iter()
                .find_map(|locator| locator.select_first(fragment));

            match hit {
                Some(hit) => cells.push(self.cell_value(&hit, column)),
                None if column.required => {
                    return Err(Error::MissingRequiredColumn {
                        column: column.name.clone(),
                        record: index,
                        context: dom::text_excerpt(&fragment, self.options.context_limit),
                    });
                }
                None => {
                    debug!(record = index, column = %column.name, "no match, using missing value");
                    cells.push(self.options.missing_value.clone());
                }
            }
        }

        Ok(cells)
    }

    /// The hit's string value is already entity-decoded, so it is sanitized
    /// as text; markup removal would eat decoded `<` and `>`.
    fn cell_value(&self, hit: &Hit<'_>, column: &CompiledColumn) -> String {
        let text = column.sanitizer.sanitize_text(&hit.string_value());
        match hit {
            Hit::Node(node) if self.options.preserve_links && dom::is_hyperlink(node) => {
                dom::with_inner_text(node, &text)
            }
            _ => text,
        }
    }
}
