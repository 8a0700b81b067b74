//! Error types for div2csv.
//!
//! Every failure is fatal to the run that raised it. The variants mirror the
//! stages of a run: specification validation, record discovery, per-record
//! column resolution and document loading, plus output errors that only the
//! CSV writer produces.

/// Error type for specification loading, extraction and CSV output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The specification violates a structural rule or could not be loaded.
    #[error("Specification is invalid: {0}")]
    InvalidSpecification(String),

    /// The root locator matched no record fragments.
    #[error("No records found from specified root `{locator}`")]
    NoRecordsFound {
        /// The root locator expression.
        locator: String,
    },

    /// A required column had no matching locator in a record.
    #[error("Required column '{column}' is missing in record {record}: '{context}'")]
    MissingRequiredColumn {
        /// Declared name of the column.
        column: String,
        /// Zero-based index of the record fragment in document order.
        record: usize,
        /// Bounded excerpt of the record's text for diagnostics.
        context: String,
    },

    /// The document could not be loaded or queried.
    #[error("Extraction failed ({context}): {reason}")]
    ExtractionFailed {
        /// What was being done when the failure happened.
        context: String,
        /// The underlying failure.
        reason: String,
    },

    /// Writing the CSV output failed.
    #[error("Unable to save CSV: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O error outside of document loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for div2csv operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an [`Error::ExtractionFailed`] from a context label and any displayable cause.
    pub(crate) fn extraction(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
