//! Configuration options for record extraction.
//!
//! The defaults reproduce the all-or-nothing behavior: a missing required
//! column aborts the run, optional misses become `<empty>`, and hyperlinks
//! keep their markup.

/// Cell value used for optional columns with no match.
pub const DEFAULT_MISSING_VALUE: &str = "<empty>";

/// Default length of the record excerpt attached to missing-column errors.
pub const DEFAULT_CONTEXT_LIMIT: usize = 80;

/// What to do with a record that lacks a required column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Fail the whole run; no table is produced.
    #[default]
    Abort,
    /// Drop the record, log a warning and continue with the next one.
    Skip,
}

/// Configuration options for extraction.
///
/// # Example
///
/// ```rust
/// use div2csv::{ExtractOptions, RecordPolicy};
///
/// let options = ExtractOptions {
///     on_invalid_record: RecordPolicy::Skip,
///     missing_value: String::new(),
///     ..ExtractOptions::default()
/// };
/// assert!(options.preserve_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Cell value for optional columns that no locator matched.
    ///
    /// Default: `"<empty>"`
    pub missing_value: String,

    /// Handling of records missing a required column.
    ///
    /// Default: [`RecordPolicy::Abort`]
    pub on_invalid_record: RecordPolicy,

    /// Maximum number of characters of record text quoted in
    /// [`Error::MissingRequiredColumn`](crate::Error::MissingRequiredColumn).
    ///
    /// Default: `80`
    pub context_limit: usize,

    /// Keep the serialized start and end tag of matched `<a>` elements around
    /// their sanitized text, so the link target survives in the cell.
    ///
    /// Default: `true`
    pub preserve_links: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            missing_value: DEFAULT_MISSING_VALUE.to_string(),
            on_invalid_record: RecordPolicy::Abort,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            preserve_links: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_all_or_nothing_behavior() {
        let options = ExtractOptions::default();
        assert_eq!(options.missing_value, "<empty>");
        assert_eq!(options.on_invalid_record, RecordPolicy::Abort);
        assert_eq!(options.context_limit, 80);
        assert!(options.preserve_links);
    }
}
