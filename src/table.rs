//! Tabular extraction result and its CSV serialization.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Named columns plus one row of string cells per extracted record.
///
/// Rows are stored in document order of their record fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// An empty table with the given column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// All rows in order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// Appends a row; `cells` must line up with [`Table::columns`].
    pub(crate) fn push_row(&mut self, cells: Vec<String>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(cells);
    }

    /// Writes the table as CSV: a header row, then one record per row.
    ///
    /// Quoting follows RFC 4180 (fields are quoted only when needed, quotes
    /// are doubled, records end in CRLF) and every field is trimmed.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(writer);

        csv.write_record(self.columns.iter().map(|name| name.trim()))?;
        for cells in &self.rows {
            csv.write_record(cells.iter().map(|cell| cell.trim()))?;
        }
        csv.flush()?;
        Ok(())
    }

    /// The CSV serialization as a string.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// A borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'t> {
    columns: &'t [String],
    cells: &'t [String],
}

impl<'t> Row<'t> {
    /// Cell of the named column (name matched ignoring case).
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'t str> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }

    /// Cells in column order.
    #[must_use]
    pub fn cells(&self) -> &'t [String] {
        self.cells
    }

    /// `(column, cell)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'t str, &'t str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(String::as_str))
    }
}
