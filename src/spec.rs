//! Column specifications.
//!
//! A [`Specification`] is an ordered list of [`ColumnSpec`]s. Exactly one
//! column must be named `root` (ignoring case): its single locator selects
//! the record fragments. Every other column is an output column, in declared
//! order, whose locators are evaluated relative to each fragment.
//!
//! Specifications are usually loaded from JSON:
//!
//! ```json
//! [
//!   { "name": "root", "xpaths": ["//ul[@id='products']/li"] },
//!   { "name": "title", "required": true, "xpaths": ["h2", ".//span[@class='name']"] },
//!   { "name": "price", "xpaths": [".//span[@class='price']"], "strip": ["USD"] }
//! ]
//! ```
//!
//! The array may also be wrapped in an object under `ColumnSpecs` (or
//! `columns`); keys match case-insensitively.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::sanitize::Sanitizer;

/// Reserved column name designating the record locator.
pub const ROOT_COLUMN: &str = "root";

/// Definition of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name; unique ignoring case.
    pub name: String,

    /// Whether a record without a value for this column fails the run.
    #[serde(default)]
    pub required: bool,

    /// Locators tried in order; the first one that matches wins.
    #[serde(default, rename = "xpaths", alias = "locators")]
    pub locators: Vec<String>,

    /// Substrings removed from the extracted text, ignoring case, in order.
    #[serde(default)]
    pub strip: Vec<String>,
}

impl ColumnSpec {
    /// An optional column with no locators.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The root column with its record locator.
    pub fn root(locator: impl Into<String>) -> Self {
        Self::new(ROOT_COLUMN).locator(locator)
    }

    /// Marks the column as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Appends a fallback locator.
    #[must_use]
    pub fn locator(mut self, locator: impl Into<String>) -> Self {
        self.locators.push(locator.into());
        self
    }

    /// Appends a strip term.
    #[must_use]
    pub fn strip(mut self, term: impl Into<String>) -> Self {
        self.strip.push(term.into());
        self
    }

    /// True for the reserved `root` column.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name.eq_ignore_ascii_case(ROOT_COLUMN)
    }
}

/// An ordered set of column definitions.
#[derive(Debug, Clone, Default)]
pub struct Specification {
    columns: Vec<ColumnSpec>,
    /// Lowercased name -> index of its first declaration.
    index: HashMap<String, usize>,
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Specification {
    /// Builds a specification from columns in declared order. Not validated.
    #[must_use]
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let mut spec = Self::default();
        for column in columns {
            spec.push(column);
        }
        spec
    }

    /// Appends a column.
    pub fn push(&mut self, column: ColumnSpec) {
        self.index
            .entry(column.name.to_lowercase())
            .or_insert(self.columns.len());
        self.columns.push(column);
    }

    /// All columns, including `root`, in declared order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Number of output columns (everything but `root`).
    #[must_use]
    pub fn visible_column_count(&self) -> usize {
        self.visible_columns().count()
    }

    /// Output column names in declared order.
    #[must_use]
    pub fn visible_column_names(&self) -> Vec<&str> {
        self.visible_columns().map(|c| c.name.as_str()).collect()
    }

    fn visible_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| !c.is_root())
    }

    /// Looks a column up by name, ignoring case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| self.columns.get(i))
    }

    /// The `root` column, if declared.
    #[must_use]
    pub fn root(&self) -> Option<&ColumnSpec> {
        self.column(ROOT_COLUMN)
    }

    /// Checks every structural rule and that every locator compiles.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// Validates and compiles the specification for extraction.
    pub(crate) fn compile(&self) -> Result<CompiledSpec> {
        let invalid = |message: String| Error::InvalidSpecification(message);

        let roots: Vec<&ColumnSpec> = self.columns.iter().filter(|c| c.is_root()).collect();
        let root = match roots.as_slice() {
            [] => return Err(invalid("Column specification lacks a root column".into())),
            [root] => *root,
            _ => return Err(invalid("Root column cannot be repeated".into())),
        };
        if root.locators.len() != 1 {
            return Err(invalid(format!(
                "Root column must have exactly one xpath, found {}",
                root.locators.len()
            )));
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(invalid("Column names cannot be empty".into()));
            }
            if let Some(first) = seen.insert(column.name.to_lowercase(), &column.name) {
                return Err(invalid(format!(
                    "Column '{}' duplicates column '{first}'",
                    column.name
                )));
            }
            if column.locators.is_empty() {
                return Err(invalid(format!("Column '{}' has no xpaths", column.name)));
            }
            if column.strip.iter().any(String::is_empty) {
                return Err(invalid(format!(
                    "Column '{}' has an empty strip term",
                    column.name
                )));
            }
        }

        let root = CompiledColumn::compile(root)?;
        if root.locators.iter().any(Locator::selects_attributes) {
            return Err(invalid(format!(
                "Root xpath {} selects attributes, not elements",
                root.locators[0]
            )));
        }

        let columns = self
            .visible_columns()
            .map(CompiledColumn::compile)
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(invalid("No columns defined in specification".into()));
        }

        Ok(CompiledSpec { root, columns })
    }

    /// Parses and validates a JSON specification.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let deserialize_error = |e: serde_json::Error| {
            Error::InvalidSpecification(format!("Could not deserialize specification: {e}"))
        };

        let value: serde_json::Value = serde_json::from_str(json).map_err(deserialize_error)?;
        let columns = match value {
            serde_json::Value::Array(columns) => columns,
            serde_json::Value::Object(map) => map
                .into_iter()
                .find(|(key, _)| {
                    key.eq_ignore_ascii_case("columnspecs") || key.eq_ignore_ascii_case("columns")
                })
                .and_then(|(_, v)| match v {
                    serde_json::Value::Array(columns) => Some(columns),
                    _ => None,
                })
                .ok_or_else(|| {
                    Error::InvalidSpecification(
                        "Could not deserialize specification: expected a 'ColumnSpecs' array".into(),
                    )
                })?,
            _ => {
                return Err(Error::InvalidSpecification(
                    "Could not deserialize specification: expected an array or object".into(),
                ))
            }
        };

        let columns = columns
            .into_iter()
            .map(|column| serde_json::from_value(lowercase_keys(column)))
            .collect::<std::result::Result<Vec<ColumnSpec>, _>>()
            .map_err(deserialize_error)?;

        let spec = Self::new(columns);
        spec.validate()?;
        Ok(spec)
    }

    /// Reads, parses and validates a JSON specification file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidSpecification(format!(
                "Specification file {} does not exist.",
                path.display()
            )));
        }
        let json = fs::read_to_string(path).map_err(|e| {
            Error::InvalidSpecification(format!("Could not read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

impl FromIterator<ColumnSpec> for Specification {
    fn from_iter<I: IntoIterator<Item = ColumnSpec>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Column object keys are matched ignoring case.
fn lowercase_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(key, v)| (key.to_lowercase(), v))
                .collect(),
        ),
        other => other,
    }
}

/// A validated specification with locators and strip lists prepared.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSpec {
    pub root: CompiledColumn,
    /// Output columns in declared order.
    pub columns: Vec<CompiledColumn>,
}

impl CompiledSpec {
    pub(crate) fn root_locator(&self) -> &Locator {
        // Validation guarantees exactly one root locator.
        &self.root.locators[0]
    }

    pub(crate) fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledColumn {
    pub name: String,
    pub required: bool,
    pub locators: Vec<Locator>,
    pub sanitizer: Sanitizer,
}

impl CompiledColumn {
    fn compile(column: &ColumnSpec) -> Result<Self> {
        let locators = column
            .locators
            .iter()
            .map(|source| {
                Locator::compile(source).map_err(|e| {
                    Error::InvalidSpecification(format!(
                        "Invalid XPath {source} in column '{}': {e}",
                        column.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: column.name.clone(),
            required: column.required,
            locators,
            sanitizer: Sanitizer::new(&column.strip),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Specification {
        Specification::new(vec![
            ColumnSpec::new("title").required().locator("h2"),
            ColumnSpec::root("//li"),
            ColumnSpec::new("Price").locator("span").strip("usd"),
        ])
    }

    #[test]
    fn lookup_ignores_case() {
        let spec = listing();
        assert_eq!(spec.column("PRICE").map(|c| c.name.as_str()), Some("Price"));
        assert_eq!(spec.column("Root").map(|c| c.locators.len()), Some(1));
        assert!(spec.column("missing").is_none());
    }

    #[test]
    fn root_is_excluded_from_visible_columns_wherever_declared() {
        let spec = listing();
        assert_eq!(spec.visible_column_count(), 2);
        assert_eq!(spec.visible_column_names(), ["title", "Price"]);
    }

    #[test]
    fn compile_keeps_declared_order() {
        let compiled = listing().compile().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(compiled.column_names(), ["title", "Price"]);
        assert_eq!(compiled.root_locator().as_str(), "//li");
    }

    #[test]
    fn uppercase_root_counts_as_root() {
        let spec = Specification::new(vec![
            ColumnSpec::new("ROOT").locator("//tr"),
            ColumnSpec::new("cell").locator("td"),
        ]);
        assert!(spec.validate().is_ok());
        assert_eq!(spec.visible_column_count(), 1);
    }

    #[test]
    fn keys_are_lowercased_for_deserialization() {
        let value = serde_json::json!({"Name": "a", "XPaths": ["b"], "REQUIRED": true});
        let column: ColumnSpec =
            serde_json::from_value(lowercase_keys(value)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(column, ColumnSpec::new("a").required().locator("b"));
    }
}
