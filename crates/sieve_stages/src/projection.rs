//! Column projection: keep a whitelist of columns, in the order given.

use crate::error::{StageError, StageResult};
use crate::stage::TableTransform;
use crate::table::Table;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A column picked by 0-based position or by field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnSelector {
    Position(usize),
    Name(String),
}

impl FromStr for ColumnSelector {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StageError::Config("empty column selector".to_string()));
        }
        Ok(match s.parse::<usize>() {
            Ok(position) => ColumnSelector::Position(position),
            Err(_) => ColumnSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Position(p) => write!(f, "{}", p),
            ColumnSelector::Name(n) => f.write_str(n),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    selectors: Vec<ColumnSelector>,
}

impl Projection {
    pub fn new(selectors: Vec<ColumnSelector>) -> StageResult<Self> {
        if selectors.is_empty() {
            return Err(StageError::Config(
                "projection needs at least one column".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for selector in &selectors {
            if !seen.insert(selector) {
                return Err(StageError::Config(format!(
                    "column selector '{}' is listed more than once",
                    selector
                )));
            }
        }
        Ok(Self { selectors })
    }

    /// Parse config-style selectors such as `["0", "1", "Message"]`.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> StageResult<Self> {
        let parsed = selectors
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<StageResult<Vec<ColumnSelector>>>()?;
        Self::new(parsed)
    }

    /// Resolve selectors against one file's header. Two selectors naming
    /// the same column (e.g. `0` and `Timestamp`) are rejected.
    fn resolve(&self, table: &Table, source: &Path) -> StageResult<Vec<usize>> {
        let width = table.headers().len();
        let mut indices: Vec<usize> = Vec::with_capacity(self.selectors.len());
        for (i, selector) in self.selectors.iter().enumerate() {
            let index = match selector {
                ColumnSelector::Position(index) => {
                    if *index >= width {
                        return Err(StageError::ColumnIndex {
                            index: *index,
                            width,
                            file: source.to_path_buf(),
                        });
                    }
                    *index
                }
                ColumnSelector::Name(name) => table.require_column(name, source)?,
            };
            if let Some(prior) = indices.iter().position(|&seen| seen == index) {
                return Err(StageError::Config(format!(
                    "column selectors '{}' and '{}' both pick column {} of {}",
                    self.selectors[prior],
                    self.selectors[i],
                    index,
                    source.display()
                )));
            }
            indices.push(index);
        }
        Ok(indices)
    }
}

impl TableTransform for Projection {
    fn name(&self) -> &'static str {
        "project"
    }

    fn apply(&self, table: Table, source: &Path) -> StageResult<Table> {
        let indices = self.resolve(&table, source)?;
        Ok(table.select_columns(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_table() -> Table {
        let headers = [
            "Timestamp",
            "Hostname",
            "AppName",
            "SeverityLevel",
            "Severity",
            "LogType",
            "Message",
        ];
        Table::with_rows(
            headers.iter().map(|s| s.to_string()).collect(),
            vec![["t", "h", "a", "3", "CRITICAL", "x", "m"]
                .iter()
                .map(|s| s.to_string())
                .collect()],
        )
    }

    #[test]
    fn test_default_positions_keep_four_fields() {
        let projection = Projection::parse(&["0", "1", "2", "6"]).unwrap();
        let out = projection.apply(input_table(), Path::new("a.csv")).unwrap();
        assert_eq!(out.headers(), ["Timestamp", "Hostname", "AppName", "Message"]);
        assert_eq!(out.rows()[0], vec!["t", "h", "a", "m"]);
    }

    #[test]
    fn test_names_and_reordering() {
        let projection = Projection::parse(&["Message", "0"]).unwrap();
        let out = projection.apply(input_table(), Path::new("a.csv")).unwrap();
        assert_eq!(out.headers(), ["Message", "Timestamp"]);
    }

    #[test]
    fn test_out_of_range_position() {
        let projection = Projection::parse(&["0", "9"]).unwrap();
        let err = projection
            .apply(input_table(), Path::new("a.csv"))
            .unwrap_err();
        assert!(matches!(err, StageError::ColumnIndex { index: 9, width: 7, .. }));
    }

    #[test]
    fn test_unknown_name_is_schema_error() {
        let projection = Projection::parse(&["Nope"]).unwrap();
        let err = projection
            .apply(input_table(), Path::new("a.csv"))
            .unwrap_err();
        assert!(matches!(err, StageError::Schema { .. }));
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(Projection::parse(&["0", "1", "0"]).is_err());
        assert!(Projection::parse(&["Message", " Message "]).is_err());
        assert!(Projection::parse::<&str>(&[]).is_err());
    }

    #[test]
    fn test_position_and_name_for_same_column_rejected() {
        let projection = Projection::parse(&["0", "Message", "Timestamp"]).unwrap();
        let err = projection
            .apply(input_table(), Path::new("a.csv"))
            .unwrap_err();
        match err {
            StageError::Config(message) => {
                assert!(message.contains("'0'"), "{}", message);
                assert!(message.contains("'Timestamp'"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_projecting_by_name_twice_equals_once() {
        let projection = Projection::parse(&["Hostname", "Message"]).unwrap();
        let once = projection.apply(input_table(), Path::new("a.csv")).unwrap();
        let twice = projection.apply(once.clone(), Path::new("a.csv")).unwrap();
        assert_eq!(once, twice);
    }
}
