//! Address splitting: `routing` becomes `srcIP` and `dstIP`.

use crate::error::StageResult;
use crate::stage::TableTransform;
use crate::table::Table;
use sieve_protocol::fields::{DST_IP, ROUTING, SRC_IP};
use std::path::Path;

const ROUTING_SEPARATOR: &str = " > ";

/// Split `"A > B"` into `("A", "B")`. Anything that does not split into
/// exactly two parts yields two empty strings.
pub fn split_routing(routing: &str) -> (String, String) {
    let trimmed = routing.trim();
    if trimmed.is_empty() {
        return (String::new(), String::new());
    }
    let parts: Vec<&str> = trimmed.split(ROUTING_SEPARATOR).collect();
    match parts.as_slice() {
        [src, dst] => (src.trim().to_string(), dst.trim().to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Inserts `srcIP`, `dstIP` immediately after `routing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressSplit;

impl TableTransform for AddressSplit {
    fn name(&self) -> &'static str {
        "split-ip"
    }

    fn apply(&self, mut table: Table, source: &Path) -> StageResult<Table> {
        let routing = table.require_column(ROUTING, source)?;
        let (src, dst): (Vec<String>, Vec<String>) =
            table.column(routing).map(split_routing).unzip();
        table.insert_column(routing + 1, SRC_IP, src);
        table.insert_column(routing + 2, DST_IP, dst);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_split_routing() {
        assert_eq!(split_routing("10.0.0.1 > 8.8.8.8"), pair("10.0.0.1", "8.8.8.8"));
        assert_eq!(split_routing("  a > b  "), pair("a", "b"));
    }

    #[test]
    fn test_split_routing_degenerate() {
        assert_eq!(split_routing(""), pair("", ""));
        assert_eq!(split_routing("   "), pair("", ""));
        assert_eq!(split_routing("10.0.0.1"), pair("", ""));
        assert_eq!(split_routing("a > b > c"), pair("", ""));
        assert_eq!(split_routing("a>b"), pair("", ""));
    }

    #[test]
    fn test_columns_follow_routing() {
        let table = Table::with_rows(
            vec!["routing".into(), "Message".into()],
            vec![vec!["1.1.1.1 > 2.2.2.2".into(), "m".into()]],
        );
        let out = AddressSplit.apply(table, Path::new("a.csv")).unwrap();
        assert_eq!(out.headers(), ["routing", "srcIP", "dstIP", "Message"]);
        assert_eq!(out.rows()[0], vec!["1.1.1.1 > 2.2.2.2", "1.1.1.1", "2.2.2.2", "m"]);
    }

    #[test]
    fn test_missing_routing() {
        let table = Table::new(vec!["Message".into()]);
        assert!(AddressSplit.apply(table, Path::new("a.csv")).is_err());
    }
}
