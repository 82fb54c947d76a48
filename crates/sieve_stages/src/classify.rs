//! Address classification: private (RFC 1918) or global.

use crate::error::StageResult;
use crate::stage::TableTransform;
use crate::table::Table;
use sieve_protocol::fields::{DST_IP, DST_IP_TYPE, SRC_IP, SRC_IP_TYPE};
use std::path::Path;

pub const PRIVATE: &str = "private";
pub const GLOBAL: &str = "global";

/// Classify a dotted-quad address.
///
/// Empty input gives `""`. Anything that is not four decimal octets in
/// 0..=255 is reported as `"global"`.
pub fn classify_address(addr: &str) -> &'static str {
    let addr = addr.trim();
    if addr.is_empty() {
        return "";
    }
    match parse_octets(addr) {
        Some([10, ..]) => PRIVATE,
        Some([172, second, ..]) if (16..=31).contains(&second) => PRIVATE,
        Some([192, 168, ..]) => PRIVATE,
        _ => GLOBAL,
    }
}

fn parse_octets(addr: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = addr.split('.');
    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// Inserts `srcIP_type` after `srcIP` and `dstIP_type` after `dstIP`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressClassification;

impl TableTransform for AddressClassification {
    fn name(&self) -> &'static str {
        "classify-ip"
    }

    fn apply(&self, mut table: Table, source: &Path) -> StageResult<Table> {
        let src = table.require_column(SRC_IP, source)?;
        table.require_column(DST_IP, source)?;

        let src_types = classify_column(&table, src);
        table.insert_column(src + 1, SRC_IP_TYPE, src_types);

        // Re-resolve: the insert above may have shifted dstIP.
        let dst = table.require_column(DST_IP, source)?;
        let dst_types = classify_column(&table, dst);
        table.insert_column(dst + 1, DST_IP_TYPE, dst_types);
        Ok(table)
    }
}

fn classify_column(table: &Table, index: usize) -> Vec<String> {
    table
        .column(index)
        .map(|addr| classify_address(addr).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ranges() {
        assert_eq!(classify_address("10.0.0.1"), PRIVATE);
        assert_eq!(classify_address("172.16.0.1"), PRIVATE);
        assert_eq!(classify_address("172.31.255.255"), PRIVATE);
        assert_eq!(classify_address("192.168.1.1"), PRIVATE);
    }

    #[test]
    fn test_range_edges_are_global() {
        assert_eq!(classify_address("172.15.0.1"), GLOBAL);
        assert_eq!(classify_address("172.32.0.1"), GLOBAL);
        assert_eq!(classify_address("192.169.0.1"), GLOBAL);
        assert_eq!(classify_address("8.8.8.8"), GLOBAL);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(classify_address(""), "");
        assert_eq!(classify_address("   "), "");
        assert_eq!(classify_address("999.1.1.1"), GLOBAL);
        assert_eq!(classify_address("10.0.0"), GLOBAL);
        assert_eq!(classify_address("10.0.0.1.5"), GLOBAL);
        assert_eq!(classify_address("a.b.c.d"), GLOBAL);
        assert_eq!(classify_address("10.-1.0.1"), GLOBAL);
    }

    #[test]
    fn test_type_columns_follow_addresses() {
        let table = Table::with_rows(
            vec!["srcIP".into(), "dstIP".into(), "Message".into()],
            vec![vec!["10.1.1.1".into(), "8.8.8.8".into(), "m".into()]],
        );
        let out = AddressClassification
            .apply(table, Path::new("a.csv"))
            .unwrap();
        assert_eq!(
            out.headers(),
            ["srcIP", "srcIP_type", "dstIP", "dstIP_type", "Message"]
        );
        assert_eq!(out.rows()[0], vec!["10.1.1.1", "private", "8.8.8.8", "global", "m"]);
    }

    #[test]
    fn test_missing_dst_column() {
        let table = Table::new(vec!["srcIP".into()]);
        assert!(AddressClassification
            .apply(table, Path::new("a.csv"))
            .is_err());
    }
}
