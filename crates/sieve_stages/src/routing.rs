//! Routing extraction: pull `src/port > dst/port` out of the Message text.

use crate::error::StageResult;
use crate::stage::TableTransform;
use crate::table::Table;
use regex::Regex;
use sieve_protocol::fields::{MESSAGE, ROUTING};
use std::path::Path;
use std::sync::LazyLock;

static ROUTING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})/\d+ > (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})/\d+")
        .unwrap()
});

/// `"ADDR1 > ADDR2"` for the first address pair in `message`, ports dropped.
/// Empty when there is none.
pub fn extract_routing(message: &str) -> String {
    ROUTING_PATTERN
        .captures(message)
        .map(|caps| format!("{} > {}", &caps[1], &caps[2]))
        .unwrap_or_default()
}

/// Inserts `routing` immediately before `Message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingExtraction;

impl TableTransform for RoutingExtraction {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn apply(&self, mut table: Table, source: &Path) -> StageResult<Table> {
        let message = table.require_column(MESSAGE, source)?;
        let values = table.column(message).map(extract_routing).collect();
        table.insert_column(message, ROUTING, values);
        Ok(table)
    }
}
