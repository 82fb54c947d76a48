//! `key=value` extraction from the Message text.
//!
//! The protocol, SeverityLevel and Severity stages share one shape: search
//! the message with a pattern, take capture group 1, insert it before
//! `Message`.

use crate::error::StageResult;
use crate::stage::TableTransform;
use crate::table::Table;
use regex::Regex;
use sieve_protocol::fields::{MESSAGE, PROTOCOL, SEVERITY, SEVERITY_LEVEL};
use std::path::Path;
use std::sync::LazyLock;

static PROTOCOL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"protocol=(\w+)").unwrap());
static SEVERITY_LEVEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SeverityLevel=(\d+)").unwrap());
static SEVERITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Severity=(\w+)").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct TokenExtraction {
    stage: &'static str,
    field: &'static str,
    pattern: &'static LazyLock<Regex>,
}

impl TokenExtraction {
    pub fn protocol() -> Self {
        Self {
            stage: "protocol",
            field: PROTOCOL,
            pattern: &PROTOCOL_PATTERN,
        }
    }

    pub fn severity_level() -> Self {
        Self {
            stage: "severity-level",
            field: SEVERITY_LEVEL,
            pattern: &SEVERITY_LEVEL_PATTERN,
        }
    }

    pub fn severity() -> Self {
        Self {
            stage: "severity",
            field: SEVERITY,
            pattern: &SEVERITY_PATTERN,
        }
    }

    /// First capture of this token in `message`, or `""`.
    pub fn extract(&self, message: &str) -> String {
        self.pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

impl TableTransform for TokenExtraction {
    fn name(&self) -> &'static str {
        self.stage
    }

    fn apply(&self, mut table: Table, source: &Path) -> StageResult<Table> {
        let message = table.require_column(MESSAGE, source)?;
        let values = table.column(message).map(|m| self.extract(m)).collect();
        table.insert_column(message, self.field, values);
        Ok(table)
    }
}
