use serde::{Deserialize, Serialize};
use std::fmt;

/// Every step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    #[value(name = "extract")]
    ArchiveExtraction,
    #[value(name = "keyword-filter")]
    KeywordFilter,
    #[value(name = "merge")]
    MergeRechunk,
    #[value(name = "project")]
    ColumnProjection,
    #[value(name = "routing")]
    RoutingExtraction,
    #[value(name = "split-ip")]
    AddressSplit,
    #[value(name = "classify-ip")]
    AddressClassification,
    #[value(name = "protocol")]
    ProtocolExtraction,
    #[value(name = "severity-level")]
    SeverityLevelExtraction,
    #[value(name = "severity")]
    SeverityExtraction,
    #[value(name = "severity-filter")]
    SeverityFilter,
    #[value(name = "export")]
    SpreadsheetExport,
}

impl StageName {
    pub const ALL: [StageName; 12] = [
        StageName::ArchiveExtraction,
        StageName::KeywordFilter,
        StageName::MergeRechunk,
        StageName::ColumnProjection,
        StageName::RoutingExtraction,
        StageName::AddressSplit,
        StageName::AddressClassification,
        StageName::ProtocolExtraction,
        StageName::SeverityLevelExtraction,
        StageName::SeverityExtraction,
        StageName::SeverityFilter,
        StageName::SpreadsheetExport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::ArchiveExtraction => "extract",
            StageName::KeywordFilter => "keyword-filter",
            StageName::MergeRechunk => "merge",
            StageName::ColumnProjection => "project",
            StageName::RoutingExtraction => "routing",
            StageName::AddressSplit => "split-ip",
            StageName::AddressClassification => "classify-ip",
            StageName::ProtocolExtraction => "protocol",
            StageName::SeverityLevelExtraction => "severity-level",
            StageName::SeverityExtraction => "severity",
            StageName::SeverityFilter => "severity-filter",
            StageName::SpreadsheetExport => "export",
        }
    }

    /// Scratch directory the stage writes into. Export writes to the
    /// configured output directory instead.
    pub fn scratch_dir_name(&self) -> Option<&'static str> {
        match self {
            StageName::ArchiveExtraction => Some("temp_extracted"),
            StageName::KeywordFilter => Some("filtered_logs"),
            StageName::MergeRechunk => Some("merged_logs"),
            StageName::ColumnProjection => Some("reduced_logs"),
            StageName::RoutingExtraction => Some("routed_logs"),
            StageName::AddressSplit => Some("splitted_logs"),
            StageName::AddressClassification => Some("classified_logs"),
            StageName::ProtocolExtraction => Some("protocol_extracted"),
            StageName::SeverityLevelExtraction => Some("severity_level_extracted"),
            StageName::SeverityExtraction => Some("severity_extracted"),
            StageName::SeverityFilter => Some("critical_only"),
            StageName::SpreadsheetExport => None,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_scratch_dirs_are_unique() {
        let dirs: Vec<_> = StageName::ALL
            .iter()
            .filter_map(|stage| stage.scratch_dir_name())
            .collect();
        let unique: HashSet<_> = dirs.iter().collect();
        assert_eq!(dirs.len(), unique.len());
        assert_eq!(dirs.len(), StageName::ALL.len() - 1);
    }

    #[test]
    fn test_names_match_cli_values() {
        use clap::ValueEnum;
        for stage in StageName::ALL {
            let value = stage.to_possible_value().unwrap();
            assert_eq!(value.get_name(), stage.as_str());
        }
    }
}
