//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use sieve::PipelineError;
use sieve_protocol::ConfigError;
use sieve_sinks::SinkError;
use sieve_stages::StageError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Directory does not exist
    pub fn dir_not_found(path: &Path, what: &str) -> Self {
        Self::new(format!("{} not found: {}", what, path.display()))
            .with_context("The directory does not exist")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// Config file could not be loaded or is invalid
    pub fn config_error(err: &ConfigError) -> Self {
        let base = Self::new(err.to_string()).with_context("Failed to resolve pipeline settings");
        match err {
            ConfigError::Read { path, .. } => base.with_suggestions([
                format!("TRY: Check the config file exists: ls -la {}", path.display()),
                "TRY: Omit --config to run with built-in defaults".to_string(),
            ]),
            ConfigError::Parse { .. } => base.with_suggestion(
                "TRY: Print a valid config to start from: sieve config --toml",
            ),
            ConfigError::Write { .. } => {
                base.with_suggestion("TRY: Check write permissions for the target directory")
            }
            ConfigError::Invalid { .. } => {
                base.with_suggestion("TRY: Show the resolved settings: sieve config")
            }
        }
    }

    /// A stage or export failed during a run
    pub fn pipeline_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::Config(config) => Self::config_error(config),
            PipelineError::Stage { stage, source } => {
                Self::new(format!("Stage '{}' failed", stage))
                    .with_context(source.to_string())
                    .with_suggestions(stage_suggestions(source))
            }
            PipelineError::Export { source } => Self::new("Spreadsheet export failed")
                .with_context(source.to_string())
                .with_suggestions(sink_suggestions(source)),
        }
    }

    /// Best rendering for any error a command returned.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(helpful) = err.downcast_ref::<HelpfulError>() {
            return Self {
                message: helpful.message.clone(),
                context: helpful.context.clone(),
                suggestions: helpful.suggestions.clone(),
            };
        }
        if let Some(pipeline) = err.downcast_ref::<PipelineError>() {
            return Self::pipeline_error(pipeline);
        }
        if let Some(config) = err.downcast_ref::<ConfigError>() {
            return Self::config_error(config);
        }
        let context = err.chain().skip(1).map(|c| c.to_string()).collect::<Vec<_>>();
        let base = Self::new(err.to_string());
        if context.is_empty() {
            base
        } else {
            base.with_context(context.join(": "))
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
        })
    }
}

fn stage_suggestions(err: &StageError) -> Vec<String> {
    match err {
        StageError::MissingResource { path } => vec![
            format!("TRY: Check that the path exists: ls -la {}", path.display()),
            "TRY: Point --source at the directory holding the .zip exports".to_string(),
        ],
        StageError::Schema { field, file } => vec![
            format!("TRY: Inspect the header: head -n 1 {}", file.display()),
            format!("TRY: Make sure earlier stages produced the '{}' column", field),
        ],
        StageError::ColumnIndex { width, .. } => vec![
            format!("TRY: Use positions below {} in --keep-columns", width),
            "TRY: Select columns by name instead, e.g. --keep-columns Timestamp,Message"
                .to_string(),
        ],
        StageError::Csv { file, .. } => vec![
            format!("TRY: Inspect the raw file: head -n 5 {}", file.display()),
            "TRY: Verify the CSV file is well-formed UTF-8 with a header row".to_string(),
        ],
        StageError::Io { path, .. } => vec![format!(
            "TRY: Check permissions and free space: ls -la {}",
            path.display()
        )],
        StageError::Config(_) => {
            vec!["TRY: Show the resolved settings: sieve config".to_string()]
        }
        StageError::MalformedArchive { path, .. } => vec![format!(
            "TRY: Test the archive: unzip -t {}",
            path.display()
        )],
        StageError::RowCountChanged { .. } => {
            vec!["TRY: Re-run with -v and report the log file".to_string()]
        }
    }
}

fn sink_suggestions(err: &SinkError) -> Vec<String> {
    match err {
        SinkError::TooManyRows { .. } => vec![
            "TRY: Narrow the run with a more specific --keyword".to_string(),
            "TRY: Use --per-file to write one spreadsheet per chunk".to_string(),
        ],
        SinkError::MissingInput { path } | SinkError::Csv { path, .. } => {
            vec![format!("TRY: Check the input table: ls -la {}", path.display())]
        }
        SinkError::Zip { path, .. } | SinkError::Io { path, .. } => vec![format!(
            "TRY: Check the output directory is writable: ls -la {}",
            path.parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        )],
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure as JSON on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let helpful = HelpfulError::from_anyhow(err);
    println!(
        "{}",
        serde_json::to_string_pretty(&helpful.to_json()).unwrap_or_else(|_| helpful.message)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_protocol::StageName;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While processing data")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While processing data"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_stage_error_names_stage_file_and_cause() {
        let err = PipelineError::Stage {
            stage: StageName::RoutingExtraction,
            source: StageError::Schema {
                field: "Message".to_string(),
                file: PathBuf::from("merged_logs/merged_000.csv"),
            },
        };
        let display = HelpfulError::from_anyhow(&anyhow::Error::new(err)).to_string();
        assert!(display.contains("Stage 'routing' failed"));
        assert!(display.contains("merged_logs/merged_000.csv"));
        assert!(display.contains("Message"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_plain_error_keeps_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to copy table");
        let helpful = HelpfulError::from_anyhow(&err);
        assert_eq!(helpful.message, "Failed to copy table");
        assert_eq!(helpful.context.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_json_shape() {
        let json = HelpfulError::new("boom").with_suggestion("TRY: x").to_json();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["suggestions"][0], "TRY: x");
        assert!(json["context"].is_null());
    }
}
