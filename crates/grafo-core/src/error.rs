//! Error taxonomy and process exit codes

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GrafoError>;

#[derive(Debug, Error)]
pub enum GrafoError {
    /// Invalid regex, malformed CLI argument, missing required input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Severity-error diagnostics under strict mode.
    #[error("compilation of '{project}' failed with {error_count} error(s)")]
    Compilation { project: String, error_count: usize },

    /// The host could not produce a compilation at all.
    #[error("unable to bind '{project}': {reason}")]
    Binding {
        project: String,
        reason: String,
        /// Actionable remediation hints surfaced to the caller.
        hints: Vec<String>,
    },

    /// Malformed node encountered during emission. Recoverable per line;
    /// fatal only when the output file itself cannot be written.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bulk write failure that survived the in-batch retry.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// User interrupt.
    #[error("interrupted")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GrafoError {
    /// CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GrafoError::Configuration(_) => 1,
            GrafoError::Compilation { .. } => 2,
            GrafoError::Binding { .. } => 2,
            GrafoError::Serialization(_) => 1,
            GrafoError::Ingest(_) => 3,
            GrafoError::Cancelled => 130,
            GrafoError::Io(_) => 1,
        }
    }

    pub fn binding(project: impl Into<String>, reason: impl Into<String>) -> Self {
        GrafoError::Binding {
            project: project.into(),
            reason: reason.into(),
            hints: vec![
                "check that the .NET SDK is installed and on PATH".to_string(),
                "run `dotnet build` manually to inspect the failure".to_string(),
                "verify the project file is well-formed XML".to_string(),
            ],
        }
    }
}
