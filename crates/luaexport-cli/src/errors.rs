//! User-facing failures of the luaexport commands

use luaexport_ast::AnalysisError;
use luaexport_config::ConfigError;
use luaexport_manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No tree dumps (*.json) found under: {0}")]
    NoInputs(String),

    #[error("Input path does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("Failed to analyze {path}: {source}")]
    Analysis {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },

    #[error("{0} diagnostic(s) reported in strict mode")]
    StrictDiagnostics(usize),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Diagnostics log error: {0}")]
    DiagnosticsLog(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_strict_diagnostics_display() {
        let err = CliError::StrictDiagnostics(3);
        assert_eq!(err.to_string(), "3 diagnostic(s) reported in strict mode");
    }

    #[test]
    fn test_analysis_error_names_input() {
        let err = CliError::Analysis {
            path: PathBuf::from("dumps/empty.json"),
            source: AnalysisError::MissingFilePath,
        };
        assert_eq!(
            err.to_string(),
            "Failed to analyze dumps/empty.json: Translation unit has no file path"
        );
    }
}
