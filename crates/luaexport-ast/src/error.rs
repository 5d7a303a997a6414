use thiserror::Error;

/// Fatal problems with the tree handed to the driver
///
/// These are structural: the analysis refuses to start. Everything that can
/// be recovered is reported as a `Diagnostic` instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Translation unit has no file path")]
    MissingFilePath,

    #[error("{kind} '{name}' in {file} is declared outside of a record")]
    MemberOutsideRecord {
        kind: &'static str,
        name: String,
        file: String,
    },

    #[error("Declaration '{name}' nests deeper than {limit} scopes")]
    NestingTooDeep { name: String, limit: usize },

    #[error("Annotation prefix must not be empty")]
    EmptyAnnotationPrefix,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tree dump: {0}")]
    Parse(#[from] serde_json::Error),
}
