use thiserror::Error;

#[derive(Error, Debug)]
pub enum IncrcovError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed instrumentation: {0}")]
    MalformedInstrumentation(String),

    #[error("Malformed diff: {0}")]
    MalformedDiff(String),

    #[error("Invalid path-root pattern: {0}")]
    PathPattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, IncrcovError>;
