

use thiserror::Error;


#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed knowledge record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate knowledge entry id: {0}")]
    DuplicateId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RagError {
    pub fn json(line: usize, source: serde_json::Error) -> Self {
        Self::Json { line, source }
    }
}


pub type Result<T> = std::result::Result<T, RagError>;
