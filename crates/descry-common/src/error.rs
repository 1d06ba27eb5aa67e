use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Record '{0}' has no candidate hits")]
    EmptyRecord(String),

    #[error("Invalid blacklist pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DescryError>;
