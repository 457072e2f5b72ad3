use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<config::ConfigError> for MineError {
    fn from(err: config::ConfigError) -> Self {
        MineError::Config(err.to_string())
    }
}

impl From<url::ParseError> for MineError {
    fn from(err: url::ParseError) -> Self {
        MineError::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MineError>;
