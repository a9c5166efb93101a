use thiserror::Error;

/// All errors that can occur in paperlens-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid paper id: {0}")]
    InvalidPaperId(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Dedicated exit codes of the `paperlens` binary. Any other error leaves
/// through `main` and exits with 1.
#[repr(i32)]
pub enum ExitCode {
    NotFound = 2,
    InvalidArgs = 3,
    ExtractionError = 4,
    StorageError = 5,
}

pub type Result<T> = std::result::Result<T, CoreError>;
