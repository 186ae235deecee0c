use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Invalid grid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: i32, cols: i32 },

    #[error("Invalid cell size: {0}")]
    InvalidCellSize(f32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type NavResult<T> = Result<T, NavError>;
