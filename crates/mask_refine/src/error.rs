use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefineError {
    #[error("Invalid input dimensions: expected {expected:?}, got {actual:?}")]
    InvalidInputDimensions {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefineError {
    /// Fails with `InvalidInputDimensions` unless both sizes match
    pub fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::InvalidInputDimensions { expected, actual })
        }
    }
}

pub type Result<T> = std::result::Result<T, RefineError>;
