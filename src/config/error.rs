use std::path::PathBuf;
use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("settings file {0} is required but missing")]
    MissingFile(PathBuf),

    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A layer is not valid TOML. `name` is the file path or inline label.
    #[error("settings layer '{name}' is not valid TOML: {source}")]
    Syntax {
        name: String,
        source: toml::de::Error,
    },

    /// The merged layers do not fit the settings schema.
    #[error("settings do not match the expected shape: {0}")]
    Shape(#[from] toml::de::Error),

    #[error("setting '{key}' rejected: {reason}")]
    InvalidValue { key: String, reason: String },
}
