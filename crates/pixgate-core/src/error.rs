//! Error types for the pixgate core.

use std::path::PathBuf;

/// Core error type for pixgate configuration and start-up.
#[derive(Debug, thiserror::Error)]
pub enum PixGateError {
    /// A configuration value is present but invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience result type for pixgate operations.
pub type PixGateResult<T> = Result<T, PixGateError>;
