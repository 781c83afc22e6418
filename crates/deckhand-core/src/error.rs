//! Error types for deckhand-core

use thiserror::Error;

/// Result type alias for deckhand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in deckhand-core
///
/// Nothing on the live input path returns these. They surface at setup time
/// (configuration, opening optional peripherals) and at the host boundary,
/// where callers log them and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An optional peripheral could not be found at open time
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A peripheral went away while it was being polled
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// The host rejected a change pushed to it
    #[error("Host error: {0}")]
    Host(String),

    /// Persisted preference could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
