//! Error types for deckhand-midi

use thiserror::Error;

/// Result type alias for MIDI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in deckhand-midi
#[derive(Debug, Error)]
pub enum Error {
    /// No port matched the requested name
    #[error("MIDI port not found: {0}")]
    PortNotFound(String),

    /// The MIDI backend refused to open or connect a port
    #[error("MIDI connection error: {0}")]
    Connection(String),

    /// Sending to a port failed
    #[error("MIDI send error: {0}")]
    Send(String),

    /// The writer thread is gone
    #[error("MIDI writer stopped")]
    WriterStopped,

    /// Engine error
    #[error(transparent)]
    Core(#[from] deckhand_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
