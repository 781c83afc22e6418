//! deckhand-midi - MIDI transport for deckhand surfaces
//!
//! - [`MidiMessage`]: raw byte codec
//! - [`SurfaceMapping`]: notes/CCs to [`ControlEvent`]s, lights and display
//!   cells to notes/CCs/SysEx
//! - [`MidiWriter`]: one FIFO writer thread per port with SysEx spacing
//! - [`MidiSurfaceOutput`] and [`MidiHost`]: the engine's output and host
//!   sides over a writer
//! - `ports` (feature `native`): system ports through midir
//!
//! [`ControlEvent`]: deckhand_core::ControlEvent

pub mod error;
pub mod host;
pub mod mapping;
pub mod message;
pub mod output;
#[cfg(feature = "native")]
pub mod ports;
pub mod writer;

pub use error::{Error, Result};
pub use host::MidiHost;
pub use mapping::SurfaceMapping;
pub use message::MidiMessage;
pub use output::MidiSurfaceOutput;
#[cfg(feature = "native")]
pub use ports::{
    list_input_ports, list_output_ports, open_input, open_output, MidirSink, SurfaceInput,
};
pub use writer::{CaptureSink, MidiSender, MidiSink, MidiWriter};
