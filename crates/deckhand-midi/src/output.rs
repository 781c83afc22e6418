//! [`SurfaceOutput`] over MIDI.

use crate::mapping::SurfaceMapping;
use crate::message::MidiMessage;
use crate::writer::MidiSender;
use deckhand_core::display::{LightId, LightInfo, SurfaceOutput};

/// Encodes light and text writes and queues them on a writer thread.
#[derive(Debug, Clone)]
pub struct MidiSurfaceOutput {
    mapping: SurfaceMapping,
    sender: MidiSender,
    dropped: usize,
}

impl MidiSurfaceOutput {
    pub fn new(mapping: SurfaceMapping, sender: MidiSender) -> Self {
        Self {
            mapping,
            sender,
            dropped: 0,
        }
    }

    /// Writes that could not be queued since creation
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn queue(&mut self, message: &MidiMessage) {
        if let Err(e) = self.sender.send(message) {
            // only the first failure is worth a warning
            if self.dropped == 0 {
                log::warn!("[SURFACE] Output unavailable: {}", e);
            }
            self.dropped += 1;
        }
    }
}

impl SurfaceOutput for MidiSurfaceOutput {
    fn write_light(&mut self, id: LightId, light: LightInfo) {
        for message in self.mapping.encode_light(id, light) {
            self.queue(&message);
        }
    }

    fn write_text(&mut self, row: usize, cell: usize, text: &str) {
        let frame = self.mapping.encode_text(row, cell, text);
        self.queue(&frame);
    }
}
