//! Host adapter that plays the surface's notes into a MIDI port.
//!
//! Only the performance part of the session log has a MIDI form; mixer,
//! clip and transport changes stay in the mirror and are logged at trace
//! level.

use crate::message::MidiMessage;
use crate::writer::MidiSender;
use deckhand_core::error::{Error, Result};
use deckhand_core::session::{HostAdapter, SessionChange};

/// Forwards notes, pressure, pitch bend and CCs to a MIDI port.
#[derive(Debug, Clone)]
pub struct MidiHost {
    sender: MidiSender,
    channel: u8,
}

impl MidiHost {
    pub fn new(sender: MidiSender, channel: u8) -> Self {
        Self {
            sender,
            channel: channel & 0x0F,
        }
    }

    /// MIDI form of a change, if it has one
    pub fn to_message(&self, change: &SessionChange) -> Option<MidiMessage> {
        let channel = self.channel;
        let message = match *change {
            SessionChange::NoteOn { note, velocity } => MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
            SessionChange::NoteOff { note } => MidiMessage::NoteOff { channel, note },
            SessionChange::PolyPressure { note, pressure } => MidiMessage::PolyAftertouch {
                channel,
                note,
                pressure,
            },
            SessionChange::ChannelPressure(pressure) => {
                MidiMessage::ChannelAftertouch { channel, pressure }
            }
            SessionChange::PitchBend(value) => MidiMessage::PitchBend { channel, value },
            SessionChange::ControlChange { controller, value } => MidiMessage::ControlChange {
                channel,
                controller,
                value,
            },
            _ => return None,
        };
        Some(message)
    }
}

impl HostAdapter for MidiHost {
    fn apply(&mut self, change: &SessionChange) -> Result<()> {
        match self.to_message(change) {
            Some(message) => self
                .sender
                .send(&message)
                .map_err(|e| Error::Host(e.to_string())),
            None => {
                log::trace!("[HOST] No MIDI form for {:?}", change);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{CaptureSink, MidiWriter};
    use std::time::Duration;

    #[test]
    fn test_performance_changes_forwarded() {
        let sink = CaptureSink::new();
        let mut writer = MidiWriter::spawn(sink.clone(), Duration::ZERO).unwrap();
        let mut host = MidiHost::new(writer.sender(), 1);

        host.apply(&SessionChange::NoteOn { note: 48, velocity: 100 }).unwrap();
        host.apply(&SessionChange::Play).unwrap();
        host.apply(&SessionChange::PitchBend(8192)).unwrap();
        host.apply(&SessionChange::NoteOff { note: 48 }).unwrap();
        writer.stop();

        assert_eq!(
            sink.frames(),
            vec![vec![0x91, 48, 100], vec![0xE1, 0x00, 0x40], vec![0x81, 48, 0]]
        );
    }

    #[test]
    fn test_stopped_writer_is_host_error() {
        let mut writer = MidiWriter::spawn(CaptureSink::new(), Duration::ZERO).unwrap();
        let mut host = MidiHost::new(writer.sender(), 0);
        writer.stop();
        assert!(matches!(
            host.apply(&SessionChange::ChannelPressure(10)),
            Err(Error::Host(_))
        ));
        // no MIDI form, nothing to fail
        assert!(host.apply(&SessionChange::Stop).is_ok());
    }
}
