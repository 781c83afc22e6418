//! System MIDI ports via midir.

use crate::error::{Error, Result};
use crate::mapping::SurfaceMapping;
use crate::message::MidiMessage;
use crate::writer::MidiSink;
use crossbeam_channel::Sender;
use deckhand_core::surface::ControlEvent;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

/// Names of the available input ports
pub fn list_input_ports(client_name: &str) -> Result<Vec<String>> {
    let midi_in = MidiInput::new(client_name).map_err(|e| Error::Connection(e.to_string()))?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Port {}", i))
        })
        .collect())
}

/// Names of the available output ports
pub fn list_output_ports(client_name: &str) -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| Error::Connection(e.to_string()))?;
    Ok(midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Port {}", i))
        })
        .collect())
}

/// An open input port. Events stop when this is dropped.
pub struct SurfaceInput {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl SurfaceInput {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SurfaceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceInput").field("name", &self.name).finish()
    }
}

/// Open the first input port whose name contains `name` (case-insensitive)
/// and send its decoded events to `events`.
pub fn open_input(
    client_name: &str,
    name: &str,
    mapping: SurfaceMapping,
    events: Sender<ControlEvent>,
) -> Result<SurfaceInput> {
    let midi_in = MidiInput::new(client_name).map_err(|e| Error::Connection(e.to_string()))?;
    let wanted = name.to_lowercase();
    let ports = midi_in.ports();
    let (port, port_name) = ports
        .iter()
        .find_map(|port| {
            let port_name = midi_in.port_name(port).ok()?;
            port_name
                .to_lowercase()
                .contains(&wanted)
                .then(|| (port.clone(), port_name))
        })
        .ok_or_else(|| Error::PortNotFound(name.to_string()))?;

    let connection = midi_in
        .connect(
            &port,
            "deckhand-in",
            move |_timestamp, bytes, _| {
                let Some(message) = MidiMessage::from_bytes(bytes) else {
                    return;
                };
                match mapping.decode(&message) {
                    Some(event) => {
                        let _ = events.send(event);
                    }
                    None => log::trace!("[MIDI] Unmapped {:?}", message),
                }
            },
            (),
        )
        .map_err(|e| Error::Connection(e.to_string()))?;

    log::info!("[MIDI] Connected input: {}", port_name);
    Ok(SurfaceInput {
        name: port_name,
        _connection: connection,
    })
}

/// An open output port
pub struct MidirSink {
    name: String,
    connection: MidiOutputConnection,
}

impl MidirSink {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.connection
            .send(bytes)
            .map_err(|e| Error::Send(e.to_string()))
    }
}

/// Open the first output port whose name contains `name` (case-insensitive).
pub fn open_output(client_name: &str, name: &str) -> Result<MidirSink> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| Error::Connection(e.to_string()))?;
    let wanted = name.to_lowercase();
    let ports = midi_out.ports();
    let (port, port_name) = ports
        .iter()
        .find_map(|port| {
            let port_name = midi_out.port_name(port).ok()?;
            port_name
                .to_lowercase()
                .contains(&wanted)
                .then(|| (port.clone(), port_name))
        })
        .ok_or_else(|| Error::PortNotFound(name.to_string()))?;

    let connection = midi_out
        .connect(&port, "deckhand-out")
        .map_err(|e| Error::Connection(e.to_string()))?;

    log::info!("[MIDI] Connected output: {}", port_name);
    Ok(MidirSink {
        name: port_name,
        connection,
    })
}
