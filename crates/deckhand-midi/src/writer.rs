//! Serialized MIDI output.
//!
//! Every byte for a port goes through one writer thread fed by a FIFO
//! channel, so lights, host notes and display frames reach the device in
//! the order they were queued. SysEx frames are spaced by a minimum delay;
//! devices drop display updates that arrive back to back.

use crate::error::{Error, Result};
use crate::message::{is_sysex_bytes, MidiMessage};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Destination of raw MIDI bytes (a port connection, a capture buffer).
pub trait MidiSink: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<T: MidiSink + ?Sized> MidiSink for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }
}

enum WriterMessage {
    Bytes(Vec<u8>),
    Stop,
}

/// Cloneable handle that queues bytes on a [`MidiWriter`].
#[derive(Clone)]
pub struct MidiSender {
    tx: Sender<WriterMessage>,
}

impl MidiSender {
    /// Queue raw bytes
    pub fn send_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        self.tx
            .send(WriterMessage::Bytes(bytes))
            .map_err(|_| Error::WriterStopped)
    }

    /// Queue a message
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        self.send_bytes(message.to_bytes())
    }
}

impl std::fmt::Debug for MidiSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

/// Owner of the writer thread. Dropping it stops the thread once the
/// bytes queued before the drop are written.
pub struct MidiWriter {
    sender: MidiSender,
    thread: Option<JoinHandle<()>>,
}

impl MidiWriter {
    /// Start a writer thread over `sink`.
    pub fn spawn<S: MidiSink + 'static>(sink: S, sysex_spacing: Duration) -> Result<Self> {
        let (tx, rx) = unbounded();
        let thread = thread::Builder::new()
            .name("midi-writer".to_string())
            .spawn(move || run_writer(sink, rx, sysex_spacing))?;

        log::debug!("[SYSEX] Writer started (spacing {:?})", sysex_spacing);
        Ok(Self {
            sender: MidiSender { tx },
            thread: Some(thread),
        })
    }

    /// A handle for queueing from elsewhere (host adapter, output)
    pub fn sender(&self) -> MidiSender {
        self.sender.clone()
    }

    /// Queue a message
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        self.sender.send(message)
    }

    /// Whether the writer thread is alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread after the queued bytes are written.
    pub fn stop(&mut self) {
        let _ = self.sender.tx.send(WriterMessage::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[SYSEX] Writer thread panicked");
            }
        }
    }
}

impl Drop for MidiWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MidiWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiWriter")
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_writer<S: MidiSink>(mut sink: S, rx: Receiver<WriterMessage>, spacing: Duration) {
    let mut last_sysex: Option<Instant> = None;

    for message in rx.iter() {
        let bytes = match message {
            WriterMessage::Bytes(bytes) => bytes,
            WriterMessage::Stop => break,
        };
        let sysex = is_sysex_bytes(&bytes);
        if sysex {
            if let Some(last) = last_sysex {
                let elapsed = last.elapsed();
                if elapsed < spacing {
                    thread::sleep(spacing - elapsed);
                }
            }
        }
        if let Err(e) = sink.send(&bytes) {
            log::warn!("[SYSEX] Dropped {} bytes: {}", bytes.len(), e);
        }
        if sysex {
            last_sysex = Some(Instant::now());
        }
    }
    log::debug!("[SYSEX] Writer stopped");
}

/// Sink that keeps everything it is sent (simulation and tests)
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    frames: std::sync::Arc<std::sync::Mutex<Vec<(Instant, Vec<u8>)>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received so far, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.timed_frames().into_iter().map(|(_, bytes)| bytes).collect()
    }

    /// Bytes received so far with their arrival time
    pub fn timed_frames(&self) -> Vec<(Instant, Vec<u8>)> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl MidiSink for CaptureSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| Error::Send("capture buffer poisoned".to_string()))?;
        frames.push((Instant::now(), bytes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_written_in_queue_order() {
        let sink = CaptureSink::new();
        let mut writer = MidiWriter::spawn(sink.clone(), Duration::ZERO).unwrap();
        let other = writer.sender();
        writer
            .send(&MidiMessage::NoteOn {
                channel: 0,
                note: 36,
                velocity: 5,
            })
            .unwrap();
        other.send_bytes(vec![0xF0, 0x7D, 0xF7]).unwrap();
        writer
            .send(&MidiMessage::ControlChange {
                channel: 0,
                controller: 85,
                value: 21,
            })
            .unwrap();
        writer.stop();

        assert_eq!(
            sink.frames(),
            vec![vec![0x90, 36, 5], vec![0xF0, 0x7D, 0xF7], vec![0xB0, 85, 21]]
        );
    }

    #[test]
    fn test_sysex_frames_are_spaced() {
        let sink = CaptureSink::new();
        let spacing = Duration::from_millis(20);
        let mut writer = MidiWriter::spawn(sink.clone(), spacing).unwrap();
        for cell in 0..3 {
            writer.send(&MidiMessage::SysEx(vec![0x7D, cell])).unwrap();
        }
        writer.stop();

        let frames = sink.timed_frames();
        assert_eq!(frames.len(), 3);
        for pair in frames.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= spacing);
        }
    }

    #[test]
    fn test_send_after_stop_fails() {
        let mut writer = MidiWriter::spawn(CaptureSink::new(), Duration::ZERO).unwrap();
        let sender = writer.sender();
        writer.stop();
        assert!(!writer.is_running());
        assert!(matches!(sender.send_bytes(vec![0x90, 1, 1]), Err(Error::WriterStopped)));
    }

    struct FailingSink;

    impl MidiSink for FailingSink {
        fn send(&mut self, _bytes: &[u8]) -> Result<()> {
            Err(Error::Send("unplugged".to_string()))
        }
    }

    #[test]
    fn test_sink_errors_do_not_stop_writer() {
        let _ = env_logger::builder().is_test(true).try_init();
        let writer = MidiWriter::spawn(FailingSink, Duration::ZERO).unwrap();
        writer.send(&MidiMessage::ProgramChange { channel: 0, program: 1 }).unwrap();
        writer.send(&MidiMessage::ProgramChange { channel: 0, program: 2 }).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(writer.is_running());
    }
}
