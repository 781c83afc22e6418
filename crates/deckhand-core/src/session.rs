//! Mirror of the host's session model.
//!
//! The engine reads and edits this mirror directly. Every edit is also
//! recorded as a [`SessionChange`]; the surface drains the change log once
//! per refresh tick and hands each change to the [`HostAdapter`], which owns
//! the real connection to the DAW.

use crate::error::Result;
use std::collections::BTreeMap;

/// Lowest tempo the transport accepts (BPM)
pub const MIN_TEMPO: f64 = 20.0;
/// Highest tempo the transport accepts (BPM)
pub const MAX_TEMPO: f64 = 666.0;

/// One clip slot of a track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSlot {
    pub has_content: bool,
    pub playing: bool,
    pub recording: bool,
    pub color: u8,
}

/// A host track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub color: u8,
    /// Normalized 0.0..=1.0
    pub volume: f64,
    /// Normalized 0.0..=1.0, 0.5 = centre
    pub pan: f64,
    pub mute: bool,
    pub solo: bool,
    pub arm: bool,
    /// Normalized send levels, one per send
    pub sends: Vec<f64>,
    /// Clip slots, one per scene
    pub slots: Vec<ClipSlot>,
}

impl Track {
    /// Create a track with default mixer settings
    pub fn new(name: impl Into<String>, color: u8) -> Self {
        Self {
            name: name.into(),
            color,
            volume: 0.79,
            pan: 0.5,
            mute: false,
            solo: false,
            arm: false,
            sends: Vec::new(),
            slots: Vec::new(),
        }
    }
}

/// A host scene
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub color: u8,
}

/// A remote-controllable device parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Normalized 0.0..=1.0
    pub value: f64,
}

/// A device in the selected track's chain
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// Transport state
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    pub playing: bool,
    pub recording: bool,
    pub metronome: bool,
    /// Beats per minute
    pub tempo: f64,
    /// Play position in beats
    pub position: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            metronome: false,
            tempo: 120.0,
            position: 0.0,
        }
    }
}

/// Note steps of the clip the sequencers edit.
///
/// Steps are keyed by `(step, note)` and store the velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorClip {
    steps: BTreeMap<(u32, u8), u8>,
    /// Clip length in steps
    pub length: u32,
    /// Step length in beats
    pub step_length: f64,
}

impl Default for CursorClip {
    fn default() -> Self {
        Self {
            steps: BTreeMap::new(),
            length: 64,
            step_length: 0.25,
        }
    }
}

impl CursorClip {
    /// Velocity of a step, if set
    pub fn step(&self, step: u32, note: u8) -> Option<u8> {
        self.steps.get(&(step, note)).copied()
    }

    /// Whether any note is set at `step`
    pub fn has_step(&self, step: u32) -> bool {
        self.steps.range((step, 0)..=(step, 127)).next().is_some()
    }

    /// Number of set steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All set steps as `((step, note), velocity)`
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u8), u8)> + '_ {
        self.steps.iter().map(|(k, v)| (*k, *v))
    }
}

/// An edit made by the engine that the host has to replay
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    SelectTrack(usize),
    SelectDevice(usize),
    TrackVolume { track: usize, value: f64 },
    TrackPan { track: usize, value: f64 },
    TrackSend { track: usize, send: usize, value: f64 },
    TrackMute { track: usize, value: bool },
    TrackSolo { track: usize, value: bool },
    TrackArm { track: usize, value: bool },
    Parameter { device: usize, parameter: usize, value: f64 },
    Tempo(f64),
    Position(f64),
    Play,
    Stop,
    Record(bool),
    Metronome(bool),
    LaunchClip { track: usize, scene: usize },
    RecordClip { track: usize, scene: usize },
    StopTrack(usize),
    LaunchScene(usize),
    CreateScene,
    Step { step: u32, note: u8, velocity: Option<u8> },
    StepLength(f64),
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    PolyPressure { note: u8, pressure: u8 },
    ChannelPressure(u8),
    PitchBend(u16),
    ControlChange { controller: u8, value: u8 },
}

/// The host side of the engine.
pub trait HostAdapter {
    /// Replay one change on the host.
    fn apply(&mut self, change: &SessionChange) -> Result<()>;

    /// Pull host-side updates into the mirror. Called once per refresh tick.
    fn poll(&mut self, _session: &mut Session) -> Result<()> {
        Ok(())
    }
}

/// Host that accepts everything and keeps a log (simulation and tests)
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub applied: Vec<SessionChange>,
}

impl HostAdapter for MemoryHost {
    fn apply(&mut self, change: &SessionChange) -> Result<()> {
        self.applied.push(change.clone());
        Ok(())
    }
}

/// The mirrored session plus the log of pending changes.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub tracks: Vec<Track>,
    pub scenes: Vec<Scene>,
    /// Device chain of the selected track
    pub devices: Vec<Device>,
    pub transport: Transport,
    pub clip: CursorClip,
    changes: Vec<SessionChange>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with `tracks` tracks, `scenes` scenes and `sends` sends per
    /// track, all slots empty.
    pub fn with_tracks(tracks: usize, scenes: usize, sends: usize) -> Self {
        let mut session = Self::new();
        for s in 0..scenes {
            session.scenes.push(Scene {
                name: format!("Scene {}", s + 1),
                color: 0,
            });
        }
        for t in 0..tracks {
            let mut track = Track::new(format!("Track {}", t + 1), (t % 12 * 4 + 5) as u8);
            track.sends = vec![0.0; sends];
            track.slots = vec![ClipSlot::default(); scenes];
            session.tracks.push(track);
        }
        session
    }

    /// Take every change recorded since the last drain
    pub fn drain_changes(&mut self) -> Vec<SessionChange> {
        std::mem::take(&mut self.changes)
    }

    /// Changes not yet drained
    pub fn pending_changes(&self) -> &[SessionChange] {
        &self.changes
    }

    fn record(&mut self, change: SessionChange) {
        self.changes.push(change);
    }

    pub fn select_track(&mut self, track: usize) {
        if track < self.tracks.len() {
            self.record(SessionChange::SelectTrack(track));
        }
    }

    pub fn select_device(&mut self, device: usize) {
        if device < self.devices.len() {
            self.record(SessionChange::SelectDevice(device));
        }
    }

    pub fn set_track_volume(&mut self, track: usize, value: f64) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        t.volume = value.clamp(0.0, 1.0);
        let value = t.volume;
        self.record(SessionChange::TrackVolume { track, value });
    }

    pub fn set_track_pan(&mut self, track: usize, value: f64) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        t.pan = value.clamp(0.0, 1.0);
        let value = t.pan;
        self.record(SessionChange::TrackPan { track, value });
    }

    pub fn set_track_send(&mut self, track: usize, send: usize, value: f64) {
        let Some(level) = self
            .tracks
            .get_mut(track)
            .and_then(|t| t.sends.get_mut(send))
        else {
            return;
        };
        *level = value.clamp(0.0, 1.0);
        let value = *level;
        self.record(SessionChange::TrackSend { track, send, value });
    }

    pub fn toggle_mute(&mut self, track: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        t.mute = !t.mute;
        let value = t.mute;
        self.record(SessionChange::TrackMute { track, value });
    }

    pub fn toggle_solo(&mut self, track: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        t.solo = !t.solo;
        let value = t.solo;
        self.record(SessionChange::TrackSolo { track, value });
    }

    pub fn toggle_arm(&mut self, track: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        t.arm = !t.arm;
        let value = t.arm;
        self.record(SessionChange::TrackArm { track, value });
    }

    pub fn set_parameter(&mut self, device: usize, parameter: usize, value: f64) {
        let Some(p) = self
            .devices
            .get_mut(device)
            .and_then(|d| d.parameters.get_mut(parameter))
        else {
            return;
        };
        p.value = value.clamp(0.0, 1.0);
        let value = p.value;
        self.record(SessionChange::Parameter {
            device,
            parameter,
            value,
        });
    }

    /// Set the tempo, clamped to [`MIN_TEMPO`]..=[`MAX_TEMPO`]
    pub fn set_tempo(&mut self, bpm: f64) {
        self.transport.tempo = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.record(SessionChange::Tempo(self.transport.tempo));
    }

    /// Set the play position in beats (not before the start)
    pub fn set_position(&mut self, beats: f64) {
        self.transport.position = beats.max(0.0);
        self.record(SessionChange::Position(self.transport.position));
    }

    pub fn play(&mut self) {
        self.transport.playing = true;
        self.record(SessionChange::Play);
    }

    /// Stop playback; a second stop while stopped rewinds to the start.
    pub fn stop(&mut self) {
        if !self.transport.playing {
            self.transport.position = 0.0;
        }
        self.transport.playing = false;
        self.record(SessionChange::Stop);
    }

    pub fn toggle_play(&mut self) {
        if self.transport.playing {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn toggle_record(&mut self) {
        self.transport.recording = !self.transport.recording;
        self.record(SessionChange::Record(self.transport.recording));
    }

    pub fn toggle_metronome(&mut self) {
        self.transport.metronome = !self.transport.metronome;
        self.record(SessionChange::Metronome(self.transport.metronome));
    }

    /// Launch the clip in a slot.
    ///
    /// Empty slots record on armed tracks and stop the track otherwise.
    pub fn launch_slot(&mut self, track: usize, scene: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        let armed = t.arm;
        let Some(has_content) = t.slots.get(scene).map(|s| s.has_content) else {
            return;
        };
        for slot in &mut t.slots {
            slot.playing = false;
            slot.recording = false;
        }
        let slot = &mut t.slots[scene];
        if has_content {
            slot.playing = true;
            self.record(SessionChange::LaunchClip { track, scene });
        } else if armed {
            slot.has_content = true;
            slot.recording = true;
            self.record(SessionChange::RecordClip { track, scene });
        } else {
            self.record(SessionChange::StopTrack(track));
        }
    }

    pub fn stop_track(&mut self, track: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        for slot in &mut t.slots {
            slot.playing = false;
            slot.recording = false;
        }
        self.record(SessionChange::StopTrack(track));
    }

    /// Launch every clip of a scene
    pub fn launch_scene(&mut self, scene: usize) {
        if scene >= self.scenes.len() {
            return;
        }
        for t in &mut self.tracks {
            let has_content = t.slots.get(scene).is_some_and(|s| s.has_content);
            if !has_content {
                continue;
            }
            for slot in &mut t.slots {
                slot.playing = false;
            }
            t.slots[scene].playing = true;
        }
        self.record(SessionChange::LaunchScene(scene));
    }

    /// Append an empty scene
    pub fn create_scene(&mut self) {
        self.scenes.push(Scene {
            name: format!("Scene {}", self.scenes.len() + 1),
            color: 0,
        });
        for t in &mut self.tracks {
            t.slots.push(ClipSlot::default());
        }
        self.record(SessionChange::CreateScene);
    }

    /// Toggle a step of the cursor clip. Returns whether the step is now set.
    pub fn toggle_step(&mut self, step: u32, note: u8, velocity: u8) -> bool {
        if self.clip.steps.remove(&(step, note)).is_some() {
            self.record(SessionChange::Step {
                step,
                note,
                velocity: None,
            });
            false
        } else {
            self.clip.steps.insert((step, note), velocity);
            self.record(SessionChange::Step {
                step,
                note,
                velocity: Some(velocity),
            });
            true
        }
    }

    pub fn set_step_length(&mut self, beats: f64) {
        self.clip.step_length = beats;
        self.record(SessionChange::StepLength(beats));
    }

    pub fn note_on(&mut self, note: u8, velocity: u8) {
        self.record(SessionChange::NoteOn { note, velocity });
    }

    pub fn note_off(&mut self, note: u8) {
        self.record(SessionChange::NoteOff { note });
    }

    pub fn poly_pressure(&mut self, note: u8, pressure: u8) {
        self.record(SessionChange::PolyPressure { note, pressure });
    }

    pub fn channel_pressure(&mut self, pressure: u8) {
        self.record(SessionChange::ChannelPressure(pressure));
    }

    pub fn pitch_bend(&mut self, value: u16) {
        self.record(SessionChange::PitchBend(value.min(16383)));
    }

    pub fn control_change(&mut self, controller: u8, value: u8) {
        self.record(SessionChange::ControlChange { controller, value });
    }
}
