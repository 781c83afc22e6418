//! Shared state handed to modes, views and commands.
//!
//! The [`Model`] bundles everything a handler may read or edit: the session
//! mirror, the banks paging over it, scale/key state, preferences, timers
//! and transient surface state (modifiers, held buttons, notification).
//! Handlers never own any of it, so switching modes and views loses nothing.

use crate::bank::Bank;
use crate::config::Config;
use crate::keys::KeyManager;
use crate::knob::KnobMotion;
use crate::scales::Scales;
use crate::session::Session;
use crate::settings::{self, Preferences, SettingsStore};
use crate::surface::{ButtonId, SurfaceLayout};
use crate::timer::TimerSlots;
use crossbeam_channel::{unbounded, Receiver};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Single-slot timers used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Knob movement re-check
    KnobRecheck,
    /// Remove the notification overlay
    ClearNotification,
    /// A button has been held long enough
    LongPress(ButtonId),
    /// Write stored preferences to disk
    SaveSettings,
}

/// Quiet time before changed preferences are written out
pub const SETTINGS_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// Banks owned by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankKind {
    Track,
    Scene,
    Send,
    Device,
    Parameter,
}

/// A selection change reported by a bank observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub bank: BankKind,
    pub old: Option<usize>,
    pub new: Option<usize>,
}

/// Modifier buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub select: bool,
}

/// Engine state shared by all handlers.
pub struct Model {
    pub config: Config,
    pub session: Session,
    pub track_bank: Bank,
    pub scene_bank: Bank,
    pub send_bank: Bank,
    pub device_bank: Bank,
    pub parameter_bank: Bank,
    pub scales: Scales,
    pub keys: KeyManager,
    pub preferences: Preferences,
    pub settings: Box<dyn SettingsStore>,
    pub timers: TimerSlots<TimerPurpose>,
    pub knobs: KnobMotion,
    pub modifiers: Modifiers,
    pressed: BTreeSet<ButtonId>,
    long_pressed: BTreeSet<ButtonId>,
    notification: Option<String>,
    refresh_requested: bool,
    now: Instant,
    selections: Receiver<SelectionEvent>,
}

impl Model {
    /// Build the model for a session, reading preferences from `store`.
    pub fn new(
        config: Config,
        session: Session,
        store: Box<dyn SettingsStore>,
        now: Instant,
    ) -> Self {
        let layout = config.surface.clone();
        let (tx, selections) = unbounded();
        let observed = |kind: BankKind, page_size: usize| {
            let tx = tx.clone();
            let mut bank = Bank::new(page_size);
            bank.add_observer(move |old, new| {
                // receiver lives as long as the model
                let _ = tx.send(SelectionEvent {
                    bank: kind,
                    old,
                    new,
                });
            });
            bank
        };

        let mut scales = Scales::for_grid(layout.grid_rows, layout.grid_cols);
        settings::load_scales(store.as_ref(), &mut scales);
        let keys = KeyManager::new(&scales);
        let preferences = Preferences::load(store.as_ref());
        let knobs = KnobMotion::new(config.timing.knob_recheck(), config.timing.knob_timeout());

        let mut model = Self {
            track_bank: observed(BankKind::Track, layout.grid_cols),
            scene_bank: observed(BankKind::Scene, layout.grid_rows),
            send_bank: observed(BankKind::Send, layout.knobs.saturating_sub(2)),
            device_bank: observed(BankKind::Device, layout.row_buttons),
            parameter_bank: observed(BankKind::Parameter, layout.knobs),
            config,
            session,
            scales,
            keys,
            preferences,
            settings: store,
            timers: TimerSlots::new(),
            knobs,
            modifiers: Modifiers::default(),
            pressed: BTreeSet::new(),
            long_pressed: BTreeSet::new(),
            notification: None,
            refresh_requested: false,
            now,
            selections,
        };
        model.sync_banks();
        model
    }

    /// Surface layout
    pub fn layout(&self) -> &SurfaceLayout {
        &self.config.surface
    }

    /// Instant of the event or tick being processed
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    pub fn is_shift(&self) -> bool {
        self.modifiers.shift
    }

    pub fn is_select(&self) -> bool {
        self.modifiers.select
    }

    /// Whether knob input should be scaled down
    pub fn is_fine(&self) -> bool {
        self.modifiers.shift && self.config.behavior.fine_with_shift
    }

    /// Update the held state of a button
    pub fn set_button_pressed(&mut self, id: ButtonId, pressed: bool) {
        if pressed {
            self.pressed.insert(id);
        } else {
            self.pressed.remove(&id);
        }
    }

    pub fn is_button_pressed(&self, id: ButtonId) -> bool {
        self.pressed.contains(&id)
    }

    /// Mark a held button as long-pressed (until it is released)
    pub fn set_long_pressed(&mut self, id: ButtonId, long: bool) {
        if long {
            self.long_pressed.insert(id);
        } else {
            self.long_pressed.remove(&id);
        }
    }

    /// Whether the current press of `id` turned into a long press
    pub fn is_long_pressed(&self, id: ButtonId) -> bool {
        self.long_pressed.contains(&id)
    }

    /// Show a message on the display for the configured time.
    pub fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("[NOTIFY] {}", text);
        self.notification = Some(text);
        let until = self.now + self.config.timing.notification();
        self.timers.schedule(TimerPurpose::ClearNotification, until);
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
        self.timers.cancel(TimerPurpose::ClearNotification);
    }

    /// Ask for a full display refresh on the next tick
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Take a pending refresh request
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Record knob movement and start the re-check timer if needed.
    pub fn on_knob_delta(&mut self) {
        if let Some(at) = self.knobs.on_delta(self.now) {
            self.timers.schedule(TimerPurpose::KnobRecheck, at);
        }
    }

    /// Absolute position of the selected track
    pub fn selected_track(&self) -> Option<usize> {
        self.track_bank.selected()
    }

    /// Absolute position of the selected device
    pub fn selected_device(&self) -> Option<usize> {
        self.device_bank.selected()
    }

    /// Resize every bank to the current session.
    pub fn sync_banks(&mut self) {
        self.track_bank.sync(self.session.tracks.len());
        self.scene_bank.sync(self.session.scenes.len());
        let sends = self
            .selected_track()
            .and_then(|t| self.session.tracks.get(t))
            .or_else(|| self.session.tracks.first())
            .map_or(0, |t| t.sends.len());
        self.send_bank.sync(sends);
        self.device_bank.sync(self.session.devices.len());
        let parameters = self
            .selected_device()
            .and_then(|d| self.session.devices.get(d))
            .map_or(0, |d| d.parameters.len());
        self.parameter_bank.sync(parameters);
    }

    /// Selection changes reported since the last call
    pub fn take_selection_events(&mut self) -> Vec<SelectionEvent> {
        self.selections.try_iter().collect()
    }

    /// Play or release a note and track its pressed state.
    pub fn note_input(&mut self, note: u8, velocity: u8) {
        self.keys.set_key_pressed(note, velocity);
        if velocity > 0 {
            self.session.note_on(note, velocity);
        } else {
            self.session.note_off(note);
        }
    }

    /// Release every held note
    pub fn release_all_notes(&mut self) {
        for note in self.keys.clear_pressed_keys() {
            self.session.note_off(note);
        }
    }

    /// Rebuild the pad translation tables after a scale change
    pub fn update_note_mapping(&mut self) {
        self.keys.update_note_mapping(&self.scales);
    }

    /// Store the scale preferences and schedule a save.
    pub fn persist_scales(&mut self) {
        settings::store_scales(self.settings.as_mut(), &self.scales);
        self.schedule_save();
    }

    /// Store the typed preferences and schedule a save.
    pub fn persist_preferences(&mut self) {
        self.preferences.store(self.settings.as_mut());
        self.schedule_save();
    }

    // every change pushes the save back, so a knob sweep writes once
    fn schedule_save(&mut self) {
        let at = self.now + SETTINGS_SAVE_DELAY;
        self.timers.schedule(TimerPurpose::SaveSettings, at);
    }

    /// Whether stored preferences are waiting to be written
    pub fn save_pending(&self) -> bool {
        self.timers.is_pending(TimerPurpose::SaveSettings)
    }

    /// Write stored preferences now.
    pub fn save_settings(&mut self) {
        self.timers.cancel(TimerPurpose::SaveSettings);
        if let Err(e) = self.settings.persist() {
            log::warn!("[SETTINGS] Failed to save preferences: {}", e);
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("track_bank", &self.track_bank)
            .field("scales", &self.scales)
            .field("modifiers", &self.modifiers)
            .field("notification", &self.notification)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    /// Model over a session with `tracks` tracks and 8 scenes and 4 sends.
    pub(crate) fn model_with_tracks(tracks: usize) -> Model {
        Model::new(
            Config::default(),
            Session::with_tracks(tracks, 8, 4),
            Box::new(MemorySettings::new()),
            Instant::now(),
        )
    }

    #[test]
    fn test_bank_sizes_follow_layout() {
        let model = model_with_tracks(20);
        assert_eq!(model.track_bank.page_size(), 8);
        assert_eq!(model.track_bank.item_count(), 20);
        assert_eq!(model.send_bank.page_size(), 6);
        assert_eq!(model.send_bank.item_count(), 4);
    }

    #[test]
    fn test_selection_events_are_queued() {
        let mut model = model_with_tracks(20);
        model.track_bank.select(3);
        model.track_bank.select_next_item();
        let events = model.take_selection_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].bank, BankKind::Track);
        assert_eq!(events[1].old, Some(3));
        assert_eq!(events[1].new, Some(4));
        assert!(model.take_selection_events().is_empty());
    }

    #[test]
    fn test_notification_expires_via_timer() {
        let mut model = model_with_tracks(1);
        let start = model.now();
        model.notify("Please select a Device...");
        assert_eq!(model.notification(), Some("Please select a Device..."));
        let due = model.timers.poll(start + Duration::from_millis(2000));
        assert_eq!(due, vec![TimerPurpose::ClearNotification]);
    }

    #[test]
    fn test_note_input_tracks_pressed() {
        let mut model = model_with_tracks(1);
        model.note_input(60, 90);
        assert!(model.keys.is_key_pressed(60));
        model.release_all_notes();
        assert!(!model.keys.is_key_pressed(60));
        let changes = model.session.drain_changes();
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_sync_shrinks_banks() {
        let mut model = model_with_tracks(20);
        model.track_bank.select(19);
        model.session.tracks.truncate(10);
        model.sync_banks();
        assert_eq!(model.selected_track(), Some(9));
        assert_eq!(model.track_bank.page_offset(), 8);
    }
}
