//! Poll-thread hand-off for inputs without event callbacks.
//!
//! Devices such as gamepads only report their current state. An
//! [`InputPoller`] reads a [`PollSource`] on its own thread and forwards the
//! decoded [`ControlEvent`]s over a channel. The dispatch thread drains the
//! channel during its refresh tick; the poll thread never touches engine
//! state.

use crate::display::DiffBuffer;
use crate::error::{Error, Result};
use crate::surface::{ButtonId, ControlEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A device read by polling.
pub trait PollSource: Send {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Read the device and return the events since the last call.
    ///
    /// An error stops the poller. A device that went away reports
    /// [`Error::Disconnected`].
    fn poll(&mut self) -> Result<Vec<ControlEvent>>;
}

/// Turns full state snapshots into change events.
///
/// Buttons become [`ControlEvent::Button`], axes become absolute
/// [`ControlEvent::Knob`] values.
#[derive(Debug, Default)]
pub struct StateTracker {
    buttons: DiffBuffer<ButtonId, bool>,
    axes: DiffBuffer<usize, u16>,
    seen: bool,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a snapshot with the previous one.
    ///
    /// The first snapshot only records state; released buttons and resting
    /// axes at start-up are not reported.
    pub fn update(&mut self, buttons: &[(ButtonId, bool)], axes: &[u16]) -> Vec<ControlEvent> {
        let pressed = self.buttons.diff(buttons.iter().copied());
        let moved = self.axes.diff(axes.iter().copied().enumerate());
        if !std::mem::replace(&mut self.seen, true) {
            return pressed
                .into_iter()
                .filter(|(_, down)| *down)
                .map(|(id, pressed)| ControlEvent::Button {
                    id,
                    pressed,
                    velocity: 127,
                })
                .collect();
        }
        let buttons = pressed.into_iter().map(|(id, pressed)| ControlEvent::Button {
            id,
            pressed,
            velocity: if pressed { 127 } else { 0 },
        });
        let axes = moved
            .into_iter()
            .map(|(index, raw)| ControlEvent::Knob { index, raw });
        buttons.chain(axes).collect()
    }
}

/// A [`PollSource`] running on its own thread.
pub struct InputPoller {
    name: String,
    events: Receiver<ControlEvent>,
    shutdown: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<String>>>,
    thread: Option<JoinHandle<()>>,
}

impl InputPoller {
    /// Start polling `source` every `interval`.
    pub fn spawn<S: PollSource + 'static>(source: S, interval: Duration) -> Result<Self> {
        let name = source.name().to_string();
        let (tx, rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let failure = Arc::new(Mutex::new(None));
        let failure_clone = failure.clone();

        let thread = thread::Builder::new()
            .name(format!("poll-{}", name))
            .spawn(move || run_poller(source, tx, shutdown_clone, failure_clone, interval))?;
        log::info!("[POLLER] Polling {} every {:?}", name, interval);

        Ok(Self {
            name,
            events: rx,
            shutdown,
            failure,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A receiver for the engine's input list
    pub fn receiver(&self) -> Receiver<ControlEvent> {
        self.events.clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Option<ControlEvent> {
        self.events.try_recv().ok()
    }

    /// Whether the poll thread is still running
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Fails with [`Error::Disconnected`] once the source stopped on an error.
    pub fn check(&self) -> Result<()> {
        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        match failure {
            Some(reason) => Err(Error::Disconnected(format!("{}: {}", self.name, reason))),
            None => Ok(()),
        }
    }

    /// Stop the thread and wait for it.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[POLLER] {} thread panicked", self.name);
            }
        }
    }
}

impl Drop for InputPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InputPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputPoller")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_poller<S: PollSource>(
    mut source: S,
    tx: Sender<ControlEvent>,
    shutdown: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<String>>>,
    interval: Duration,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match source.poll() {
            Ok(events) => {
                for event in events {
                    if tx.send(event).is_err() {
                        // every receiver is gone
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("[POLLER] {} stopped: {}", source.name(), e);
                if let Ok(mut failure) = failure.lock() {
                    *failure = Some(e.to_string());
                }
                return;
            }
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Instant;

    struct Scripted {
        batches: VecDeque<Result<Vec<ControlEvent>>>,
    }

    impl PollSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn poll(&mut self) -> Result<Vec<ControlEvent>> {
            self.batches.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn pad(index: usize) -> ControlEvent {
        ControlEvent::Pad {
            index,
            velocity: 100,
        }
    }

    #[test]
    fn test_events_reach_receiver_in_order() {
        let source = Scripted {
            batches: VecDeque::from(vec![Ok(vec![pad(1), pad(2)]), Ok(vec![]), Ok(vec![pad(3)])]),
        };
        let poller = InputPoller::spawn(source, Duration::from_millis(1)).unwrap();
        let rx = poller.receiver();
        let received: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(received, vec![pad(1), pad(2), pad(3)]);
    }

    #[test]
    fn test_error_stops_poller() {
        let _ = env_logger::builder().is_test(true).try_init();
        let source = Scripted {
            batches: VecDeque::from(vec![
                Ok(vec![pad(1)]),
                Err(Error::Disconnected("usb unplugged".to_string())),
            ]),
        };
        let poller = InputPoller::spawn(source, Duration::from_millis(1)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while poller.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!poller.is_running());
        assert_eq!(poller.try_recv(), Some(pad(1)));
        match poller.check() {
            Err(Error::Disconnected(reason)) => assert!(reason.starts_with("scripted:")),
            other => panic!("expected a disconnect, got {:?}", other),
        }
    }

    #[test]
    fn test_running_poller_checks_ok() {
        let source = Scripted {
            batches: VecDeque::new(),
        };
        let poller = InputPoller::spawn(source, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(5));
        assert!(poller.check().is_ok());
    }

    #[test]
    fn test_state_tracker_reports_changes() {
        let mut tracker = StateTracker::new();
        let first = tracker.update(&[(ButtonId::Play, false), (ButtonId::Stop, true)], &[0, 64]);
        assert_eq!(
            first,
            vec![ControlEvent::Button {
                id: ButtonId::Stop,
                pressed: true,
                velocity: 127
            }]
        );

        let unchanged =
            tracker.update(&[(ButtonId::Play, false), (ButtonId::Stop, true)], &[0, 64]);
        assert!(unchanged.is_empty());

        let changed = tracker.update(&[(ButtonId::Play, true), (ButtonId::Stop, true)], &[0, 70]);
        assert_eq!(
            changed,
            vec![
                ControlEvent::Button {
                    id: ButtonId::Play,
                    pressed: true,
                    velocity: 127
                },
                ControlEvent::Knob { index: 1, raw: 70 },
            ]
        );
    }
}
