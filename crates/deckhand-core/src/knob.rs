//! Knob movement debounce.
//!
//! While an encoder is being turned the display is left alone to avoid
//! flicker from host value echoes. The first delta starts a periodic
//! re-check; every re-check either reschedules itself (a delta arrived
//! recently) or settles and asks for one deferred display refresh.
//!
//! ```text
//! Idle --delta--> Moving --recheck (recent delta)--> Moving
//!                        --recheck (quiet > timeout)--> Idle + refresh
//! ```

use std::time::{Duration, Instant};

/// Interval between movement re-checks
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after which a knob counts as idle again
pub const DEFAULT_MOVE_TIMEOUT: Duration = Duration::from_millis(200);

/// Outcome of a movement re-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recheck {
    /// Still moving; check again at the given instant
    Reschedule(Instant),
    /// Went idle; the display should be refreshed once
    Settled,
    /// Nothing was moving
    Idle,
}

/// Debounce state for the knobs of one surface.
#[derive(Debug, Clone)]
pub struct KnobMotion {
    last_delta: Option<Instant>,
    moving: bool,
    recheck_interval: Duration,
    timeout: Duration,
}

impl Default for KnobMotion {
    fn default() -> Self {
        Self::new(DEFAULT_RECHECK_INTERVAL, DEFAULT_MOVE_TIMEOUT)
    }
}

impl KnobMotion {
    /// Create a debouncer with custom timings.
    pub fn new(recheck_interval: Duration, timeout: Duration) -> Self {
        Self {
            last_delta: None,
            moving: false,
            recheck_interval,
            timeout,
        }
    }

    /// Record a knob delta.
    ///
    /// Returns the first re-check deadline when this delta starts a movement;
    /// `None` while a re-check is already pending.
    pub fn on_delta(&mut self, now: Instant) -> Option<Instant> {
        self.last_delta = Some(now);
        if self.moving {
            return None;
        }
        self.moving = true;
        Some(now + self.recheck_interval)
    }

    /// Whether a knob is currently being turned
    pub fn is_knob_moving(&self) -> bool {
        self.moving
    }

    /// Run a scheduled re-check.
    pub fn on_recheck(&mut self, now: Instant) -> Recheck {
        if !self.moving {
            return Recheck::Idle;
        }
        let last = self.last_delta.unwrap_or(now);
        if now.saturating_duration_since(last) > self.timeout {
            self.moving = false;
            return Recheck::Settled;
        }
        // never check later than the first instant the knob could count as idle
        let settle_at = last + self.timeout + Duration::from_millis(1);
        Recheck::Reschedule((now + self.recheck_interval).min(settle_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerSlots;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct KnobRecheck;

    /// Drives the debouncer the way the surface does: deltas at given
    /// offsets, timers polled every 10ms. Returns moving flags sampled at
    /// each delta and the number of refreshes requested.
    fn simulate(delta_offsets_ms: &[u64], until_ms: u64) -> (Vec<bool>, usize) {
        let start = Instant::now();
        let mut motion = KnobMotion::default();
        let mut timers = TimerSlots::new();
        let mut moving_at_delta = Vec::new();
        let mut refreshes = 0;

        for tick in (0..=until_ms).step_by(10) {
            let now = start + Duration::from_millis(tick);
            for _ in timers.poll(now) {
                match motion.on_recheck(now) {
                    Recheck::Reschedule(at) => {
                        timers.schedule(KnobRecheck, at);
                    }
                    Recheck::Settled => refreshes += 1,
                    Recheck::Idle => {}
                }
            }
            if delta_offsets_ms.contains(&tick) {
                if let Some(at) = motion.on_delta(now) {
                    timers.schedule(KnobRecheck, at);
                }
                moving_at_delta.push(motion.is_knob_moving());
            }
        }
        assert_eq!(motion.is_knob_moving(), timers.is_pending(KnobRecheck));
        (moving_at_delta, refreshes)
    }

    #[test]
    fn test_deltas_50ms_apart_keep_moving() {
        let deltas: Vec<u64> = (0..=1000).step_by(50).collect();
        let (moving, refreshes) = simulate(&deltas, 1000);
        assert!(moving.iter().all(|m| *m));
        assert_eq!(refreshes, 0);
    }

    #[test]
    fn test_gap_settles_once() {
        let deltas: Vec<u64> = (0..=500).step_by(50).collect();
        let (_, refreshes) = simulate(&deltas, 750);
        assert_eq!(refreshes, 1);
    }

    #[test]
    fn test_settles_then_moves_again() {
        let start = Instant::now();
        let mut motion = KnobMotion::default();
        assert!(motion.on_delta(start).is_some());
        assert!(motion.on_delta(start + Duration::from_millis(50)).is_none());
        assert_eq!(
            motion.on_recheck(start + Duration::from_millis(500)),
            Recheck::Settled
        );
        assert!(!motion.is_knob_moving());
        assert_eq!(
            motion.on_recheck(start + Duration::from_millis(600)),
            Recheck::Idle
        );
        assert!(motion.on_delta(start + Duration::from_millis(700)).is_some());
        assert!(motion.is_knob_moving());
    }
}
