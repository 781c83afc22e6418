//! Single-slot deferred tasks.
//!
//! Each purpose owns exactly one pending deadline. Scheduling again replaces
//! the pending deadline and bumps its generation, so only the most recent
//! request for a purpose ever fires. Time is passed in explicitly; the
//! surface polls with the instant of its refresh tick.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Slot {
    deadline: Instant,
    generation: u64,
}

/// Replace-don't-queue timer table keyed by purpose.
#[derive(Debug)]
pub struct TimerSlots<P> {
    slots: HashMap<P, Slot>,
    next_generation: u64,
}

impl<P> Default for TimerSlots<P> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<P: Copy + Eq + Hash> TimerSlots<P> {
    /// Create an empty timer table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `purpose` at `deadline`, superseding any pending deadline.
    ///
    /// Returns the generation of the new schedule.
    pub fn schedule(&mut self, purpose: P, deadline: Instant) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slots.insert(
            purpose,
            Slot {
                deadline,
                generation,
            },
        );
        generation
    }

    /// Cancel the pending deadline for `purpose`.
    pub fn cancel(&mut self, purpose: P) -> bool {
        self.slots.remove(&purpose).is_some()
    }

    /// Whether `purpose` has a pending deadline
    pub fn is_pending(&self, purpose: P) -> bool {
        self.slots.contains_key(&purpose)
    }

    /// Pending deadline for `purpose`
    pub fn deadline(&self, purpose: P) -> Option<Instant> {
        self.slots.get(&purpose).map(|s| s.deadline)
    }

    /// Whether `generation` is still the live schedule for `purpose`
    pub fn is_current(&self, purpose: P, generation: u64) -> bool {
        self.slots
            .get(&purpose)
            .is_some_and(|s| s.generation == generation)
    }

    /// Earliest pending deadline across all purposes
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().map(|s| s.deadline).min()
    }

    /// Remove and return every purpose whose deadline is at or before `now`,
    /// earliest first.
    pub fn poll(&mut self, now: Instant) -> Vec<P> {
        let mut due: Vec<(Instant, u64, P)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.deadline <= now)
            .map(|(purpose, slot)| (slot.deadline, slot.generation, *purpose))
            .collect();
        due.sort_by_key(|(deadline, generation, _)| (*deadline, *generation));
        for (_, _, purpose) in &due {
            self.slots.remove(purpose);
        }
        due.into_iter().map(|(_, _, purpose)| purpose).collect()
    }

    /// Drop every pending deadline.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
