//! Layered activation state shared by the mode and view managers.
//!
//! A [`LayerManager`] owns a registry of handlers keyed by a closed ID enum
//! and tracks which one receives events:
//!
//! - the *active* handler is the permanent selection,
//! - *temporary* handlers are stacked on top of it (hold-to-peek) and the
//!   top of the stack receives events until it is restored,
//! - *previous* remembers the last permanent selection.
//!
//! Temporary activation never touches `previous`, and every
//! [`LayerManager::set_temporary`] adds exactly one level, so each
//! [`LayerManager::restore`] lands on exactly the state from before the
//! matching call.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Activation callbacks of a managed handler.
///
/// `C` is the context handed to the handler while it is switched in or out.
pub trait Layer<C: ?Sized> {
    /// Called when the handler starts receiving events.
    fn on_activate(&mut self, _ctx: &mut C) {}

    /// Called when the handler stops receiving events.
    fn on_deactivate(&mut self, _ctx: &mut C) {}
}

/// Registry plus active/previous/temporary bookkeeping.
pub struct LayerManager<Id, H: ?Sized> {
    label: &'static str,
    registry: HashMap<Id, Box<H>>,
    active: Option<Id>,
    previous: Option<Id>,
    temporary: Vec<Id>,
}

impl<Id, H> LayerManager<Id, H>
where
    Id: Copy + Eq + Hash + Debug,
    H: ?Sized,
{
    /// Create an empty manager. `label` prefixes log lines.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            registry: HashMap::new(),
            active: None,
            previous: None,
            temporary: Vec::new(),
        }
    }

    /// Register a handler, replacing any handler with the same ID.
    pub fn register(&mut self, id: Id, handler: Box<H>) {
        if self.registry.insert(id, handler).is_some() {
            log::debug!("[{}] Replaced handler for {:?}", self.label, id);
        }
    }

    /// Whether a handler is registered for `id`
    pub fn is_registered(&self, id: Id) -> bool {
        self.registry.contains_key(&id)
    }

    /// Registered IDs (unordered)
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.registry.keys().copied()
    }

    pub fn get(&self, id: Id) -> Option<&H> {
        self.registry.get(&id).map(|h| &**h)
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut H> {
        self.registry.get_mut(&id).map(|h| &mut **h)
    }

    /// ID of the handler receiving events (top temporary, else active)
    pub fn active_id(&self) -> Option<Id> {
        self.temporary.last().copied().or(self.active)
    }

    /// The permanent selection, ignoring temporaries
    pub fn permanent_id(&self) -> Option<Id> {
        self.active
    }

    /// The permanent selection before the current one
    pub fn previous_id(&self) -> Option<Id> {
        self.previous
    }

    /// Whether a temporary handler is receiving events
    pub fn is_temporary(&self) -> bool {
        !self.temporary.is_empty()
    }

    /// Whether `id` is receiving events
    pub fn is_active(&self, id: Id) -> bool {
        self.active_id() == Some(id)
    }

    /// The handler receiving events
    pub fn active(&self) -> Option<&H> {
        self.active_id().and_then(|id| self.get(id))
    }

    /// The handler receiving events, mutably
    pub fn active_mut(&mut self) -> Option<&mut H> {
        let id = self.active_id()?;
        self.get_mut(id)
    }

    /// Make `id` the permanent selection, ending any temporary activation.
    ///
    /// Unregistered IDs are ignored. Returns whether anything changed.
    pub fn set_active<C: ?Sized>(&mut self, id: Id, ctx: &mut C) -> bool
    where
        H: Layer<C>,
    {
        if !self.is_registered(id) {
            log::debug!("[{}] Ignoring unregistered {:?}", self.label, id);
            return false;
        }
        let current = self.active_id();
        if self.temporary.is_empty() && current == Some(id) {
            return false;
        }
        if current != Some(id) {
            if let Some(current) = current {
                self.deactivate(current, ctx);
            }
        }
        self.temporary.clear();
        if self.active != Some(id) {
            self.previous = self.active;
            self.active = Some(id);
        }
        if current != Some(id) {
            self.activate(id, ctx);
        }
        log::debug!("[{}] Active: {:?}", self.label, id);
        true
    }

    /// Temporarily route events to `id` on top of the current state.
    ///
    /// Unregistered IDs are ignored. Any other call pushes one level, even
    /// when `id` already receives events. Returns whether the receiver
    /// changed.
    pub fn set_temporary<C: ?Sized>(&mut self, id: Id, ctx: &mut C) -> bool
    where
        H: Layer<C>,
    {
        if !self.is_registered(id) {
            log::debug!("[{}] Ignoring unregistered {:?}", self.label, id);
            return false;
        }
        let current = self.active_id();
        self.temporary.push(id);
        log::debug!("[{}] Temporary: {:?}", self.label, id);
        if current == Some(id) {
            return false;
        }
        if let Some(current) = current {
            self.deactivate(current, ctx);
        }
        self.activate(id, ctx);
        true
    }

    /// End the topmost temporary activation. No-op when none is active.
    pub fn restore<C: ?Sized>(&mut self, ctx: &mut C) -> bool
    where
        H: Layer<C>,
    {
        let Some(top) = self.temporary.pop() else {
            return false;
        };
        let current = self.active_id();
        if current != Some(top) {
            self.deactivate(top, ctx);
            if let Some(current) = current {
                self.activate(current, ctx);
            }
        }
        log::debug!("[{}] Restored from {:?}", self.label, top);
        true
    }

    /// End the topmost temporary level of `id`, wherever it sits on the
    /// stack.
    pub fn end_temporary<C: ?Sized>(&mut self, id: Id, ctx: &mut C) -> bool
    where
        H: Layer<C>,
    {
        match self.temporary.iter().rposition(|t| *t == id) {
            Some(position) if position + 1 == self.temporary.len() => self.restore(ctx),
            Some(position) => {
                self.temporary.remove(position);
                true
            }
            None => false,
        }
    }

    /// Switch permanently back to the previous selection.
    pub fn activate_previous<C: ?Sized>(&mut self, ctx: &mut C) -> bool
    where
        H: Layer<C>,
    {
        match self.previous {
            Some(previous) => self.set_active(previous, ctx),
            None => false,
        }
    }

    fn activate<C: ?Sized>(&mut self, id: Id, ctx: &mut C)
    where
        H: Layer<C>,
    {
        if let Some(handler) = self.registry.get_mut(&id) {
            handler.on_activate(ctx);
        }
    }

    fn deactivate<C: ?Sized>(&mut self, id: Id, ctx: &mut C)
    where
        H: Layer<C>,
    {
        if let Some(handler) = self.registry.get_mut(&id) {
            handler.on_deactivate(ctx);
        }
    }
}

impl<Id: Debug, H: ?Sized> Debug for LayerManager<Id, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerManager")
            .field("label", &self.label)
            .field("registered", &self.registry.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("previous", &self.previous)
            .field("temporary", &self.temporary)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Page {
        A,
        B,
        C,
        Missing,
    }

    struct Recorder(Page);

    impl Layer<Vec<String>> for Recorder {
        fn on_activate(&mut self, log: &mut Vec<String>) {
            log.push(format!("+{:?}", self.0));
        }

        fn on_deactivate(&mut self, log: &mut Vec<String>) {
            log.push(format!("-{:?}", self.0));
        }
    }

    fn manager() -> LayerManager<Page, Recorder> {
        let mut manager = LayerManager::new("TEST");
        for page in [Page::A, Page::B, Page::C] {
            manager.register(page, Box::new(Recorder(page)));
        }
        manager
    }

    #[test]
    fn test_temporary_restores_exact_state() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        m.set_active(Page::B, &mut log);
        assert_eq!(m.previous_id(), Some(Page::A));

        assert!(m.set_temporary(Page::C, &mut log));
        assert_eq!(m.active_id(), Some(Page::C));
        assert_eq!(m.permanent_id(), Some(Page::B));
        assert_eq!(m.previous_id(), Some(Page::A));

        assert!(m.restore(&mut log));
        assert_eq!(m.active_id(), Some(Page::B));
        assert_eq!(m.previous_id(), Some(Page::A));
        assert!(!m.is_temporary());
        assert_eq!(log, vec!["+A", "-A", "+B", "-B", "+C", "-C", "+B"]);
    }

    #[test]
    fn test_unregistered_is_ignored() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        assert!(!m.set_active(Page::Missing, &mut log));
        assert!(!m.set_temporary(Page::Missing, &mut log));
        assert_eq!(m.active_id(), Some(Page::A));
        assert_eq!(log, vec!["+A"]);
    }

    #[test]
    fn test_reactivating_current_is_noop() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        assert!(!m.set_active(Page::A, &mut log));
        assert_eq!(log, vec!["+A"]);
        assert_eq!(m.previous_id(), None);
    }

    #[test]
    fn test_repeated_temporary_pairs_with_restore() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        assert!(m.set_temporary(Page::B, &mut log));
        assert!(!m.set_temporary(Page::B, &mut log));
        log.clear();

        assert!(m.restore(&mut log));
        assert_eq!(m.active_id(), Some(Page::B));
        assert!(log.is_empty());

        assert!(m.restore(&mut log));
        assert_eq!(m.active_id(), Some(Page::A));
        assert_eq!(log, vec!["-B", "+A"]);
    }

    #[test]
    fn test_peeking_current_adds_a_level() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        assert!(!m.set_temporary(Page::A, &mut log));
        assert!(m.is_temporary());
        assert!(m.set_temporary(Page::C, &mut log));
        assert!(m.set_temporary(Page::A, &mut log));

        m.restore(&mut log);
        assert_eq!(m.active_id(), Some(Page::C));
        m.restore(&mut log);
        assert_eq!(m.active_id(), Some(Page::A));
        assert!(m.is_temporary());
        m.restore(&mut log);
        assert!(!m.is_temporary());
        assert_eq!(log, vec!["+A", "-A", "+C", "-C", "+A", "-A", "+C", "-C", "+A"]);
    }

    #[test]
    fn test_restore_without_temporary_is_noop() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        assert!(!m.restore(&mut log));
        assert_eq!(m.active_id(), Some(Page::A));
    }

    #[test]
    fn test_nested_temporaries() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        m.set_temporary(Page::B, &mut log);
        m.set_temporary(Page::C, &mut log);
        assert_eq!(m.active_id(), Some(Page::C));
        m.restore(&mut log);
        assert_eq!(m.active_id(), Some(Page::B));
        m.restore(&mut log);
        assert_eq!(m.active_id(), Some(Page::A));
    }

    #[test]
    fn test_end_buried_temporary() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        m.set_temporary(Page::B, &mut log);
        m.set_temporary(Page::C, &mut log);
        log.clear();
        assert!(m.end_temporary(Page::B, &mut log));
        assert_eq!(m.active_id(), Some(Page::C));
        assert!(log.is_empty());
        m.end_temporary(Page::C, &mut log);
        assert_eq!(m.active_id(), Some(Page::A));
    }

    #[test]
    fn test_set_active_ends_temporary() {
        let mut m = manager();
        let mut log = Vec::new();
        m.set_active(Page::A, &mut log);
        m.set_temporary(Page::B, &mut log);
        log.clear();
        assert!(m.set_active(Page::C, &mut log));
        assert!(!m.is_temporary());
        assert_eq!(m.previous_id(), Some(Page::A));
        assert_eq!(log, vec!["-B", "+C"]);

        // making the peeked handler permanent keeps it running
        m.set_temporary(Page::B, &mut log);
        log.clear();
        assert!(m.set_active(Page::B, &mut log));
        assert!(log.is_empty());
        assert_eq!(m.previous_id(), Some(Page::C));
    }

    #[test]
    fn test_activate_previous() {
        let mut m = manager();
        let mut log = Vec::new();
        assert!(!m.activate_previous(&mut log));
        m.set_active(Page::A, &mut log);
        m.set_active(Page::B, &mut log);
        assert!(m.activate_previous(&mut log));
        assert_eq!(m.active_id(), Some(Page::A));
        assert_eq!(m.previous_id(), Some(Page::B));
    }
}
