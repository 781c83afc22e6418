//! Fixed-size paging window over an ordered host collection.
//!
//! A [`Bank`] exposes a stable slot range `0..page_size` over a collection of
//! any length (tracks, sends, scenes, devices, parameters). Slots past the end
//! of the collection come back as non-existent [`BankSlot`]s instead of
//! failing, so surfaces can always render a full page.
//!
//! The bank caches the collection length; call [`Bank::sync`] whenever the
//! host collection may have changed size.

use std::fmt;

/// An ordered collection a [`Bank`] can page over.
pub trait BankSource {
    /// The element type
    type Item;

    /// Number of items that currently exist
    fn item_count(&self) -> usize;

    /// Item at an absolute position, if it exists
    fn item(&self, position: usize) -> Option<&Self::Item>;
}

impl<T> BankSource for [T] {
    type Item = T;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn item(&self, position: usize) -> Option<&T> {
        self.get(position)
    }
}

impl<T> BankSource for Vec<T> {
    type Item = T;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn item(&self, position: usize) -> Option<&T> {
        self.get(position)
    }
}

/// One slot of the current page.
///
/// The slot always knows which absolute position it covers, even when no
/// item exists there.
pub struct BankSlot<'a, T> {
    index: usize,
    position: usize,
    item: Option<&'a T>,
}

impl<'a, T> BankSlot<'a, T> {
    /// Index within the page (0..page_size)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Absolute position in the collection
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether an item exists at this position
    pub fn exists(&self) -> bool {
        self.item.is_some()
    }

    /// The item, if it exists
    pub fn get(&self) -> Option<&'a T> {
        self.item
    }
}

impl<T> Clone for BankSlot<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BankSlot<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for BankSlot<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankSlot")
            .field("index", &self.index)
            .field("position", &self.position)
            .field("item", &self.item)
            .finish()
    }
}

/// Callback invoked with `(old, new)` absolute selection on every change.
pub type SelectionObserver = Box<dyn FnMut(Option<usize>, Option<usize>)>;

/// Paging window with selection tracking.
pub struct Bank {
    page_size: usize,
    page_offset: usize,
    item_count: usize,
    selected: Option<usize>,
    observers: Vec<SelectionObserver>,
}

impl Bank {
    /// Create a bank with the given page size (at least 1).
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page_offset: 0,
            item_count: 0,
            selected: None,
            observers: Vec::new(),
        }
    }

    /// Number of slots per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Absolute position of slot 0
    pub fn page_offset(&self) -> usize {
        self.page_offset
    }

    /// Collection length as of the last [`Bank::sync`]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Absolute position of the selected item
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Page-relative index of the selected item, if it is on the current page
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
            .filter(|&s| s >= self.page_offset && s < self.page_offset + self.page_size)
            .map(|s| s - self.page_offset)
    }

    /// Register a selection observer.
    pub fn add_observer<F>(&mut self, observer: F)
    where
        F: FnMut(Option<usize>, Option<usize>) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Slot `index` of the current page.
    ///
    /// Never fails: indices past the collection end yield a non-existent slot.
    pub fn item<'a, S>(&self, source: &'a S, index: usize) -> BankSlot<'a, S::Item>
    where
        S: BankSource + ?Sized,
    {
        let position = self.page_offset + index;
        let item = if index < self.page_size {
            source.item(position)
        } else {
            None
        };
        BankSlot {
            index,
            position,
            item,
        }
    }

    /// All slots of the current page.
    pub fn items<'a, S>(&self, source: &'a S) -> Vec<BankSlot<'a, S::Item>>
    where
        S: BankSource + ?Sized,
    {
        (0..self.page_size).map(|i| self.item(source, i)).collect()
    }

    /// The selected item, if any.
    pub fn selected_item<'a, S>(&self, source: &'a S) -> Option<&'a S::Item>
    where
        S: BankSource + ?Sized,
    {
        self.selected.and_then(|s| source.item(s))
    }

    /// Whether a full or partial page exists after the current one
    pub fn can_scroll_forwards(&self) -> bool {
        self.page_offset + self.page_size < self.item_count
    }

    /// Whether a page exists before the current one
    pub fn can_scroll_backwards(&self) -> bool {
        self.page_offset > 0
    }

    /// Update the cached collection length.
    ///
    /// Pulls the window back when the collection shrank below it and clamps
    /// the selection to the last existing item.
    pub fn sync(&mut self, item_count: usize) {
        self.item_count = item_count;
        if item_count == 0 {
            self.page_offset = 0;
            self.set_selected(None);
            return;
        }
        if self.page_offset >= item_count {
            self.page_offset = self.page_start(item_count - 1);
        }
        if let Some(selected) = self.selected {
            if selected >= item_count {
                self.set_selected(Some(item_count - 1));
            }
        }
    }

    /// Move the window so that it contains `position` (page aligned).
    pub fn scroll_to(&mut self, position: usize) {
        let position = position.min(self.item_count.saturating_sub(1));
        self.page_offset = self.page_start(position);
    }

    /// Select an absolute position, scrolling the window to it.
    ///
    /// Positions past the end select the last existing item.
    pub fn select(&mut self, position: usize) -> bool {
        if self.item_count == 0 {
            return false;
        }
        let position = position.min(self.item_count - 1);
        self.scroll_to(position);
        self.set_selected(Some(position))
    }

    /// Select slot `index` of the current page. No-op on non-existent slots.
    pub fn select_item(&mut self, index: usize) -> bool {
        let position = self.page_offset + index;
        if index >= self.page_size || position >= self.item_count {
            return false;
        }
        self.set_selected(Some(position))
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) -> bool {
        self.set_selected(None)
    }

    /// Select the next item, advancing to the next page when crossing the
    /// window boundary. Stays on the last existing item at the end.
    pub fn select_next_item(&mut self) -> bool {
        if self.item_count == 0 {
            return false;
        }
        let last = self.item_count - 1;
        let next = match self.selected {
            None => self.page_offset.min(last),
            Some(s) => (s + 1).min(last),
        };
        if next >= self.page_offset + self.page_size || next < self.page_offset {
            self.scroll_to(next);
        }
        self.set_selected(Some(next))
    }

    /// Select the previous item, retreating to the previous page when
    /// crossing the window boundary.
    pub fn select_previous_item(&mut self) -> bool {
        if self.item_count == 0 {
            return false;
        }
        let previous = match self.selected {
            None => (self.page_offset + self.page_size).min(self.item_count) - 1,
            Some(s) => s.saturating_sub(1).min(self.item_count - 1),
        };
        if previous < self.page_offset || previous >= self.page_offset + self.page_size {
            self.scroll_to(previous);
        }
        self.set_selected(Some(previous))
    }

    /// Jump one page forwards. The selection keeps its slot, falling back to
    /// the closest existing item.
    pub fn select_next_page(&mut self) -> bool {
        if !self.can_scroll_forwards() {
            return false;
        }
        let slot = self.selected_index();
        self.page_offset += self.page_size;
        self.follow_page(slot);
        true
    }

    /// Jump one page backwards.
    pub fn select_previous_page(&mut self) -> bool {
        if !self.can_scroll_backwards() {
            return false;
        }
        let slot = self.selected_index();
        self.page_offset = self.page_start(self.page_offset.saturating_sub(self.page_size));
        self.follow_page(slot);
        true
    }

    fn follow_page(&mut self, slot: Option<usize>) {
        if self.selected.is_none() {
            return;
        }
        let slot = slot.unwrap_or(0);
        let target = (self.page_offset + slot).min(self.item_count.saturating_sub(1));
        self.set_selected(Some(target));
    }

    fn page_start(&self, position: usize) -> usize {
        position / self.page_size * self.page_size
    }

    fn set_selected(&mut self, selected: Option<usize>) -> bool {
        if self.selected == selected {
            return false;
        }
        let old = self.selected;
        self.selected = selected;
        for observer in &mut self.observers {
            observer(old, selected);
        }
        true
    }
}

impl fmt::Debug for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bank")
            .field("page_size", &self.page_size)
            .field("page_offset", &self.page_offset)
            .field("item_count", &self.item_count)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bank_over(items: &[u32], page_size: usize) -> Bank {
        let mut bank = Bank::new(page_size);
        bank.sync(items.len());
        bank
    }

    #[test]
    fn test_paging_scenario() {
        let items: Vec<u32> = (0..20).collect();
        let mut bank = bank_over(&items, 8);

        assert!(bank.select_next_page());
        assert_eq!(bank.item(&items, 0).position(), 8);
        assert_eq!(bank.item(&items, 0).get(), Some(&8));

        assert!(bank.select_next_page());
        assert_eq!(bank.item(&items, 0).position(), 16);
        let slot = bank.item(&items, 4);
        assert_eq!(slot.position(), 20);
        assert!(!slot.exists());
        assert!(!bank.can_scroll_forwards());
    }

    #[test]
    fn test_next_page_until_end_covers_collection() {
        for len in [0usize, 1, 7, 8, 9, 16, 20, 33] {
            let items: Vec<u32> = (0..len as u32).collect();
            let mut bank = bank_over(&items, 8);
            while bank.can_scroll_forwards() {
                assert!(bank.select_next_page());
                assert_eq!(bank.page_offset() % 8, 0);
            }
            assert!(bank.page_offset() + bank.page_size() >= len);
        }
    }

    #[test]
    fn test_can_scroll_reports_partial_pages() {
        let items: Vec<u32> = (0..9).collect();
        let mut bank = bank_over(&items, 8);
        assert!(bank.can_scroll_forwards());
        assert!(!bank.can_scroll_backwards());
        bank.select_next_page();
        assert!(!bank.can_scroll_forwards());
        assert!(bank.can_scroll_backwards());

        let exact: Vec<u32> = (0..8).collect();
        let bank = bank_over(&exact, 8);
        assert!(!bank.can_scroll_forwards());
    }

    #[test]
    fn test_next_item_advances_page() {
        let items: Vec<u32> = (0..12).collect();
        let mut bank = bank_over(&items, 4);
        bank.select(3);
        assert_eq!(bank.page_offset(), 0);

        bank.select_next_item();
        assert_eq!(bank.selected(), Some(4));
        assert_eq!(bank.page_offset(), 4);
        assert_eq!(bank.selected_index(), Some(0));

        bank.select_previous_item();
        assert_eq!(bank.selected(), Some(3));
        assert_eq!(bank.page_offset(), 0);
    }

    #[test]
    fn test_next_item_at_end_stays_on_existing_item() {
        let items: Vec<u32> = (0..10).collect();
        let mut bank = bank_over(&items, 8);
        bank.select(9);
        assert_eq!(bank.page_offset(), 8);

        for _ in 0..5 {
            bank.select_next_item();
            let selected = bank.selected().unwrap();
            assert!(bank.selected_item(&items).is_some());
            assert_eq!(selected, 9);
        }
    }

    #[test]
    fn test_select_past_end_picks_last_existing() {
        let items: Vec<u32> = (0..5).collect();
        let mut bank = bank_over(&items, 8);
        bank.select(42);
        assert_eq!(bank.selected(), Some(4));
        assert!(!bank.select_item(6));
        assert_eq!(bank.selected(), Some(4));
    }

    #[test]
    fn test_page_jump_keeps_slot_or_closest() {
        let items: Vec<u32> = (0..10).collect();
        let mut bank = bank_over(&items, 8);
        bank.select(5);
        bank.select_next_page();
        // slot 5 of page 2 would be 13, which doesn't exist
        assert_eq!(bank.selected(), Some(9));
        bank.select_previous_page();
        assert_eq!(bank.selected(), Some(1));
    }

    #[test]
    fn test_sync_shrink_pulls_window_back() {
        let mut bank = Bank::new(8);
        bank.sync(20);
        bank.select(17);
        assert_eq!(bank.page_offset(), 16);

        bank.sync(10);
        assert_eq!(bank.page_offset(), 8);
        assert_eq!(bank.selected(), Some(9));

        bank.sync(0);
        assert_eq!(bank.page_offset(), 0);
        assert_eq!(bank.selected(), None);
    }

    #[test]
    fn test_observers_see_selection_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bank = Bank::new(4);
        bank.sync(6);
        let log = seen.clone();
        bank.add_observer(move |old, new| log.borrow_mut().push((old, new)));

        bank.select_next_item();
        bank.select_next_item();
        bank.select(1);
        // no change, no notification
        bank.select(1);

        assert_eq!(*seen.borrow(), vec![(None, Some(0)), (Some(0), Some(1))]);
    }
}
