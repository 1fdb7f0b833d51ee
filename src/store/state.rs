//! Observable store state
//!
//! State is kept in `tokio::sync::watch` channels: readers take cheap
//! snapshots, and consumers that render state subscribe to change
//! notifications instead of polling.
//!
//! ```text
//! operation ──▶ Slot::modify() ──▶ watch channel ──▶ subscribe() / changes()
//! ```

use crate::core::query::total_pages;
use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// State mirrored from the server for one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T> {
    /// Current page of a listing, in server order
    pub items: Vec<T>,

    /// Most recently fetched or mutated single entity
    pub current_item: Option<T>,

    /// True while a request issued by the store is outstanding
    pub loading: bool,

    /// Message of the most recent failure
    pub error: Option<String>,

    /// Total items reported by the last successful listing
    pub total: u64,

    /// Page requested by the next listing (starts at 1)
    pub page: u32,

    /// Page size requested by the next listing
    pub page_size: u32,
}

impl<T> StoreState<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            current_item: None,
            loading: false,
            error: None,
            total: 0,
            page: 1,
            page_size,
        }
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// `ceil(total / page_size)`; zero when there is nothing to page
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.page_size)
    }
}

/// A single observable value
///
/// Writes never fail, even with no subscriber attached.
#[derive(Debug)]
pub struct Slot<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> Slot<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Read through a borrow without cloning the whole value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Stream yielding the current value, then every later change
    pub fn changes(&self) -> impl Stream<Item = T> + Send + 'static {
        WatchStream::new(self.sender.subscribe())
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Puts a store into the loading state for as long as it is alive
///
/// Construction sets `loading` and clears `error`; dropping resets `loading`,
/// which also covers futures dropped before completion.
pub(crate) struct LoadingGuard<'a, T: Clone + Send + Sync + 'static> {
    state: &'a Slot<StoreState<T>>,
}

impl<'a, T: Clone + Send + Sync + 'static> LoadingGuard<'a, T> {
    pub(crate) fn begin(state: &'a Slot<StoreState<T>>) -> Self {
        state.modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Self { state }
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.state.modify(|s| s.loading = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_store_state_defaults() {
        let state: StoreState<u32> = StoreState::new(10);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 10);
        assert!(!state.has_items());
        assert!(!state.has_error());
        assert_eq!(state.total_pages(), 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let mut state: StoreState<u32> = StoreState::new(10);
        state.total = 21;
        assert_eq!(state.total_pages(), 3);
    }

    #[test]
    fn test_loading_guard_resets_on_drop() {
        let slot = Slot::new(StoreState::<u32>::new(10));
        slot.modify(|s| s.error = Some("previous failure".to_string()));

        {
            let _guard = LoadingGuard::begin(&slot);
            assert!(slot.with(|s| s.loading));
            assert_eq!(slot.with(|s| s.error.clone()), None);
        }

        assert!(!slot.with(|s| s.loading));
    }

    #[tokio::test]
    async fn test_slot_changes_stream() {
        let slot = Slot::new(0u32);
        let mut changes = slot.changes();

        assert_eq!(changes.next().await, Some(0));
        slot.set(5);
        assert_eq!(changes.next().await, Some(5));
    }
}
