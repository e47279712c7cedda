//! Selector-based change subscriptions.
//!
//! One registry of selector closures over the store; after every mutation
//! batch, each selector is re-evaluated and its callback is invoked only when
//! the selected slice differs from the previously seen value. This keeps
//! change notification proportional to what a subscriber watches instead of
//! diffing the whole tree per mutation.

use crate::store::EntityStore;

pub type SubscriptionId = u64;

struct Entry {
    id: SubscriptionId,
    observer: Box<dyn FnMut(&EntityStore)>,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: SubscriptionId,
    entries: Vec<Entry>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a selector and a callback. The callback fires on the first
    /// `notify` after subscription and then only when the selected value
    /// changes (by `PartialEq`).
    pub fn subscribe<T, S, C>(&mut self, selector: S, mut on_change: C) -> SubscriptionId
    where
        T: PartialEq + 'static,
        S: Fn(&EntityStore) -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        let mut last: Option<T> = None;
        self.entries.push(Entry {
            id,
            observer: Box::new(move |store| {
                let value = selector(store);
                if last.as_ref() != Some(&value) {
                    on_change(&value);
                    last = Some(value);
                }
            }),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Run every subscriber against the current store state.
    pub fn notify(&mut self, store: &EntityStore) {
        for entry in &mut self.entries {
            (entry.observer)(store);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
