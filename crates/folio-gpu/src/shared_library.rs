use crate::subscription::{Subscription, SubscriptionSet};

/// Ownership-tracked slot for a page-wide third-party library handle (for
/// example an animation library injected through a script tag).
///
/// Callers try [`SharedLibrarySlot::try_reuse`] first and only fetch (usually
/// asynchronously, outside any borrow of the slot) when it returns `None`, then
/// hand the result to [`SharedLibrarySlot::install`]. Later callers reuse the
/// same handle and only bump the reference count. When the last lease is
/// released every listener registered against the library is detached and the
/// handle is dropped.
#[derive(Debug)]
pub struct SharedLibrarySlot<H> {
    handle: Option<H>,
    leases: usize,
    fetches: u64,
    attached: SubscriptionSet,
}

impl<H> Default for SharedLibrarySlot<H> {
    fn default() -> Self {
        Self {
            handle: None,
            leases: 0,
            fetches: 0,
            attached: SubscriptionSet::new(),
        }
    }
}

impl<H: Clone> SharedLibrarySlot<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn leases(&self) -> usize {
        self.leases
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Takes a lease on an already-loaded handle.
    pub fn try_reuse(&mut self) -> Option<H> {
        let handle = self.handle.clone()?;
        self.leases += 1;
        Some(handle)
    }

    /// Stores a freshly loaded handle and takes the first lease on it.
    ///
    /// If another load finished first, its handle wins and `handle` is
    /// discarded.
    pub fn install(&mut self, handle: H) -> H {
        if let Some(existing) = self.try_reuse() {
            return existing;
        }
        self.fetches += 1;
        self.leases = 1;
        self.handle = Some(handle.clone());
        handle
    }

    /// Ties a listener registration to the loaded library's lifetime.
    pub fn attach(&mut self, subscription: Subscription) {
        if self.handle.is_none() {
            drop(subscription);
            return;
        }
        self.attached.add(subscription);
    }

    /// Releases one lease. Returns `true` when this was the last one.
    pub fn release(&mut self) -> bool {
        match self.leases {
            0 => false,
            1 => {
                self.leases = 0;
                self.attached.clear();
                self.handle = None;
                true
            }
            _ => {
                self.leases -= 1;
                false
            }
        }
    }
}
