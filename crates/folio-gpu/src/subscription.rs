/// A registration (listener, frame callback, library hook) paired with its
/// teardown.
///
/// `dispose` runs the teardown at most once; dropping an undisposed
/// subscription disposes it.
pub struct Subscription {
    label: &'static str,
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(label: &'static str, teardown: impl FnOnce() + 'static) -> Self {
        Self {
            label,
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            tracing::trace!("releasing {}", self.label);
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Owns every registration made by one adapter (or library lease).
///
/// Unwinds in reverse registration order. Once closed, anything added is
/// released immediately, so late async continuations cannot leak listeners.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
    closed: bool,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut subscription: Subscription) {
        if self.closed {
            subscription.dispose();
            return;
        }
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases everything and closes the set.
    pub fn dispose_all(&mut self) {
        self.closed = true;
        while let Some(mut subscription) = self.subscriptions.pop() {
            subscription.dispose();
        }
    }

    /// Releases everything but keeps accepting new registrations.
    pub fn clear(&mut self) {
        while let Some(mut subscription) = self.subscriptions.pop() {
            subscription.dispose();
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
