use std::collections::{BTreeMap, VecDeque};

use crate::RendererChoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl EventSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            EventSeverity::Info => "info",
            EventSeverity::Warning => "warning",
            EventSeverity::Error => "error",
            EventSeverity::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Probe,
    Init,
    Runtime,
    Fallback,
    Retry,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Probe => "probe",
            EventCategory::Init => "init",
            EventCategory::Runtime => "runtime",
            EventCategory::Fallback => "fallback",
            EventCategory::Retry => "retry",
        }
    }
}

/// Structured record of something the renderer core did or observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererEvent {
    pub time_ms: u64,
    pub choice: RendererChoice,
    pub severity: EventSeverity,
    pub category: EventCategory,
    pub message: String,
    pub details: Option<BTreeMap<String, String>>,
}

impl RendererEvent {
    pub fn new(
        time_ms: u64,
        choice: RendererChoice,
        severity: EventSeverity,
        category: EventCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            time_ms,
            choice,
            severity,
            category,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Bounded FIFO of events waiting to be drained by the page.
///
/// When full, the oldest event is dropped and counted.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<RendererEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: RendererEvent) {
        match event.severity {
            EventSeverity::Info => tracing::debug!("{}", event.message),
            EventSeverity::Warning => tracing::warn!("{}", event.message),
            EventSeverity::Error | EventSeverity::Fatal => tracing::error!("{}", event.message),
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<RendererEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: u64) -> RendererEvent {
        RendererEvent::new(
            n,
            RendererChoice::TierB,
            EventSeverity::Info,
            EventCategory::Init,
            format!("event {n}"),
        )
    }

    #[test]
    fn log_drops_oldest_when_full() {
        let mut log = EventLog::new(2);
        log.push(event(1));
        log.push(event(2));
        log.push(event(3));

        assert_eq!(log.dropped(), 1);
        let drained = log.drain();
        assert_eq!(
            drained.iter().map(|e| e.time_ms).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn details_accumulate() {
        let e = event(0)
            .with_detail("phase", "runtime")
            .with_detail("backend", "webgl");
        let details = e.details.expect("details");
        assert_eq!(details.get("phase").map(String::as_str), Some("runtime"));
        assert_eq!(details.len(), 2);
    }
}
