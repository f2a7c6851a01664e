use crate::events::{EventCategory, EventSeverity, RendererEvent};
use crate::stats::RendererStats;
use crate::{AdapterFailure, RendererChoice};

/// Demotes exactly one tier, without consulting capabilities.
///
/// Calling this with `Exhausted` is a caller bug; it returns `Exhausted` again.
pub fn on_adapter_failure(current: RendererChoice) -> RendererChoice {
    current.demoted()
}

pub fn is_exhausted(choice: RendererChoice) -> bool {
    choice.is_exhausted()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    Demoted {
        from: RendererChoice,
        to: RendererChoice,
    },
    Exhausted,
    /// The failure came from an adapter that is no longer current.
    Ignored,
}

/// Renderer fallback state machine.
///
/// Decays one tier per failure: TierA -> TierB -> TierC -> Exhausted. It never
/// moves back up on its own; [`FallbackCoordinator::manual_retry`] is the only
/// way to restart the chain and is meant for an explicit user action.
#[derive(Debug)]
pub struct FallbackCoordinator {
    current: RendererChoice,
    initial: RendererChoice,
    demotions: u32,
}

impl FallbackCoordinator {
    pub fn new(initial: RendererChoice) -> Self {
        Self {
            current: initial,
            initial,
            demotions: 0,
        }
    }

    pub fn current(&self) -> RendererChoice {
        self.current
    }

    pub fn initial(&self) -> RendererChoice {
        self.initial
    }

    pub fn demotions(&self) -> u32 {
        self.demotions
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_exhausted()
    }

    pub fn handle_failure(
        &mut self,
        time_ms: u64,
        failure: &AdapterFailure,
        stats: &RendererStats,
        mut emit_event: impl FnMut(RendererEvent),
    ) -> FallbackOutcome {
        if self.current.is_exhausted() {
            emit_event(RendererEvent::new(
                time_ms,
                failure.choice,
                EventSeverity::Fatal,
                EventCategory::Fallback,
                "Renderer fallback requested while already exhausted",
            ));
            return FallbackOutcome::Exhausted;
        }

        if failure.choice != self.current {
            emit_event(
                RendererEvent::new(
                    time_ms,
                    failure.choice,
                    EventSeverity::Warning,
                    EventCategory::Fallback,
                    format!(
                        "Ignoring failure from replaced renderer {}: {}",
                        failure.choice.as_str(),
                        failure.error
                    ),
                )
                .with_detail("current", self.current.as_str()),
            );
            return FallbackOutcome::Ignored;
        }

        stats.inc_adapter_failures();
        let category = match failure.phase {
            crate::FailurePhase::Construction => EventCategory::Init,
            crate::FailurePhase::Runtime => EventCategory::Runtime,
        };
        emit_event(
            RendererEvent::new(
                time_ms,
                self.current,
                EventSeverity::Warning,
                category,
                format!(
                    "Renderer {} failed during {}: {}",
                    self.current.as_str(),
                    failure.phase.as_str(),
                    failure.error
                ),
            )
            .with_detail("phase", failure.phase.as_str())
            .with_detail("backend", self.current.as_str()),
        );

        let from = self.current;
        let to = on_adapter_failure(from);
        self.current = to;

        if to.is_exhausted() {
            stats.inc_exhaustions();
            emit_event(RendererEvent::new(
                time_ms,
                from,
                EventSeverity::Fatal,
                EventCategory::Fallback,
                "Renderer fallback exhausted all tiers; switching to content-only view",
            ));
            return FallbackOutcome::Exhausted;
        }

        self.demotions += 1;
        stats.inc_demotions();
        emit_event(RendererEvent::new(
            time_ms,
            to,
            EventSeverity::Info,
            EventCategory::Fallback,
            format!("Falling back from {} to {}", from.as_str(), to.as_str()),
        ));
        FallbackOutcome::Demoted { from, to }
    }

    /// Jumps straight to `Exhausted` without a mount attempt.
    pub fn exhaust(
        &mut self,
        time_ms: u64,
        reason: &str,
        stats: &RendererStats,
        mut emit_event: impl FnMut(RendererEvent),
    ) {
        if self.current.is_exhausted() {
            return;
        }
        let from = self.current;
        self.current = RendererChoice::Exhausted;
        stats.inc_exhaustions();
        emit_event(RendererEvent::new(
            time_ms,
            from,
            EventSeverity::Fatal,
            EventCategory::Fallback,
            format!("Renderer unavailable: {reason}"),
        ));
    }

    /// User-initiated restart of the chain from `initial`.
    pub fn manual_retry(
        &mut self,
        time_ms: u64,
        initial: RendererChoice,
        stats: &RendererStats,
        mut emit_event: impl FnMut(RendererEvent),
    ) {
        stats.inc_manual_retries();
        emit_event(
            RendererEvent::new(
                time_ms,
                initial,
                EventSeverity::Info,
                EventCategory::Retry,
                format!("Manual renderer retry starting at {}", initial.as_str()),
            )
            .with_detail("previous", self.current.as_str()),
        );
        self.current = initial;
        self.initial = initial;
        self.demotions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailurePhase, RendererError};
    use pretty_assertions::assert_eq;

    fn failure(choice: RendererChoice, phase: FailurePhase) -> AdapterFailure {
        AdapterFailure {
            choice,
            phase,
            error: RendererError::Backend(format!("{} broke", choice.as_str())),
        }
    }

    #[test]
    fn pure_demotion_is_one_step_and_idempotent_at_the_bottom() {
        assert_eq!(on_adapter_failure(RendererChoice::TierA), RendererChoice::TierB);
        assert_eq!(on_adapter_failure(RendererChoice::TierB), RendererChoice::TierC);
        assert_eq!(on_adapter_failure(RendererChoice::TierC), RendererChoice::Exhausted);
        assert_eq!(
            on_adapter_failure(RendererChoice::Exhausted),
            RendererChoice::Exhausted
        );
        assert!(is_exhausted(RendererChoice::Exhausted));
        assert!(!is_exhausted(RendererChoice::TierC));
    }

    #[test]
    fn demotes_from_webgpu_to_webgl_with_ordered_events() {
        let stats = RendererStats::new();
        let mut coordinator = FallbackCoordinator::new(RendererChoice::TierA);

        let mut events = Vec::new();
        let outcome = coordinator.handle_failure(
            42,
            &failure(RendererChoice::TierA, FailurePhase::Construction),
            &stats,
            |e| events.push(e),
        );

        assert_eq!(
            outcome,
            FallbackOutcome::Demoted {
                from: RendererChoice::TierA,
                to: RendererChoice::TierB
            }
        );
        assert_eq!(coordinator.current(), RendererChoice::TierB);
        assert_eq!(coordinator.demotions(), 1);

        assert_eq!(events.len(), 2, "{events:#?}");
        assert!(events.iter().all(|e| e.time_ms == 42));

        assert_eq!(events[0].severity, EventSeverity::Warning);
        assert_eq!(events[0].category, EventCategory::Init);
        assert_eq!(events[0].choice, RendererChoice::TierA);
        assert_eq!(
            events[0].message,
            "Renderer webgpu failed during construction: backend error: webgpu broke"
        );
        assert_eq!(
            events[0]
                .details
                .as_ref()
                .and_then(|d| d.get("phase"))
                .map(String::as_str),
            Some("construction")
        );

        assert_eq!(events[1].severity, EventSeverity::Info);
        assert_eq!(events[1].category, EventCategory::Fallback);
        assert_eq!(events[1].choice, RendererChoice::TierB);
        assert_eq!(events[1].message, "Falling back from webgpu to webgl");

        let snap = stats.snapshot();
        assert_eq!(snap.adapter_failures, 1);
        assert_eq!(snap.demotions, 1);
        assert_eq!(snap.exhaustions, 0);
    }

    #[test]
    fn runtime_and_construction_failures_demote_identically() {
        let stats = RendererStats::new();
        let mut by_construction = FallbackCoordinator::new(RendererChoice::TierB);
        let mut by_runtime = FallbackCoordinator::new(RendererChoice::TierB);

        let a = by_construction.handle_failure(
            0,
            &failure(RendererChoice::TierB, FailurePhase::Construction),
            &stats,
            |_| {},
        );
        let b = by_runtime.handle_failure(
            0,
            &failure(RendererChoice::TierB, FailurePhase::Runtime),
            &stats,
            |_| {},
        );

        assert_eq!(a, b);
        assert_eq!(by_construction.current(), by_runtime.current());
    }

    #[test]
    fn walks_the_whole_chain_to_exhaustion() {
        let stats = RendererStats::new();
        let mut coordinator = FallbackCoordinator::new(RendererChoice::TierA);
        let mut events = Vec::new();

        for choice in [RendererChoice::TierA, RendererChoice::TierB] {
            let outcome = coordinator.handle_failure(
                1,
                &failure(choice, FailurePhase::Runtime),
                &stats,
                |e| events.push(e),
            );
            assert!(matches!(outcome, FallbackOutcome::Demoted { .. }));
        }
        let outcome = coordinator.handle_failure(
            1,
            &failure(RendererChoice::TierC, FailurePhase::Runtime),
            &stats,
            |e| events.push(e),
        );

        assert_eq!(outcome, FallbackOutcome::Exhausted);
        assert!(coordinator.is_exhausted());
        let last = events.last().expect("event");
        assert_eq!(last.severity, EventSeverity::Fatal);
        assert_eq!(
            last.message,
            "Renderer fallback exhausted all tiers; switching to content-only view"
        );

        let snap = stats.snapshot();
        assert_eq!(snap.adapter_failures, 3);
        assert_eq!(snap.demotions, 2);
        assert_eq!(snap.exhaustions, 1);
    }

    #[test]
    fn failure_after_exhaustion_emits_fatal_without_counting() {
        let stats = RendererStats::new();
        let mut coordinator = FallbackCoordinator::new(RendererChoice::TierC);
        coordinator.handle_failure(
            0,
            &failure(RendererChoice::TierC, FailurePhase::Construction),
            &stats,
            |_| {},
        );

        let mut events = Vec::new();
        let outcome = coordinator.handle_failure(
            5,
            &failure(RendererChoice::Exhausted, FailurePhase::Runtime),
            &stats,
            |e| events.push(e),
        );

        assert_eq!(outcome, FallbackOutcome::Exhausted);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, EventSeverity::Fatal);
        assert_eq!(stats.snapshot().adapter_failures, 1);
        assert_eq!(stats.snapshot().exhaustions, 1);
    }

    #[test]
    fn stale_failures_from_replaced_adapters_are_ignored() {
        let stats = RendererStats::new();
        let mut coordinator = FallbackCoordinator::new(RendererChoice::TierA);
        coordinator.handle_failure(
            0,
            &failure(RendererChoice::TierA, FailurePhase::Construction),
            &stats,
            |_| {},
        );

        let mut events = Vec::new();
        let outcome = coordinator.handle_failure(
            1,
            &failure(RendererChoice::TierA, FailurePhase::Runtime),
            &stats,
            |e| events.push(e),
        );

        assert_eq!(outcome, FallbackOutcome::Ignored);
        assert_eq!(coordinator.current(), RendererChoice::TierB);
        assert_eq!(events[0].severity, EventSeverity::Warning);
        assert_eq!(stats.snapshot().adapter_failures, 1);
    }

    #[test]
    fn exhaust_and_manual_retry() {
        let stats = RendererStats::new();
        let mut coordinator = FallbackCoordinator::new(RendererChoice::TierC);
        let mut events = Vec::new();

        coordinator.exhaust(0, "no graphics backend", &stats, |e| events.push(e));
        coordinator.exhaust(0, "no graphics backend", &stats, |e| events.push(e));
        assert!(coordinator.is_exhausted());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Renderer unavailable: no graphics backend");

        coordinator.manual_retry(10, RendererChoice::TierB, &stats, |e| events.push(e));
        assert_eq!(coordinator.current(), RendererChoice::TierB);
        assert_eq!(coordinator.initial(), RendererChoice::TierB);
        assert_eq!(coordinator.demotions(), 0);
        assert_eq!(events[1].category, EventCategory::Retry);
        assert_eq!(stats.snapshot().manual_retries, 1);
    }
}
