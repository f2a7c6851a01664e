//! Sequencing of probe result, selection, mounting and fallback.
//!
//! [`RendererHost`] owns at most one adapter at a time. Every replacement
//! disposes the previous adapter before the next `mount`, and nothing is
//! mounted before a [`CapabilityReport`] has been supplied.

use std::rc::Rc;

use crate::events::{EventCategory, EventLog, EventSeverity, RendererEvent};
use crate::fallback::{FallbackCoordinator, FallbackOutcome};
use crate::lifecycle::{
    AdapterFactory, AdapterHooks, AdapterLifecycleState, AdapterSignal, BoxedAdapter,
    MountGeneration, QueuedSignal, SignalQueue,
};
use crate::selector::select_with_config;
use crate::stats::RendererStats;
use crate::{
    AdapterFailure, CapabilityReport, FailurePhase, RendererChoice, RendererConfig, RendererError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Demoted,
    Exhausted,
}

/// Transient, non-blocking message for the page to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub choice: RendererChoice,
    pub phase: Option<FailurePhase>,
    pub message: String,
}

/// Outbound signals to the page shell.
pub trait ShellObserver {
    fn on_capability_resolved(&self, report: &CapabilityReport);

    fn on_renderer_changed(&self, choice: RendererChoice);

    fn on_exhausted(&self);

    /// Best effort. An error here is logged and otherwise ignored.
    fn on_notice(&self, notice: &Notice) -> Result<(), RendererError>;
}

pub struct RendererHost<F: AdapterFactory> {
    config: RendererConfig,
    factory: F,
    container: F::Container,
    observer: Box<dyn ShellObserver>,
    navigate: Rc<dyn Fn(usize)>,
    clock: Box<dyn Fn() -> u64>,

    stats: Rc<RendererStats>,
    events: EventLog,
    signals: SignalQueue,

    report: Option<CapabilityReport>,
    coordinator: Option<FallbackCoordinator>,
    adapter: Option<BoxedAdapter<F::Container>>,
    /// Generation of the most recent mount; signals stamped otherwise are stale.
    generation: MountGeneration,
    section: usize,
    shut_down: bool,
}

impl<F: AdapterFactory> RendererHost<F> {
    pub fn new(
        config: RendererConfig,
        factory: F,
        container: F::Container,
        observer: Box<dyn ShellObserver>,
        navigate: Rc<dyn Fn(usize)>,
    ) -> Result<Self, RendererError> {
        config.validate()?;
        let events = EventLog::new(config.event_log_capacity);
        Ok(Self {
            config,
            factory,
            container,
            observer,
            navigate,
            clock: Box::new(|| 0),
            stats: Rc::new(RendererStats::new()),
            events,
            signals: SignalQueue::new(),
            report: None,
            coordinator: None,
            adapter: None,
            generation: 0,
            section: 0,
            shut_down: false,
        })
    }

    /// Millisecond clock used to timestamp events.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_stats(mut self, stats: Rc<RendererStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn stats(&self) -> &Rc<RendererStats> {
        &self.stats
    }

    /// Queue adapters report into. The embedding installs a waker on it.
    pub fn signals(&self) -> &SignalQueue {
        &self.signals
    }

    pub fn report(&self) -> Option<CapabilityReport> {
        self.report
    }

    pub fn current_choice(&self) -> Option<RendererChoice> {
        self.coordinator.as_ref().map(FallbackCoordinator::current)
    }

    pub fn is_exhausted(&self) -> bool {
        self.coordinator
            .as_ref()
            .is_some_and(FallbackCoordinator::is_exhausted)
    }

    pub fn adapter_lifecycle(&self) -> Option<AdapterLifecycleState> {
        self.adapter.as_ref().map(|adapter| adapter.lifecycle())
    }

    pub fn active_section(&self) -> usize {
        self.section
    }

    pub fn drain_events(&mut self) -> Vec<RendererEvent> {
        self.events.drain()
    }

    /// Starts the chain from a resolved probe. Must be called exactly once;
    /// use [`RendererHost::retry`] afterwards.
    pub fn start(&mut self, report: CapabilityReport) -> Result<RendererChoice, RendererError> {
        if self.shut_down {
            return Err(RendererError::MountAfterDispose);
        }
        if self.report.is_some() {
            return Err(RendererError::AlreadyMounted);
        }
        self.begin(report);
        Ok(self.current_choice().unwrap_or(RendererChoice::Exhausted))
    }

    /// Explicit user-initiated retry with a fresh probe result.
    pub fn retry(&mut self, report: CapabilityReport) -> Result<RendererChoice, RendererError> {
        if self.shut_down {
            return Err(RendererError::MountAfterDispose);
        }
        if self.report.is_none() {
            return Err(RendererError::NotProbed);
        }
        self.dispose_adapter();
        let initial = select_with_config(&report, &self.config);
        let now = (self.clock)();
        if let Some(coordinator) = self.coordinator.as_mut() {
            let events = &mut self.events;
            coordinator.manual_retry(now, initial, &self.stats, |e| events.push(e));
        }
        self.coordinator = None;
        self.report = None;
        self.begin(report);
        Ok(self.current_choice().unwrap_or(RendererChoice::Exhausted))
    }

    fn begin(&mut self, report: CapabilityReport) {
        self.report = Some(report);
        self.observer.on_capability_resolved(&report);
        let now = (self.clock)();
        self.events.push(
            RendererEvent::new(
                now,
                select_with_config(&report, &self.config),
                EventSeverity::Info,
                EventCategory::Probe,
                format!(
                    "Graphics capabilities resolved: {}",
                    report.performance_level().as_str()
                ),
            )
            .with_detail("webgpu", report.supports_tier_a().to_string())
            .with_detail("webgl2", report.supports_tier_b().to_string())
            .with_detail("webgl", report.supports_tier_c().to_string()),
        );

        let initial = select_with_config(&report, &self.config);
        let mut coordinator = FallbackCoordinator::new(initial);

        if !report.has_any_backend() && !self.config.mount_baseline_without_gpu {
            let events = &mut self.events;
            coordinator.exhaust(now, "no graphics backend detected", &self.stats, |e| {
                events.push(e)
            });
            self.coordinator = Some(coordinator);
            self.enter_exhausted(None);
            return;
        }
        if !report.has_any_backend() {
            tracing::info!("no GPU backend detected; attempting the 2D canvas renderer");
        }

        self.coordinator = Some(coordinator);
        self.mount_current();
        self.pump_signals();
    }

    pub fn set_active_section(&mut self, index: usize) -> Result<(), RendererError> {
        self.config.check_section(index)?;
        self.section = index;
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_active_section(index);
        }
        Ok(())
    }

    /// Processes every queued adapter signal, including ones raised by
    /// replacement adapters mounted while draining.
    pub fn pump_signals(&mut self) {
        while let Some(QueuedSignal { generation, signal }) = self.signals.pop() {
            if generation != self.generation || self.adapter.is_none() {
                tracing::debug!(
                    "dropping {signal:?} from mount #{generation}; current mount is #{}",
                    self.generation
                );
                continue;
            }
            match signal {
                AdapterSignal::FirstFrame(choice) => self.on_first_frame(choice),
                AdapterSignal::Failed(failure) => self.on_failure(failure),
            }
        }
    }

    /// Tears the current adapter down for good. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.dispose_adapter();
        while self.signals.pop().is_some() {}
    }

    fn on_first_frame(&mut self, choice: RendererChoice) {
        if self.current_choice() != Some(choice) || self.adapter.is_none() {
            return;
        }
        self.stats.inc_mounts_succeeded();
        let now = (self.clock)();
        self.events.push(RendererEvent::new(
            now,
            choice,
            EventSeverity::Info,
            EventCategory::Init,
            format!("Renderer {} running", choice.as_str()),
        ));
    }

    fn on_failure(&mut self, failure: AdapterFailure) {
        let Some(coordinator) = self.coordinator.as_mut() else {
            return;
        };
        let now = (self.clock)();
        let events = &mut self.events;
        let outcome = coordinator.handle_failure(now, &failure, &self.stats, |e| events.push(e));

        match outcome {
            FallbackOutcome::Ignored => {}
            FallbackOutcome::Demoted { from, to } => {
                self.dispose_adapter();
                if self.config.notify_on_demotion {
                    self.notify(Notice {
                        kind: NoticeKind::Demoted,
                        choice: to,
                        phase: Some(failure.phase),
                        message: demotion_message(from, to, failure.phase),
                    });
                }
                self.mount_current();
            }
            FallbackOutcome::Exhausted => {
                if self.adapter.is_some() {
                    self.dispose_adapter();
                    self.enter_exhausted(Some(failure.phase));
                }
            }
        }
    }

    fn enter_exhausted(&mut self, phase: Option<FailurePhase>) {
        self.observer.on_renderer_changed(RendererChoice::Exhausted);
        self.observer.on_exhausted();
        self.notify(Notice {
            kind: NoticeKind::Exhausted,
            choice: RendererChoice::Exhausted,
            phase,
            message: "3D unavailable; showing the content-only view".to_string(),
        });
    }

    fn mount_current(&mut self) {
        loop {
            let Some(choice) = self.current_choice() else {
                return;
            };
            if choice.is_exhausted() {
                return;
            }
            // Dispose-before-mount on the shared container.
            self.dispose_adapter();

            self.stats.inc_mounts_attempted();
            match self.factory.create(choice, &self.config) {
                Ok(mut adapter) => {
                    tracing::info!("mounting {} renderer", choice.as_str());
                    self.observer.on_renderer_changed(choice);
                    self.generation += 1;
                    let hooks = AdapterHooks::new(
                        choice,
                        self.generation,
                        self.navigate.clone(),
                        self.signals.clone(),
                    );
                    adapter.mount(&self.container, self.section, hooks);
                    self.adapter = Some(adapter);
                    return;
                }
                Err(err) => {
                    // No instance to dispose; demote inline and try the next tier.
                    let failure = AdapterFailure::construction(choice, err);
                    let Some(coordinator) = self.coordinator.as_mut() else {
                        return;
                    };
                    let now = (self.clock)();
                    let events = &mut self.events;
                    let outcome =
                        coordinator.handle_failure(now, &failure, &self.stats, |e| events.push(e));
                    match outcome {
                        FallbackOutcome::Demoted { from, to } => {
                            if self.config.notify_on_demotion {
                                self.notify(Notice {
                                    kind: NoticeKind::Demoted,
                                    choice: to,
                                    phase: Some(FailurePhase::Construction),
                                    message: demotion_message(
                                        from,
                                        to,
                                        FailurePhase::Construction,
                                    ),
                                });
                            }
                        }
                        FallbackOutcome::Exhausted => {
                            self.enter_exhausted(Some(FailurePhase::Construction));
                            return;
                        }
                        FallbackOutcome::Ignored => return,
                    }
                }
            }
        }
    }

    fn dispose_adapter(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.dispose();
            self.stats.inc_disposals();
        }
    }

    fn notify(&self, notice: Notice) {
        if let Err(err) = self.observer.on_notice(&notice) {
            tracing::warn!("failed to show renderer notice: {err}");
        }
    }
}

impl<F: AdapterFactory> Drop for RendererHost<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn demotion_message(from: RendererChoice, to: RendererChoice, phase: FailurePhase) -> String {
    let what = match phase {
        FailurePhase::Construction => "could not start",
        FailurePhase::Runtime => "stopped working",
    };
    format!(
        "The {} view {what}; trying the {} view",
        from.as_str(),
        to.as_str()
    )
}
