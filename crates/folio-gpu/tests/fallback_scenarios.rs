use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use folio_gpu::host::{Notice, NoticeKind, RendererHost, ShellObserver};
use folio_gpu::lifecycle::{
    AdapterFactory, AdapterHooks, AdapterLifecycleState, BoxedAdapter, LifecycleTracker,
    RendererAdapter,
};
use folio_gpu::{CapabilityReport, RendererChoice, RendererConfig, RendererError};
use pretty_assertions::assert_eq;

/// What a scripted adapter does once mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Run,
    FailOnMount,
    FailOnFirstFrame,
}

/// Stand-in for the DOM container: counts live rendering contexts.
#[derive(Default)]
struct Container {
    live_contexts: Cell<u32>,
    max_live_contexts: Cell<u32>,
}

impl Container {
    fn acquire(&self) {
        let live = self.live_contexts.get() + 1;
        self.live_contexts.set(live);
        self.max_live_contexts
            .set(self.max_live_contexts.get().max(live));
    }

    fn release(&self) {
        self.live_contexts.set(self.live_contexts.get() - 1);
    }
}

#[derive(Default)]
struct Journal {
    entries: RefCell<Vec<String>>,
}

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        self.entries.borrow_mut().drain(..).collect()
    }
}

struct ScriptedAdapter {
    choice: RendererChoice,
    script: Script,
    tracker: LifecycleTracker,
    container: Option<Rc<Container>>,
    hooks: Option<AdapterHooks>,
    sections: Rc<RefCell<Vec<usize>>>,
    journal: Rc<Journal>,
    mounted_hooks: Rc<RefCell<Vec<AdapterHooks>>>,
}

impl ScriptedAdapter {
    fn release(&mut self) {
        if let Some(container) = self.container.take() {
            container.release();
        }
    }
}

impl RendererAdapter for ScriptedAdapter {
    type Container = Rc<Container>;

    fn choice(&self) -> RendererChoice {
        self.choice
    }

    fn mount(&mut self, container: &Rc<Container>, initial_section: usize, hooks: AdapterHooks) {
        self.journal
            .push(format!("mount {} @{initial_section}", self.choice.as_str()));
        container.acquire();
        self.container = Some(container.clone());
        self.mounted_hooks.borrow_mut().push(hooks.clone());

        match self.script {
            Script::FailOnMount => {
                // Release before signaling upward.
                self.release();
                let _ = self.tracker.mark_failed();
                hooks.fail_construction(RendererError::NullHandle("getContext"));
            }
            Script::FailOnFirstFrame => {
                self.release();
                let _ = self.tracker.mark_failed();
                hooks.fail_runtime(RendererError::ContextLost("webglcontextlost".into()));
            }
            Script::Run => {
                let _ = self.tracker.mark_running();
                hooks.first_frame();
            }
        }
        self.hooks = Some(hooks);
    }

    fn set_active_section(&mut self, index: usize) {
        self.sections.borrow_mut().push(index);
    }

    fn dispose(&mut self) {
        if !self.tracker.mark_disposed() {
            return;
        }
        self.journal.push(format!("dispose {}", self.choice.as_str()));
        self.release();
        self.hooks = None;
    }

    fn lifecycle(&self) -> AdapterLifecycleState {
        self.tracker.state()
    }
}

struct ScriptedFactory {
    scripts: HashMap<RendererChoice, Script>,
    unavailable: Vec<RendererChoice>,
    sections: Rc<RefCell<Vec<usize>>>,
    journal: Rc<Journal>,
    mounted_hooks: Rc<RefCell<Vec<AdapterHooks>>>,
}

impl AdapterFactory for ScriptedFactory {
    type Container = Rc<Container>;

    fn create(
        &mut self,
        choice: RendererChoice,
        _config: &RendererConfig,
    ) -> Result<BoxedAdapter<Rc<Container>>, RendererError> {
        if self.unavailable.contains(&choice) {
            return Err(RendererError::NoAdapter(choice));
        }
        Ok(Box::new(ScriptedAdapter {
            choice,
            script: self.scripts.get(&choice).copied().unwrap_or(Script::Run),
            tracker: LifecycleTracker::new(),
            container: None,
            hooks: None,
            sections: self.sections.clone(),
            journal: self.journal.clone(),
            mounted_hooks: self.mounted_hooks.clone(),
        }))
    }
}

#[derive(Default)]
struct Shell {
    resolved: RefCell<Vec<CapabilityReport>>,
    changes: RefCell<Vec<RendererChoice>>,
    exhausted: Cell<u32>,
    notices: RefCell<Vec<Notice>>,
    fail_notices: Cell<bool>,
}

struct SharedShell(Rc<Shell>);

impl ShellObserver for SharedShell {
    fn on_capability_resolved(&self, report: &CapabilityReport) {
        self.0.resolved.borrow_mut().push(*report);
    }

    fn on_renderer_changed(&self, choice: RendererChoice) {
        self.0.changes.borrow_mut().push(choice);
    }

    fn on_exhausted(&self) {
        self.0.exhausted.set(self.0.exhausted.get() + 1);
    }

    fn on_notice(&self, notice: &Notice) -> Result<(), RendererError> {
        self.0.notices.borrow_mut().push(notice.clone());
        if self.0.fail_notices.get() {
            return Err(RendererError::Backend("toast container missing".into()));
        }
        Ok(())
    }
}

struct Harness {
    host: RendererHost<ScriptedFactory>,
    shell: Rc<Shell>,
    container: Rc<Container>,
    journal: Rc<Journal>,
    sections: Rc<RefCell<Vec<usize>>>,
    navigations: Rc<RefCell<Vec<usize>>>,
    /// Hooks handed to every mounted adapter, oldest first.
    mounted_hooks: Rc<RefCell<Vec<AdapterHooks>>>,
}

fn harness(scripts: &[(RendererChoice, Script)], config: RendererConfig) -> Harness {
    harness_with_unavailable(scripts, &[], config)
}

fn harness_with_unavailable(
    scripts: &[(RendererChoice, Script)],
    unavailable: &[RendererChoice],
    config: RendererConfig,
) -> Harness {
    let journal = Rc::new(Journal::default());
    let sections = Rc::new(RefCell::new(Vec::new()));
    let mounted_hooks = Rc::new(RefCell::new(Vec::new()));
    let factory = ScriptedFactory {
        scripts: scripts.iter().copied().collect(),
        unavailable: unavailable.to_vec(),
        sections: sections.clone(),
        journal: journal.clone(),
        mounted_hooks: mounted_hooks.clone(),
    };
    let shell = Rc::new(Shell::default());
    let container = Rc::new(Container::default());
    let navigations = Rc::new(RefCell::new(Vec::new()));
    let nav = navigations.clone();
    let host = RendererHost::new(
        config,
        factory,
        container.clone(),
        Box::new(SharedShell(shell.clone())),
        Rc::new(move |i| nav.borrow_mut().push(i)),
    )
    .expect("valid config");
    Harness {
        host,
        shell,
        container,
        journal,
        sections,
        navigations,
        mounted_hooks,
    }
}

#[test]
fn webgl_mount_failure_settles_on_canvas() {
    let mut h = harness(
        &[(RendererChoice::TierB, Script::FailOnMount)],
        RendererConfig::default(),
    );

    let started = h
        .host
        .start(CapabilityReport::new(false, true, true))
        .unwrap();
    assert_eq!(started, RendererChoice::TierC);

    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierC));
    assert_eq!(
        h.host.adapter_lifecycle(),
        Some(AdapterLifecycleState::Running)
    );
    assert_eq!(
        h.journal.take(),
        vec!["mount webgl @0", "dispose webgl", "mount canvas @0"]
    );
    assert_eq!(
        *h.shell.changes.borrow(),
        vec![RendererChoice::TierB, RendererChoice::TierC]
    );
    assert_eq!(h.shell.exhausted.get(), 0);

    let notices = h.shell.notices.borrow();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Demoted);
    assert_eq!(notices[0].choice, RendererChoice::TierC);

    let snap = h.host.stats().snapshot();
    assert_eq!(snap.mounts_attempted, 2);
    assert_eq!(snap.mounts_succeeded, 1);
    assert_eq!(snap.demotions, 1);

    // Nothing further happens on a later pump.
    drop(notices);
    h.host.pump_signals();
    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierC));
    assert!(h.journal.take().is_empty());
}

#[test]
fn healthy_webgpu_never_touches_the_fallback_chain() {
    let mut h = harness(&[], RendererConfig::default());
    h.host.start(CapabilityReport::all()).unwrap();

    assert_eq!(*h.shell.changes.borrow(), vec![RendererChoice::TierA]);
    assert_eq!(h.shell.resolved.borrow().len(), 1);
    assert!(h.shell.notices.borrow().is_empty());
    let snap = h.host.stats().snapshot();
    assert_eq!(snap.adapter_failures, 0);
    assert_eq!(snap.demotions, 0);
    assert_eq!(snap.mounts_succeeded, 1);
}

#[test]
fn runtime_failures_walk_the_whole_chain_to_exhaustion() {
    let mut h = harness(
        &[
            (RendererChoice::TierA, Script::FailOnFirstFrame),
            (RendererChoice::TierB, Script::FailOnMount),
            (RendererChoice::TierC, Script::FailOnFirstFrame),
        ],
        RendererConfig::default(),
    );
    let started = h.host.start(CapabilityReport::all()).unwrap();

    assert_eq!(started, RendererChoice::Exhausted);
    assert!(h.host.is_exhausted());
    assert_eq!(h.host.adapter_lifecycle(), None);
    assert_eq!(h.shell.exhausted.get(), 1);
    assert_eq!(
        *h.shell.changes.borrow(),
        vec![
            RendererChoice::TierA,
            RendererChoice::TierB,
            RendererChoice::TierC,
            RendererChoice::Exhausted
        ]
    );
    assert_eq!(
        h.journal.take(),
        vec![
            "mount webgpu @0",
            "dispose webgpu",
            "mount webgl @0",
            "dispose webgl",
            "mount canvas @0",
            "dispose canvas",
        ]
    );
    let kinds: Vec<_> = h.shell.notices.borrow().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NoticeKind::Demoted,
            NoticeKind::Demoted,
            NoticeKind::Exhausted
        ]
    );

    // Session stays exhausted; section changes are still accepted.
    h.host.set_active_section(2).unwrap();
    h.host.pump_signals();
    assert!(h.host.is_exhausted());
    assert!(h.journal.take().is_empty());
}

#[test]
fn at_most_one_live_context_across_swaps() {
    let mut h = harness(
        &[
            (RendererChoice::TierA, Script::FailOnFirstFrame),
            (RendererChoice::TierB, Script::FailOnFirstFrame),
        ],
        RendererConfig::default(),
    );
    h.host.start(CapabilityReport::all()).unwrap();

    assert_eq!(h.container.max_live_contexts.get(), 1);
    assert_eq!(h.container.live_contexts.get(), 1);

    h.host.shutdown();
    h.host.shutdown();
    assert_eq!(h.container.live_contexts.get(), 0);
    assert_eq!(h.host.stats().snapshot().disposals, 3);
}

#[test]
fn no_backend_attempts_canvas_by_default() {
    let mut h = harness(&[], RendererConfig::default());
    let started = h.host.start(CapabilityReport::unsupported()).unwrap();

    assert_eq!(started, RendererChoice::TierC);
    assert_eq!(h.journal.take(), vec!["mount canvas @0"]);
    assert_eq!(h.shell.exhausted.get(), 0);
}

#[test]
fn no_backend_goes_straight_to_exhaustion_when_configured() {
    let config = RendererConfig {
        mount_baseline_without_gpu: false,
        ..Default::default()
    };
    let mut h = harness(&[], config);
    let started = h.host.start(CapabilityReport::unsupported()).unwrap();

    assert_eq!(started, RendererChoice::Exhausted);
    assert!(h.journal.take().is_empty());
    assert_eq!(h.shell.exhausted.get(), 1);
    assert_eq!(*h.shell.changes.borrow(), vec![RendererChoice::Exhausted]);
    assert_eq!(h.host.stats().snapshot().mounts_attempted, 0);
}

#[test]
fn factory_errors_demote_like_mount_failures() {
    let mut h = harness_with_unavailable(&[], &[RendererChoice::TierA], RendererConfig::default());
    let started = h.host.start(CapabilityReport::all()).unwrap();

    assert_eq!(started, RendererChoice::TierB);
    assert_eq!(h.journal.take(), vec!["mount webgl @0"]);
    assert_eq!(*h.shell.changes.borrow(), vec![RendererChoice::TierB]);
    assert_eq!(h.host.stats().snapshot().demotions, 1);
}

#[test]
fn failing_notice_does_not_escalate() {
    let mut h = harness(
        &[(RendererChoice::TierA, Script::FailOnMount)],
        RendererConfig::default(),
    );
    h.shell.fail_notices.set(true);
    h.host.start(CapabilityReport::all()).unwrap();

    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierB));
    assert_eq!(h.shell.notices.borrow().len(), 1);
    assert_eq!(h.host.stats().snapshot().demotions, 1);
}

#[test]
fn start_is_once_and_retry_restarts_the_chain() {
    let mut h = harness(
        &[(RendererChoice::TierA, Script::FailOnMount)],
        RendererConfig::default(),
    );
    assert_eq!(
        h.host.retry(CapabilityReport::all()),
        Err(RendererError::NotProbed)
    );

    h.host.start(CapabilityReport::all()).unwrap();
    assert_eq!(
        h.host.start(CapabilityReport::all()),
        Err(RendererError::AlreadyMounted)
    );
    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierB));
    h.journal.take();

    let retried = h.host.retry(CapabilityReport::all()).unwrap();
    assert_eq!(retried, RendererChoice::TierB);
    assert_eq!(
        h.journal.take(),
        vec![
            "dispose webgl",
            "mount webgpu @0",
            "dispose webgpu",
            "mount webgl @0"
        ]
    );
    assert_eq!(h.host.stats().snapshot().manual_retries, 1);
    assert_eq!(h.shell.resolved.borrow().len(), 2);
}

#[test]
fn late_signals_from_a_replaced_mount_are_ignored() {
    let mut h = harness(&[], RendererConfig::default());
    h.host.start(CapabilityReport::all()).unwrap();
    let first_mount = h.mounted_hooks.borrow()[0].clone();

    // The first TierA instance reports a failure that is still queued when
    // the user retries into a fresh TierA instance.
    first_mount.fail_runtime(RendererError::ContextLost("webglcontextlost".into()));
    let retried = h.host.retry(CapabilityReport::all()).unwrap();

    assert_eq!(retried, RendererChoice::TierA);
    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierA));
    assert_eq!(
        h.host.adapter_lifecycle(),
        Some(AdapterLifecycleState::Running)
    );

    // Same for signals raised after the replacement is already running.
    first_mount.fail_construction(RendererError::NullHandle("getContext"));
    first_mount.first_frame();
    h.host.pump_signals();

    assert_eq!(h.host.current_choice(), Some(RendererChoice::TierA));
    assert!(h.shell.notices.borrow().is_empty());
    let snap = h.host.stats().snapshot();
    assert_eq!(snap.adapter_failures, 0);
    assert_eq!(snap.demotions, 0);
    assert_eq!(snap.mounts_succeeded, 2);
    assert_eq!(
        h.journal.take(),
        vec!["mount webgpu @0", "dispose webgpu", "mount webgpu @0"]
    );

    let mounts = h.mounted_hooks.borrow();
    assert_eq!(mounts.len(), 2);
    assert!(mounts[1].generation() > mounts[0].generation());
}

#[test]
fn section_changes_are_bounds_checked_and_forwarded() {
    let mut h = harness(&[], RendererConfig::default());
    h.host.start(CapabilityReport::all()).unwrap();

    for i in [1, 2, 3, 4, 0, 1, 2, 3, 4, 2] {
        h.host.set_active_section(i).unwrap();
    }
    assert_eq!(
        h.host.set_active_section(5),
        Err(RendererError::SectionOutOfRange { index: 5, count: 5 })
    );
    assert_eq!(h.host.active_section(), 2);
    assert_eq!(h.sections.borrow().len(), 10);
    assert_eq!(h.sections.borrow().last(), Some(&2));
}

#[test]
fn remount_uses_the_current_section() {
    let mut h = harness(
        &[(RendererChoice::TierA, Script::Run)],
        RendererConfig::default(),
    );
    h.host.set_active_section(3).unwrap();
    h.host.start(CapabilityReport::new(true, false, false)).unwrap();
    assert_eq!(h.journal.take(), vec!["mount webgpu @3"]);
    assert!(h.navigations.borrow().is_empty());
}

#[test]
fn events_are_recorded_in_order() {
    let mut h = harness(
        &[(RendererChoice::TierA, Script::FailOnMount)],
        RendererConfig::default(),
    );
    h.host.start(CapabilityReport::all()).unwrap();

    let messages: Vec<String> = h.host.drain_events().into_iter().map(|e| e.message).collect();
    assert_eq!(
        messages,
        vec![
            "Graphics capabilities resolved: high".to_string(),
            "Renderer webgpu failed during construction: rendering context granted but its handle is null: getContext".to_string(),
            "Falling back from webgpu to webgl".to_string(),
            "Renderer webgl running".to_string(),
        ]
    );
    assert!(h.host.drain_events().is_empty());
}
