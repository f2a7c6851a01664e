//! Lifecycle contract shared by every rendering backend adapter.
//!
//! An adapter is built fresh for each mount attempt by an [`AdapterFactory`],
//! mounted once, receives section updates, and is disposed exactly once from
//! the host's point of view (further `dispose` calls are no-ops). Failures never
//! escape an adapter as errors or panics: they are reported through
//! [`AdapterHooks`], which queue an [`AdapterSignal`] for the host to process
//! outside of the adapter's own call stack.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{AdapterFailure, RendererChoice, RendererConfig, RendererError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterLifecycleState {
    Initializing,
    Running,
    Failed,
    Disposed,
}

/// Enforces the legal lifecycle transitions.
///
/// `Initializing -> Running` on the first rendered frame, `Initializing |
/// Running -> Failed` on any failure, anything `-> Disposed`. `Disposed` is
/// terminal.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleTracker {
    state: AdapterLifecycleState,
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self {
            state: AdapterLifecycleState::Initializing,
        }
    }

    pub fn state(&self) -> AdapterLifecycleState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        matches!(
            self.state,
            AdapterLifecycleState::Initializing | AdapterLifecycleState::Running
        )
    }

    pub fn is_disposed(&self) -> bool {
        self.state == AdapterLifecycleState::Disposed
    }

    /// Returns `Ok(true)` on the first transition to `Running`.
    pub fn mark_running(&mut self) -> Result<bool, RendererError> {
        match self.state {
            AdapterLifecycleState::Initializing => {
                self.state = AdapterLifecycleState::Running;
                Ok(true)
            }
            AdapterLifecycleState::Running => Ok(false),
            from => Err(RendererError::InvalidTransition {
                from,
                to: AdapterLifecycleState::Running,
            }),
        }
    }

    /// Returns `Ok(true)` if this call moved the adapter into `Failed`.
    pub fn mark_failed(&mut self) -> Result<bool, RendererError> {
        match self.state {
            AdapterLifecycleState::Initializing | AdapterLifecycleState::Running => {
                self.state = AdapterLifecycleState::Failed;
                Ok(true)
            }
            AdapterLifecycleState::Failed => Ok(false),
            from => Err(RendererError::InvalidTransition {
                from,
                to: AdapterLifecycleState::Failed,
            }),
        }
    }

    /// Returns `false` when already disposed.
    pub fn mark_disposed(&mut self) -> bool {
        if self.state == AdapterLifecycleState::Disposed {
            return false;
        }
        self.state = AdapterLifecycleState::Disposed;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterSignal {
    FirstFrame(RendererChoice),
    Failed(AdapterFailure),
}

/// Identifies one mount attempt. Signals from an older mount of the same
/// tier are stale once the host has moved on.
pub type MountGeneration = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedSignal {
    pub generation: MountGeneration,
    pub signal: AdapterSignal,
}

/// Queue between adapters and the host.
///
/// Pushing never calls into the host directly; the optional waker lets the
/// embedding schedule a drain (the browser build uses a microtask).
#[derive(Clone, Default)]
pub struct SignalQueue {
    signals: Rc<RefCell<VecDeque<QueuedSignal>>>,
    waker: Rc<RefCell<Option<Rc<dyn Fn()>>>>,
}

impl SignalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_waker(&self, waker: impl Fn() + 'static) {
        *self.waker.borrow_mut() = Some(Rc::new(waker));
    }

    pub fn push(&self, generation: MountGeneration, signal: AdapterSignal) {
        self.signals
            .borrow_mut()
            .push_back(QueuedSignal { generation, signal });
        let waker = self.waker.borrow().clone();
        if let Some(wake) = waker {
            wake();
        }
    }

    pub fn pop(&self) -> Option<QueuedSignal> {
        self.signals.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.signals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.borrow().is_empty()
    }
}

/// Callbacks handed to an adapter on mount.
#[derive(Clone)]
pub struct AdapterHooks {
    choice: RendererChoice,
    generation: MountGeneration,
    navigate: Rc<dyn Fn(usize)>,
    signals: SignalQueue,
}

impl AdapterHooks {
    pub fn new(
        choice: RendererChoice,
        generation: MountGeneration,
        navigate: Rc<dyn Fn(usize)>,
        signals: SignalQueue,
    ) -> Self {
        Self {
            choice,
            generation,
            navigate,
            signals,
        }
    }

    pub fn choice(&self) -> RendererChoice {
        self.choice
    }

    pub fn generation(&self) -> MountGeneration {
        self.generation
    }

    /// The user picked a section in the scene.
    pub fn navigate(&self, index: usize) {
        (self.navigate)(index);
    }

    pub fn first_frame(&self) {
        self.signals
            .push(self.generation, AdapterSignal::FirstFrame(self.choice));
    }

    pub fn fail_construction(&self, error: RendererError) {
        tracing::warn!("{} adapter failed to mount: {error}", self.choice.as_str());
        self.signals.push(
            self.generation,
            AdapterSignal::Failed(AdapterFailure::construction(self.choice, error)),
        );
    }

    pub fn fail_runtime(&self, error: RendererError) {
        tracing::warn!("{} adapter failed while running: {error}", self.choice.as_str());
        self.signals.push(
            self.generation,
            AdapterSignal::Failed(AdapterFailure::runtime(self.choice, error)),
        );
    }
}

/// One rendering backend behind the shared lifecycle contract.
pub trait RendererAdapter {
    type Container;

    fn choice(&self) -> RendererChoice;

    /// Acquire every resource needed to render. Errors go to `hooks`, never to
    /// the caller.
    fn mount(&mut self, container: &Self::Container, initial_section: usize, hooks: AdapterHooks);

    /// Emphasize `index`. The caller has bounds-checked it.
    fn set_active_section(&mut self, index: usize);

    /// Stop the frame loop, detach listeners and free the context. Idempotent.
    fn dispose(&mut self);

    fn lifecycle(&self) -> AdapterLifecycleState;
}

pub type BoxedAdapter<C> = Box<dyn RendererAdapter<Container = C>>;

/// Builds a fresh adapter instance for each mount attempt.
pub trait AdapterFactory {
    type Container;

    fn create(
        &mut self,
        choice: RendererChoice,
        config: &RendererConfig,
    ) -> Result<BoxedAdapter<Self::Container>, RendererError>;
}
