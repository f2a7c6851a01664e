use thiserror::Error;

use crate::lifecycle::AdapterLifecycleState;
use crate::RendererChoice;

pub type Result<T> = std::result::Result<T, RendererError>;

/// Unified error type for renderer probing, mounting and steady-state rendering.
///
/// Browser APIs surface failures as `JsValue`s, so backend-originated errors are
/// carried as human-readable strings rather than platform error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(&'static str),

    #[error("rendering context granted but its handle is null: {0}")]
    NullHandle(&'static str),

    #[error("rendering context lost: {0}")]
    ContextLost(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("missing browser global: {0}")]
    MissingGlobal(&'static str),

    #[error("adapter mounted after dispose")]
    MountAfterDispose,

    #[error("adapter is already mounted")]
    AlreadyMounted,

    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: AdapterLifecycleState,
        to: AdapterLifecycleState,
    },

    #[error("no capability report yet; probe must resolve before mounting")]
    NotProbed,

    #[error("no adapter implementation for {0:?}")]
    NoAdapter(RendererChoice),

    #[error("section index {index} out of range (section count {count})")]
    SectionOutOfRange { index: usize, count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("script load failed: {0}")]
    ScriptLoad(String),
}

/// When a failure was observed relative to the adapter's mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Synchronous or asynchronous setup inside `mount`.
    Construction,
    /// After mount, e.g. in a frame callback or on context loss.
    Runtime,
}

impl FailurePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePhase::Construction => "construction",
            FailurePhase::Runtime => "runtime",
        }
    }
}

/// Failure signal raised by a mounted adapter through its hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterFailure {
    pub choice: RendererChoice,
    pub phase: FailurePhase,
    pub error: RendererError,
}

impl AdapterFailure {
    pub fn construction(choice: RendererChoice, error: RendererError) -> Self {
        Self {
            choice,
            phase: FailurePhase::Construction,
            error,
        }
    }

    pub fn runtime(choice: RendererChoice, error: RendererError) -> Self {
        Self {
            choice,
            phase: FailurePhase::Runtime,
            error,
        }
    }
}
