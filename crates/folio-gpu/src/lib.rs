//! `folio-gpu` holds the renderer selection and fallback logic behind the
//! portfolio site's graphical views.
//!
//! Currently this crate provides:
//! - Graphics capability detection over a pluggable environment (see
//!   [`detect`] and [`GraphicsEnvironment`]).
//! - Initial renderer selection (see [`select_initial`]).
//! - The one-directional fallback state machine (see
//!   [`fallback::FallbackCoordinator`]).
//! - The adapter lifecycle contract and the host that sequences mounts (see
//!   [`lifecycle::RendererAdapter`] and [`host::RendererHost`]).
//!
//! Nothing here touches browser APIs; `folio-gpu-wasm` supplies the probes
//! and adapters for wasm32.

mod capabilities;
mod config;
mod error;
mod selector;

pub mod events;
pub mod fallback;
pub mod frame_monitor;
pub mod host;
pub mod lifecycle;
pub mod section;
pub mod shared_library;
pub mod stats;
pub mod subscription;

pub use capabilities::{detect, CapabilityReport, GraphicsEnvironment, PerformanceLevel};
pub use config::{
    RendererConfig, DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_SECTION_COUNT, DEFAULT_SLOW_FRAME_MS,
};
pub use error::{AdapterFailure, FailurePhase, RendererError, Result};
pub use fallback::{is_exhausted, on_adapter_failure};
pub use selector::{select_initial, select_with_config, RendererChoice};
