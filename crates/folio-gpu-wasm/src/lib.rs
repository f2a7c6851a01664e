#![forbid(unsafe_code)]
//! Browser bindings for `folio-gpu`: the capability probe, the three backend
//! adapters and the `PortfolioRenderer` class the page talks to.

// The full implementation is only meaningful on wasm32.
#[cfg(target_arch = "wasm32")]
mod wasm;

// Re-export wasm bindings so the crate's public surface is identical across
// `crate::` and `crate::wasm::` paths.
#[cfg(target_arch = "wasm32")]
pub use wasm::*;
