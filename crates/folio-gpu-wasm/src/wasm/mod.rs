use std::sync::Once;

use wasm_bindgen::prelude::*;

mod canvas_adapter;
mod dom;
mod frame_loop;
mod gpu_adapter;
mod listeners;
pub mod options;
mod probe;
mod script_loader;
mod shell;
mod telemetry;

pub use probe::detect_graphics_capabilities;
pub use script_loader::{load_animation_library, release_animation_library};
pub use shell::{webgl_error_message, PortfolioRenderer};
pub use telemetry::{drain_renderer_events, get_frame_timings, get_renderer_stats};

static LOGGING: Once = Once::new();

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
}

/// Installs the console subscriber. Only the first call's level applies.
pub(crate) fn init_logging(level: tracing::Level) {
    LOGGING.call_once(|| {
        let config = tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build();
        tracing_wasm::set_as_global_default_with_config(config);
    });
}
