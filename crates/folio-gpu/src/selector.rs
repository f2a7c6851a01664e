use crate::{CapabilityReport, RendererConfig};

/// The currently mounted renderer tier.
///
/// `TierA` mounts the WebGPU scene, `TierB` the WebGL scene and `TierC` the 2D
/// canvas scene. `Exhausted` means no graphical renderer is left for this
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RendererChoice {
    TierA,
    TierB,
    TierC,
    Exhausted,
}

impl RendererChoice {
    /// Label used by the page's renderer indicator.
    pub fn as_str(self) -> &'static str {
        match self {
            RendererChoice::TierA => "webgpu",
            RendererChoice::TierB => "webgl",
            RendererChoice::TierC => "canvas",
            RendererChoice::Exhausted => "none",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "webgpu" => Some(RendererChoice::TierA),
            "webgl" | "webgl2" => Some(RendererChoice::TierB),
            "canvas" | "2d" => Some(RendererChoice::TierC),
            "none" => Some(RendererChoice::Exhausted),
            _ => None,
        }
    }

    /// One-step demotion. `Exhausted` stays `Exhausted`.
    pub fn demoted(self) -> Self {
        match self {
            RendererChoice::TierA => RendererChoice::TierB,
            RendererChoice::TierB => RendererChoice::TierC,
            RendererChoice::TierC | RendererChoice::Exhausted => RendererChoice::Exhausted,
        }
    }

    pub fn is_exhausted(self) -> bool {
        self == RendererChoice::Exhausted
    }
}

/// Maps a capability report to the first renderer to mount.
///
/// WebGL2 and WebGL1 share the WebGL scene; only the 2D canvas remains when
/// neither is present. Never returns `Exhausted`.
pub fn select_initial(report: &CapabilityReport) -> RendererChoice {
    if report.supports_tier_a() {
        RendererChoice::TierA
    } else if report.supports_tier_b() || report.supports_tier_c() {
        RendererChoice::TierB
    } else {
        RendererChoice::TierC
    }
}

/// [`select_initial`] with the page's opt-outs applied.
pub fn select_with_config(report: &CapabilityReport, config: &RendererConfig) -> RendererChoice {
    if let Some(forced) = config.force_renderer {
        if !forced.is_exhausted() {
            return forced;
        }
    }
    match select_initial(report) {
        RendererChoice::TierA if config.disable_webgpu => {
            if report.supports_tier_b() || report.supports_tier_c() {
                RendererChoice::TierB
            } else {
                RendererChoice::TierC
            }
        }
        choice => choice,
    }
}
