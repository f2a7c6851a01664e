use std::future::Future;

use crate::stats::RendererStats;
use crate::RendererError;

/// Coarse performance classification derived from the best available backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PerformanceLevel {
    Fallback,
    Low,
    Medium,
    High,
}

impl PerformanceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceLevel::High => "high",
            PerformanceLevel::Medium => "medium",
            PerformanceLevel::Low => "low",
            PerformanceLevel::Fallback => "fallback",
        }
    }
}

/// Which graphics backends the page can use, produced once per probe.
///
/// The performance level is always derived from the flags, so a report can
/// never claim `High` without WebGPU support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityReport {
    supports_tier_a: bool,
    supports_tier_b: bool,
    supports_tier_c: bool,
    performance_level: PerformanceLevel,
}

impl CapabilityReport {
    pub fn new(supports_tier_a: bool, supports_tier_b: bool, supports_tier_c: bool) -> Self {
        let performance_level = if supports_tier_a {
            PerformanceLevel::High
        } else if supports_tier_b {
            PerformanceLevel::Medium
        } else if supports_tier_c {
            PerformanceLevel::Low
        } else {
            PerformanceLevel::Fallback
        };
        Self {
            supports_tier_a,
            supports_tier_b,
            supports_tier_c,
            performance_level,
        }
    }

    pub fn unsupported() -> Self {
        Self::new(false, false, false)
    }

    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    /// WebGPU.
    pub fn supports_tier_a(&self) -> bool {
        self.supports_tier_a
    }

    /// WebGL2.
    pub fn supports_tier_b(&self) -> bool {
        self.supports_tier_b
    }

    /// WebGL1.
    pub fn supports_tier_c(&self) -> bool {
        self.supports_tier_c
    }

    pub fn performance_level(&self) -> PerformanceLevel {
        self.performance_level
    }

    pub fn has_any_backend(&self) -> bool {
        self.supports_tier_a || self.supports_tier_b || self.supports_tier_c
    }
}

/// Per-backend probes against the host environment.
///
/// Implementations report a negative outcome as `Err`; [`detect`] turns every
/// error into an "unsupported" flag and never propagates it.
pub trait GraphicsEnvironment {
    /// Negotiate a WebGPU adapter and device. The only probe that suspends.
    fn probe_webgpu(&self) -> impl Future<Output = Result<(), RendererError>>;

    /// Request a WebGL2 context from a disposable surface.
    fn probe_webgl2(&self) -> Result<(), RendererError>;

    /// Request a WebGL1 context from a disposable surface.
    fn probe_webgl(&self) -> Result<(), RendererError>;
}

/// Runs every tier probe and builds a fresh [`CapabilityReport`].
///
/// Not cached: each call re-probes. Lower tiers are probed even when WebGPU is
/// available so the report can drive fallback ordering later.
pub async fn detect<E>(env: &E, stats: &RendererStats) -> CapabilityReport
where
    E: GraphicsEnvironment + ?Sized,
{
    stats.inc_probes_run();

    let tier_a = match env.probe_webgpu().await {
        Ok(()) => {
            tracing::info!("WebGPU detected and available");
            true
        }
        Err(err) => {
            tracing::debug!("WebGPU unavailable: {err}");
            false
        }
    };

    let tier_b = match env.probe_webgl2() {
        Ok(()) => {
            tracing::info!("WebGL2 detected");
            true
        }
        Err(err) => {
            tracing::debug!("WebGL2 unavailable: {err}");
            false
        }
    };

    let tier_c = match env.probe_webgl() {
        Ok(()) => {
            tracing::info!("WebGL detected");
            true
        }
        Err(err) => {
            tracing::debug!("WebGL unavailable: {err}");
            false
        }
    };

    let report = CapabilityReport::new(tier_a, tier_b, tier_c);
    tracing::info!(
        "graphics capabilities: webgpu={tier_a} webgl2={tier_b} webgl={tier_c} level={}",
        report.performance_level().as_str()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeEnv {
        webgpu: Result<(), RendererError>,
        webgl2: Result<(), RendererError>,
        webgl: Result<(), RendererError>,
        calls: Cell<u32>,
    }

    impl FakeEnv {
        fn new(a: bool, b: bool, c: bool) -> Self {
            let flag = |ok: bool, what: &'static str| {
                if ok {
                    Ok(())
                } else {
                    Err(RendererError::ContextUnavailable(what))
                }
            };
            Self {
                webgpu: flag(a, "webgpu"),
                webgl2: flag(b, "webgl2"),
                webgl: flag(c, "webgl"),
                calls: Cell::new(0),
            }
        }
    }

    impl GraphicsEnvironment for FakeEnv {
        async fn probe_webgpu(&self) -> Result<(), RendererError> {
            self.calls.set(self.calls.get() + 1);
            self.webgpu.clone()
        }

        fn probe_webgl2(&self) -> Result<(), RendererError> {
            self.calls.set(self.calls.get() + 1);
            self.webgl2.clone()
        }

        fn probe_webgl(&self) -> Result<(), RendererError> {
            self.calls.set(self.calls.get() + 1);
            self.webgl.clone()
        }
    }

    #[test]
    fn performance_level_tracks_highest_supported_tier() {
        for bits in 0u8..8 {
            let (a, b, c) = (bits & 4 != 0, bits & 2 != 0, bits & 1 != 0);
            let report = CapabilityReport::new(a, b, c);
            let expected = if a {
                PerformanceLevel::High
            } else if b {
                PerformanceLevel::Medium
            } else if c {
                PerformanceLevel::Low
            } else {
                PerformanceLevel::Fallback
            };
            assert_eq!(report.performance_level(), expected, "flags {a} {b} {c}");
            assert_eq!(report.has_any_backend(), a || b || c);
        }
    }

    #[test]
    fn detect_probes_lower_tiers_even_when_webgpu_is_available() {
        let env = FakeEnv::new(true, true, false);
        let stats = RendererStats::new();
        let report = pollster::block_on(detect(&env, &stats));

        assert_eq!(env.calls.get(), 3);
        assert!(report.supports_tier_a());
        assert!(report.supports_tier_b());
        assert!(!report.supports_tier_c());
        assert_eq!(report.performance_level(), PerformanceLevel::High);
    }

    #[test]
    fn detect_swallows_every_probe_failure() {
        let env = FakeEnv {
            webgpu: Err(RendererError::NullHandle("GPUAdapter")),
            webgl2: Err(RendererError::Backend("getContext threw".into())),
            webgl: Err(RendererError::ContextUnavailable("webgl")),
            calls: Cell::new(0),
        };
        let stats = RendererStats::new();
        let report = pollster::block_on(detect(&env, &stats));

        assert_eq!(report, CapabilityReport::unsupported());
        assert_eq!(report.performance_level(), PerformanceLevel::Fallback);
    }

    #[test]
    fn detect_is_not_cached() {
        let env = FakeEnv::new(false, true, true);
        let stats = RendererStats::new();
        let first = pollster::block_on(detect(&env, &stats));
        let second = pollster::block_on(detect(&env, &stats));

        assert_eq!(first, second);
        assert_eq!(env.calls.get(), 6);
        assert_eq!(stats.snapshot().probes_run, 2);
    }
}
