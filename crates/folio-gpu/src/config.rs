use crate::{RendererChoice, RendererError};

pub const DEFAULT_SECTION_COUNT: usize = 5;
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 256;
pub const DEFAULT_SLOW_FRAME_MS: f64 = 16.0;

/// Page-level knobs for renderer selection and fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Never start on the WebGPU tier even if it probes as available.
    pub disable_webgpu: bool,
    /// Pin the starting tier (diagnostics). Demotion still applies.
    pub force_renderer: Option<RendererChoice>,
    /// Attempt the 2D canvas tier when the probe found no GPU backend at all.
    /// When `false` the host goes straight to exhaustion instead.
    pub mount_baseline_without_gpu: bool,
    /// Emit a user-facing notice on each demotion.
    pub notify_on_demotion: bool,
    /// Number of navigable sections rendered as panels.
    pub section_count: usize,
    pub event_log_capacity: usize,
    /// Frames slower than this are logged as slow.
    pub slow_frame_ms: f64,
    /// Treat a WebGPU probe still pending after this long as unsupported.
    pub probe_timeout_ms: Option<u32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            disable_webgpu: false,
            force_renderer: None,
            mount_baseline_without_gpu: true,
            notify_on_demotion: true,
            section_count: DEFAULT_SECTION_COUNT,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            slow_frame_ms: DEFAULT_SLOW_FRAME_MS,
            probe_timeout_ms: None,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<(), RendererError> {
        if self.section_count == 0 {
            return Err(RendererError::InvalidConfig(
                "sectionCount must be at least 1".to_string(),
            ));
        }
        if self.force_renderer == Some(RendererChoice::Exhausted) {
            return Err(RendererError::InvalidConfig(
                "forceRenderer cannot be \"none\"".to_string(),
            ));
        }
        if !(self.slow_frame_ms.is_finite() && self.slow_frame_ms > 0.0) {
            return Err(RendererError::InvalidConfig(format!(
                "slowFrameMs must be a positive number, got {}",
                self.slow_frame_ms
            )));
        }
        if self.event_log_capacity == 0 {
            return Err(RendererError::InvalidConfig(
                "eventLogCapacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_section(&self, index: usize) -> Result<(), RendererError> {
        if index < self.section_count {
            Ok(())
        } else {
            Err(RendererError::SectionOutOfRange {
                index,
                count: self.section_count,
            })
        }
    }
}
