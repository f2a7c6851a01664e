use std::collections::VecDeque;

use crate::RendererChoice;

const MAX_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimingsReport {
    pub frame_index: u64,
    pub backend: RendererChoice,
    pub last_frame_ms: f64,
    pub average_frame_ms: f64,
    pub slow_frames: u64,
}

/// Rolling window of frame durations for the mounted adapter.
#[derive(Debug)]
pub struct FrameTimeMonitor {
    backend: RendererChoice,
    samples: VecDeque<f64>,
    frame_index: u64,
    slow_frames: u64,
    slow_frame_ms: f64,
}

impl FrameTimeMonitor {
    pub fn new(backend: RendererChoice, slow_frame_ms: f64) -> Self {
        Self {
            backend,
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            frame_index: 0,
            slow_frames: 0,
            slow_frame_ms,
        }
    }

    pub fn record(&mut self, duration_ms: f64) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return;
        }
        self.frame_index += 1;
        if duration_ms > self.slow_frame_ms {
            self.slow_frames += 1;
            tracing::debug!(
                "slow frame on {}: {duration_ms:.2}ms",
                self.backend.as_str()
            );
        }
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(duration_ms);
    }

    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn report(&self) -> Option<FrameTimingsReport> {
        let last = *self.samples.back()?;
        Some(FrameTimingsReport {
            frame_index: self.frame_index,
            backend: self.backend,
            last_frame_ms: last,
            average_frame_ms: self.average_ms(),
            slow_frames: self.slow_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_last_hundred_samples() {
        let mut monitor = FrameTimeMonitor::new(RendererChoice::TierC, 16.0);
        assert!(monitor.report().is_none());

        for _ in 0..50 {
            monitor.record(100.0);
        }
        for _ in 0..100 {
            monitor.record(4.0);
        }

        let report = monitor.report().expect("report");
        assert_eq!(report.frame_index, 150);
        assert_eq!(report.slow_frames, 50);
        assert_eq!(report.last_frame_ms, 4.0);
        assert!((report.average_frame_ms - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ignores_garbage_durations() {
        let mut monitor = FrameTimeMonitor::new(RendererChoice::TierA, 16.0);
        monitor.record(f64::NAN);
        monitor.record(-1.0);
        assert!(monitor.report().is_none());
    }
}
