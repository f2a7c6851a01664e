use std::sync::atomic::{AtomicU64, Ordering};

/// Telemetry counters for probing, mounting and fallback.
///
/// Updated from adapter hooks and the host; read by the page through
/// `get_renderer_stats()`.
#[derive(Debug, Default)]
pub struct RendererStats {
    probes_run: AtomicU64,
    mounts_attempted: AtomicU64,
    mounts_succeeded: AtomicU64,
    adapter_failures: AtomicU64,
    demotions: AtomicU64,
    disposals: AtomicU64,
    manual_retries: AtomicU64,
    exhaustions: AtomicU64,
    surface_reconfigures: AtomicU64,
}

impl RendererStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_probes_run(&self) {
        self.probes_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mounts_attempted(&self) {
        self.mounts_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mounts_succeeded(&self) {
        self.mounts_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_adapter_failures(&self) {
        self.adapter_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_demotions(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_disposals(&self) {
        self.disposals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_manual_retries(&self) {
        self.manual_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exhaustions(&self) {
        self.exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_surface_reconfigures(&self) {
        self.surface_reconfigures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RendererStatsSnapshot {
        RendererStatsSnapshot {
            probes_run: self.probes_run.load(Ordering::Relaxed),
            mounts_attempted: self.mounts_attempted.load(Ordering::Relaxed),
            mounts_succeeded: self.mounts_succeeded.load(Ordering::Relaxed),
            adapter_failures: self.adapter_failures.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            disposals: self.disposals.load(Ordering::Relaxed),
            manual_retries: self.manual_retries.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
            surface_reconfigures: self.surface_reconfigures.load(Ordering::Relaxed),
        }
    }

    /// Returns a JSON object as a string.
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStatsSnapshot {
    pub probes_run: u64,
    pub mounts_attempted: u64,
    pub mounts_succeeded: u64,
    pub adapter_failures: u64,
    pub demotions: u64,
    pub disposals: u64,
    pub manual_retries: u64,
    pub exhaustions: u64,
    pub surface_reconfigures: u64,
}

impl RendererStatsSnapshot {
    /// Field names and values in a stable order, for JS object conversion.
    pub fn entries(&self) -> [(&'static str, u64); 9] {
        [
            ("probes_run", self.probes_run),
            ("mounts_attempted", self.mounts_attempted),
            ("mounts_succeeded", self.mounts_succeeded),
            ("adapter_failures", self.adapter_failures),
            ("demotions", self.demotions),
            ("disposals", self.disposals),
            ("manual_retries", self.manual_retries),
            ("exhaustions", self.exhaustions),
            ("surface_reconfigures", self.surface_reconfigures),
        ]
    }

    pub fn to_json(self) -> String {
        let body = self
            .entries()
            .iter()
            .map(|(key, value)| format!("\"{key}\":{value}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{body}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_json_contains_counters() {
        let stats = RendererStats::new();
        stats.inc_mounts_attempted();
        stats.inc_mounts_attempted();
        stats.inc_adapter_failures();
        stats.inc_demotions();
        let json = stats.to_json();
        assert!(json.starts_with('{') && json.ends_with('}'));
        assert!(json.contains("\"mounts_attempted\":2"));
        assert!(json.contains("\"adapter_failures\":1"));
        assert!(json.contains("\"demotions\":1"));
        assert!(json.contains("\"exhaustions\":0"));
    }
}
