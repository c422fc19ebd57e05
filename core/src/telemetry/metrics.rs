use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Counters for the poll and decode pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_applied: usize,
    pub polls_superseded: usize,
    pub polls_changed: usize,
    pub poll_errors: usize,
    pub decodes_applied: usize,
    pub decodes_failed: usize,
    pub decodes_stale: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_poll(&self, changed: bool) {
        self.update(|metrics| {
            metrics.polls_applied += 1;
            if changed {
                metrics.polls_changed += 1;
            }
        });
    }

    pub fn record_superseded_poll(&self) {
        self.update(|metrics| metrics.polls_superseded += 1);
    }

    pub fn record_poll_error(&self) {
        self.update(|metrics| metrics.poll_errors += 1);
    }

    pub fn record_decode(&self) {
        self.update(|metrics| metrics.decodes_applied += 1);
    }

    pub fn record_decode_failure(&self) {
        self.update(|metrics| metrics.decodes_failed += 1);
    }

    pub fn record_stale_decode(&self) {
        self.update(|metrics| metrics.decodes_stale += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
