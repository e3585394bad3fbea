use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Submission metrics. All counters are gated behind `enabled`.
///
/// When disabled no registry is created and every `record_*` call returns
/// immediately.
pub struct SubmissionMetrics {
    enabled: bool,
    registry: Option<Registry>,
    pub submissions_total: Option<IntCounterVec>,
    pub store_writes_total: Option<IntCounterVec>,
    pub store_recoveries_total: Option<IntCounter>,
    pub append_duration: Option<Histogram>,
}

impl SubmissionMetrics {
    /// Create a new collector. When `enabled = false`, everything is None.
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let registry = Registry::new();

        let submissions_total = IntCounterVec::new(
            Opts::new("formdrop_submissions_total", "Submissions by outcome and status"),
            &["outcome", "status"],
        )?;

        let store_writes_total = IntCounterVec::new(
            Opts::new(
                "formdrop_store_writes_total",
                "Successful store writes by write strategy",
            ),
            &["strategy"],
        )?;

        let store_recoveries_total = IntCounter::new(
            "formdrop_store_recoveries_total",
            "Unreadable or malformed store files replaced by an empty array",
        )?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new(
                "formdrop_append_duration_seconds",
                "Load, append and save latency",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
        )?;

        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(store_writes_total.clone()))?;
        registry.register(Box::new(store_recoveries_total.clone()))?;
        registry.register(Box::new(append_duration.clone()))?;

        Ok(Self {
            enabled: true,
            registry: Some(registry),
            submissions_total: Some(submissions_total),
            store_writes_total: Some(store_writes_total),
            store_recoveries_total: Some(store_recoveries_total),
            append_duration: Some(append_duration),
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            registry: None,
            submissions_total: None,
            store_writes_total: None,
            store_recoveries_total: None,
            append_duration: None,
        }
    }

    /// Count one answered submission (no-op when disabled).
    #[inline]
    pub fn record_submission(&self, outcome: &str, status: u16) {
        if !self.enabled {
            return;
        }
        if let Some(ref counter) = self.submissions_total {
            let mut buf = itoa::Buffer::new();
            let status_str = buf.format(status);
            counter.with_label_values(&[outcome, status_str]).inc();
        }
    }

    /// Count a successful write and how long the whole append took.
    #[inline]
    pub fn record_write(&self, strategy: &str, recovered: bool, duration_secs: f64) {
        if !self.enabled {
            return;
        }
        if let Some(ref counter) = self.store_writes_total {
            counter.with_label_values(&[strategy]).inc();
        }
        if recovered && let Some(ref counter) = self.store_recoveries_total {
            counter.inc();
        }
        if let Some(ref hist) = self.append_duration {
            hist.observe(duration_secs);
        }
    }

    /// Render prometheus text exposition format.
    pub fn render(&self) -> String {
        if let Some(ref registry) = self.registry {
            let encoder = TextEncoder::new();
            let metric_families = registry.gather();
            let mut buffer = Vec::new();
            encoder.encode(&metric_families, &mut buffer).unwrap_or(());
            String::from_utf8(buffer).unwrap_or_default()
        } else {
            String::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
