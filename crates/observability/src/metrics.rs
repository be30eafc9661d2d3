//! Output engine metrics
//!
//! Process-level counters recorded through the `metrics` facade, plus an
//! in-memory aggregator used for end-of-run summaries.

use contracts::RecordKind;
use ::metrics::{counter, gauge, histogram};

/// Record a logger registration
pub fn record_logger_registered(module: &str) {
    counter!(
        "packet_outputd_loggers_registered_total",
        "module" => module.to_string()
    )
    .increment(1);
}

/// Record the registry size when it is frozen
pub fn record_registry_frozen(loggers: usize) {
    gauge!("packet_outputd_registry_loggers").set(loggers as f64);
}

/// Record a worker thread-init outcome
pub fn record_thread_init(worker: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "packet_outputd_thread_init_total",
        "worker" => worker.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a worker thread-deinit
pub fn record_thread_deinit(worker: &str) {
    counter!(
        "packet_outputd_thread_deinit_total",
        "worker" => worker.to_string()
    )
    .increment(1);
}

/// Record dispatched records of one kind and the time spent (microseconds)
pub fn record_records_dispatched(kind: RecordKind, count: u64, latency_us: f64) {
    let kind = match kind {
        RecordKind::Alert => "alert",
        RecordKind::Stats => "stats",
    };
    counter!("packet_outputd_records_dispatched_total", "kind" => kind).increment(count);
    histogram!("packet_outputd_dispatch_latency_us", "kind" => kind).record(latency_us);
}

/// Dispatch metrics aggregator
///
/// Aggregates per-worker dispatch activity in memory for summaries.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// Alert batches dispatched
    pub alert_batches: u64,

    /// Individual alerts carried by those batches
    pub alerts: u64,

    /// Stats snapshots dispatched
    pub stats_snapshots: u64,

    /// Dispatch latency (microseconds)
    pub latency_stats: RunningStats,
}

impl DispatchMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one dispatched alert batch
    pub fn record_alert_batch(&mut self, alerts: usize, latency_us: f64) {
        self.alert_batches += 1;
        self.alerts += alerts as u64;
        self.latency_stats.push(latency_us);
    }

    /// Account one dispatched stats snapshot
    pub fn record_stats_snapshot(&mut self, latency_us: f64) {
        self.stats_snapshots += 1;
        self.latency_stats.push(latency_us);
    }

    /// Fold another worker's aggregate into this one
    pub fn merge(&mut self, other: &Self) {
        self.alert_batches += other.alert_batches;
        self.alerts += other.alerts;
        self.stats_snapshots += other.stats_snapshots;
        self.latency_stats.merge(&other.latency_stats);
    }

    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            alert_batches: self.alert_batches,
            alerts: self.alerts,
            stats_snapshots: self.stats_snapshots,
            latency_us: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub alert_batches: u64,
    pub alerts: u64,
    pub stats_snapshots: u64,
    pub latency_us: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(
            f,
            "Alert batches: {} ({} alerts)",
            self.alert_batches, self.alerts
        )?;
        writeln!(f, "Stats snapshots: {}", self.stats_snapshots)?;
        writeln!(f, "Dispatch latency (us): {}", self.latency_us)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Combine two sample sets (Chan et al. parallel update)
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.mean += delta * other.count as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
