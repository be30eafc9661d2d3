//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::DispatchMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Packets analyzed across all packet workers
    pub packets: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Packet workers started
    pub workers: usize,

    /// Outputs closed at registry shutdown
    pub outputs_closed: usize,

    /// Dispatch activity of every worker, merged
    pub dispatch: DispatchMetricsAggregator,

    /// Per-logger counters, in registration order
    pub loggers: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    /// Packets analyzed per second
    pub fn pps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.packets as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Packets analyzed: {}", self.packets);
        println!("   ├─ Packets/s: {:.2}", self.pps());
        println!("   ├─ Packet workers: {}", self.workers);
        println!("   └─ Outputs closed: {}", self.outputs_closed);

        let summary = self.dispatch.summary();

        println!("\n📈 Dispatch");
        println!(
            "   ├─ Alert batches: {} ({} alerts)",
            summary.alert_batches, summary.alerts
        );
        println!("   ├─ Stats snapshots: {}", summary.stats_snapshots);
        println!("   └─ Latency (us): {}", summary.latency_us);

        if !self.loggers.is_empty() {
            println!("\n📤 Loggers ({})", self.loggers.len());
            for (i, (label, snapshot)) in self.loggers.iter().enumerate() {
                let prefix = if i == self.loggers.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: delivered={}, skipped={}",
                    prefix, label, snapshot.delivered, snapshot.skipped
                );
            }
        }

        println!();
    }
}
