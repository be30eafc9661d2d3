//! Pipeline orchestrator - coordinates all components.
//!
//! Plays the part of the packet-processing framework around the dispatch
//! core: it owns the registry, drives every worker through
//! thread-init / dispatch / exit report / thread-deinit, and shuts the
//! registry down once all workers have returned.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::{OutputsBlueprint, RecordKind, WorkerInfo};
use dispatcher::{DispatchError, LoggerRegistry, ModuleTable, RegistryBuilder};
use observability::DispatchMetricsAggregator;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::traffic::{EngineCounters, TrafficGenerator};
use super::PipelineStats;
use crate::error::CliError;

/// Upper bound on how long the stats worker sleeps between stop checks
const STATS_POLL: Duration = Duration::from_millis(50);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The outputs blueprint
    pub blueprint: OutputsBlueprint,

    /// Maximum number of packets across all workers (None = unlimited)
    pub max_packets: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Delay between packets on each worker (None = no pacing)
    pub packet_interval: Option<Duration>,

    /// Every Nth packet carries alerts
    pub alert_every: u64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Resolve and register every enabled output, then freeze the registry
pub fn build_registry(blueprint: &OutputsBlueprint) -> Result<Arc<LoggerRegistry>> {
    let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
    dispatcher::register_outputs(&mut builder, &blueprint.outputs)
        .context("Failed to register outputs")?;

    if builder.is_empty() {
        warn!("No outputs registered - records will not be written anywhere");
    }
    Ok(builder.freeze())
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = self.config;

        // Initialize Metrics (optional)
        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let registry = build_registry(&config.blueprint)?;

        let workers = config.blueprint.engine.workers;
        let names: Vec<String> = (1..=workers).map(|i| format!("W#{i:02}")).collect();
        let counters = Arc::new(EngineCounters::new(names.iter().cloned()));
        let stop = Arc::new(AtomicBool::new(false));
        let budget = Arc::new(PacketBudget::new(config.max_packets));

        let mut packet_tasks = Vec::with_capacity(workers);
        for (slot, name) in names.into_iter().enumerate() {
            let worker = PacketWorker {
                info: WorkerInfo::new(slot + 1, name),
                slot,
                registry: Arc::clone(&registry),
                counters: Arc::clone(&counters),
                stop: Arc::clone(&stop),
                budget: Arc::clone(&budget),
                packet_interval: config.packet_interval,
                alert_every: config.alert_every,
            };
            let name = worker.info.name.clone();
            packet_tasks.push((name, tokio::task::spawn_blocking(move || worker.run())));
        }

        let stats_stop = Arc::new(AtomicBool::new(false));
        let stats_worker = StatsWorker {
            info: WorkerInfo::new(workers + 1, "ST#01"),
            registry: Arc::clone(&registry),
            counters: Arc::clone(&counters),
            stop: Arc::clone(&stats_stop),
            halt_packets: Arc::clone(&stop),
            interval: Duration::from_millis(config.blueprint.engine.stats_interval_ms),
        };
        let stats_name = stats_worker.info.name.clone();
        let stats_task = tokio::task::spawn_blocking(move || stats_worker.run());

        info!(
            workers,
            max_packets = ?config.max_packets,
            "Pipeline running"
        );

        let watcher = spawn_stop_watcher(Arc::clone(&stop), config.timeout);

        // Packet workers first, the stats worker last so its final
        // snapshot covers every packet.
        let mut dispatch = DispatchMetricsAggregator::new();
        let mut failure: Option<CliError> = None;
        for (name, task) in packet_tasks {
            match join_worker(&name, task).await {
                Ok(report) => {
                    debug!(worker = %name, packets = report.packets, "Packet worker finished");
                    dispatch.merge(&report.dispatch);
                }
                Err(e) => {
                    error!(worker = %name, error = %e, "Packet worker failed");
                    stop.store(true, Ordering::Relaxed);
                    failure.get_or_insert(e);
                }
            }
        }
        watcher.abort();

        stats_stop.store(true, Ordering::Relaxed);
        match join_worker(&stats_name, stats_task).await {
            Ok(report) => dispatch.merge(&report.dispatch),
            Err(e) => {
                error!(worker = %stats_name, error = %e, "Stats worker failed");
                failure.get_or_insert(e);
            }
        }

        // Shutdown
        info!("Shutting down logger registry...");
        let loggers = registry.metrics();
        let outputs_closed = registry
            .shutdown()
            .map_err(|e| CliError::shutdown(e.to_string()))?;

        if let Some(e) = failure {
            return Err(e).context("Pipeline execution failed");
        }

        let stats = PipelineStats {
            packets: counters.packets(),
            duration: start_time.elapsed(),
            workers,
            outputs_closed,
            dispatch,
            loggers,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            pps = format!("{:.2}", stats.pps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

async fn join_worker(
    name: &str,
    task: JoinHandle<Result<WorkerReport, CliError>>,
) -> Result<WorkerReport, CliError> {
    task.await
        .map_err(|e| CliError::worker_aborted(name, e.to_string()))?
}

/// Set `stop` on Ctrl+C, SIGTERM or timeout
fn spawn_stop_watcher(stop: Arc<AtomicBool>, timeout: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown_signal() => warn!("Received shutdown signal, stopping workers..."),
            _ = deadline => info!("Timeout reached, stopping workers..."),
        }
        stop.store(true, Ordering::Relaxed);
    })
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Packet budget shared by all packet workers
#[derive(Debug)]
struct PacketBudget {
    limit: Option<u64>,
    taken: AtomicU64,
}

impl PacketBudget {
    fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            taken: AtomicU64::new(0),
        }
    }

    fn try_take(&self) -> bool {
        match self.limit {
            None => true,
            Some(limit) => self.taken.fetch_add(1, Ordering::Relaxed) < limit,
        }
    }
}

/// What a worker did before it returned
#[derive(Debug, Default)]
struct WorkerReport {
    packets: u64,
    dispatch: DispatchMetricsAggregator,
}

struct PacketWorker {
    info: WorkerInfo,
    slot: usize,
    registry: Arc<LoggerRegistry>,
    counters: Arc<EngineCounters>,
    stop: Arc<AtomicBool>,
    budget: Arc<PacketBudget>,
    packet_interval: Option<Duration>,
    alert_every: u64,
}

impl PacketWorker {
    fn run(self) -> Result<WorkerReport, CliError> {
        let result = self.process();
        if result.is_err() {
            self.stop.store(true, Ordering::Relaxed);
        }
        result
    }

    fn process(&self) -> Result<WorkerReport, CliError> {
        let name = self.info.name.clone();
        let mut store = self
            .registry
            .thread_init(self.info.clone())
            .map_err(|e| CliError::worker(&name, e))?;

        let mut generator = TrafficGenerator::new(self.info.id, self.alert_every);
        let mut report = WorkerReport::default();

        let outcome = loop {
            if self.stop.load(Ordering::Relaxed) || !self.budget.try_take() {
                break Ok(());
            }

            let batch = generator.next_batch(Utc::now());
            self.counters.observe(self.slot, &batch);
            report.packets += 1;

            // Only packets that raised alerts reach the loggers
            if !batch.is_empty() {
                let started = Instant::now();
                if let Err(e) = self.registry.dispatch(&mut store, &batch) {
                    break Err(e);
                }
                let latency_us = started.elapsed().as_secs_f64() * 1_000_000.0;
                report.dispatch.record_alert_batch(batch.len(), latency_us);
                observability::record_records_dispatched(RecordKind::Alert, 1, latency_us);
            }

            if let Some(interval) = self.packet_interval {
                std::thread::sleep(interval);
            }
        };

        finish(&self.registry, store, outcome).map_err(|e| CliError::worker(&name, e))?;
        Ok(report)
    }
}

struct StatsWorker {
    info: WorkerInfo,
    registry: Arc<LoggerRegistry>,
    counters: Arc<EngineCounters>,
    stop: Arc<AtomicBool>,
    /// Raised when this worker fails so packet workers wind down too
    halt_packets: Arc<AtomicBool>,
    interval: Duration,
}

impl StatsWorker {
    fn run(self) -> Result<WorkerReport, CliError> {
        let result = self.process();
        if result.is_err() {
            self.halt_packets.store(true, Ordering::Relaxed);
        }
        result
    }

    fn process(&self) -> Result<WorkerReport, CliError> {
        let name = self.info.name.clone();
        let mut store = self
            .registry
            .thread_init(self.info.clone())
            .map_err(|e| CliError::worker(&name, e))?;

        let mut report = WorkerReport::default();
        let mut last = Instant::now();

        let outcome = loop {
            let stopping = self.stop.load(Ordering::Relaxed);
            if stopping || last.elapsed() >= self.interval {
                let snapshot = self.counters.snapshot(Utc::now());
                let started = Instant::now();
                if let Err(e) = self.registry.dispatch(&mut store, &snapshot) {
                    break Err(e);
                }
                let latency_us = started.elapsed().as_secs_f64() * 1_000_000.0;
                report.dispatch.record_stats_snapshot(latency_us);
                observability::record_records_dispatched(RecordKind::Stats, 1, latency_us);
                last = Instant::now();
            }
            if stopping {
                break Ok(());
            }
            std::thread::sleep(STATS_POLL.min(self.interval));
        };

        finish(&self.registry, store, outcome).map_err(|e| CliError::worker(&name, e))?;
        Ok(report)
    }
}

/// Exit report then thread-deinit; the store is released even after a failed loop
fn finish(
    registry: &LoggerRegistry,
    store: dispatcher::DispatchStore,
    outcome: Result<(), DispatchError>,
) -> Result<(), DispatchError> {
    let reported = outcome.and_then(|()| registry.exit_report(&store));
    let released = registry.thread_deinit(store);
    reported.and(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OutputConfig;

    fn blueprint(dir: &tempfile::TempDir, workers: usize) -> OutputsBlueprint {
        let target = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
        OutputsBlueprint {
            version: Default::default(),
            engine: contracts::EngineConfig {
                workers,
                stats_interval_ms: 10,
            },
            outputs: vec![
                OutputConfig::new("stats", "stats-table").with_param("target", target("stats.log")),
                OutputConfig::new("fast", "syslog-alert").with_param("target", target("fast.log")),
                OutputConfig::new("eve", "json-alert").with_param("target", target("eve.json")),
            ],
        }
    }

    #[test]
    fn test_packet_budget() {
        let budget = PacketBudget::new(Some(2));
        assert!(budget.try_take());
        assert!(budget.try_take());
        assert!(!budget.try_take());
        assert!(PacketBudget::new(None).try_take());
    }

    #[test]
    fn test_build_registry_rejects_unknown_module() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint(&dir, 1);
        bp.outputs.push(OutputConfig::new("pcap", "pcap-log"));

        let err = build_registry(&bp).unwrap_err();
        assert!(format!("{err:#}").contains("pcap-log"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_runs_to_record_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            blueprint: blueprint(&dir, 2),
            max_packets: Some(100),
            timeout: Some(Duration::from_secs(30)),
            packet_interval: None,
            alert_every: 5,
            metrics_port: None,
        };

        let stats = Pipeline::new(config).run().await.unwrap();

        assert_eq!(stats.packets, 100);
        assert_eq!(stats.workers, 2);
        assert_eq!(stats.outputs_closed, 3);
        assert_eq!(stats.dispatch.alert_batches, stats.dispatch.alerts);
        assert!(stats.dispatch.stats_snapshots >= 1);

        let labels: Vec<_> = stats.loggers.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["stats", "fast", "eve"]);
        let (_, fast) = &stats.loggers[1];
        assert_eq!(fast.delivered, stats.dispatch.alert_batches);
        assert_eq!(fast.skipped, stats.dispatch.stats_snapshots);
        assert_eq!(fast.active_threads, 0);

        let eve = std::fs::read_to_string(dir.path().join("eve.json")).unwrap();
        assert_eq!(eve.lines().count() as u64, stats.dispatch.alerts);
        let table = std::fs::read_to_string(dir.path().join("stats.log")).unwrap();
        assert!(table.contains("decoder.pkts"));
    }
}
