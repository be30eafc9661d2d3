//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::OutputsBlueprint;
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{build_registry, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker count from CLI");
        blueprint.engine.workers = workers.max(1);
    }

    info!(
        workers = blueprint.engine.workers,
        stats_interval_ms = blueprint.engine.stats_interval_ms,
        outputs = blueprint.outputs.len(),
        enabled = blueprint.enabled_outputs().count(),
        "Configuration loaded"
    );

    // Dry run - register outputs, release them, and exit
    if args.dry_run {
        info!("Dry run mode - registering outputs without starting workers");
        let registry = build_registry(&blueprint)?;
        let loggers = registry.len();
        registry
            .shutdown()
            .map_err(|e| CliError::shutdown(e.to_string()))?;
        print_config_summary(&blueprint, loggers);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_packets: if args.max_packets == 0 {
            None
        } else {
            Some(args.max_packets)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        packet_interval: if args.rate == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / args.rate as f64))
        },
        alert_every: args.alert_every,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run()
        .await
        .context("Pipeline execution failed")?;

    info!(
        packets = stats.packets,
        alerts = stats.dispatch.alerts,
        duration_secs = stats.duration.as_secs_f64(),
        pps = format!("{:.2}", stats.pps()),
        "Pipeline completed successfully"
    );

    // Print detailed statistics
    stats.print_summary();

    info!("packet-outputd finished");
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &OutputsBlueprint, loggers: usize) {
    println!("\n=== Configuration Summary ===\n");
    println!("Engine:");
    println!("  Packet workers: {}", blueprint.engine.workers);
    println!(
        "  Stats interval: {} ms",
        blueprint.engine.stats_interval_ms
    );

    println!("\nOutputs ({} registered):", loggers);
    for output in &blueprint.outputs {
        let state = if output.enabled { "" } else { " [disabled]" };
        println!("  - {} ({}){}", output.name, output.module, state);
    }

    println!();
}
