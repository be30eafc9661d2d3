//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// packet-outputd - output dispatch engine for packet inspection workers
#[derive(Parser, Debug)]
#[command(
    name = "packet-outputd",
    author,
    version,
    about = "Packet-inspection output dispatch engine",
    long_about = "Drives the output dispatch core of a packet-inspection engine.\n\n\
                  Registers the configured output backends, starts packet and stats \n\
                  workers that fan alerts and counter snapshots out to every backend, \n\
                  and tears everything down in order on shutdown."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PACKET_OUTPUTD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PACKET_OUTPUTD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine with synthetic traffic
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "outputs.toml",
        env = "PACKET_OUTPUTD_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the number of packet workers from configuration
    #[arg(short, long, env = "PACKET_OUTPUTD_WORKERS")]
    pub workers: Option<usize>,

    /// Maximum number of packets to generate across all workers (0 = unlimited)
    #[arg(long, default_value = "0", env = "PACKET_OUTPUTD_MAX_PACKETS")]
    pub max_packets: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "PACKET_OUTPUTD_TIMEOUT")]
    pub timeout: u64,

    /// Packets generated per second by each worker (0 = as fast as possible)
    #[arg(long, default_value = "50", env = "PACKET_OUTPUTD_RATE")]
    pub rate: u64,

    /// Every Nth packet carries alerts
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub alert_every: u64,

    /// Validate configuration, register outputs, and exit without running workers
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "PACKET_OUTPUTD_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "outputs.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "outputs.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show output params
    #[arg(long)]
    pub params: bool,

    /// Show the module table
    #[arg(long)]
    pub modules: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "packet-outputd",
            "-v",
            "run",
            "-c",
            "eve.toml",
            "--workers",
            "4",
            "--max-packets",
            "100",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("eve.toml"));
                assert_eq!(args.workers, Some(4));
                assert_eq!(args.max_packets, 100);
                assert_eq!(args.alert_every, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_alert_every_must_be_positive() {
        let result = Cli::try_parse_from(["packet-outputd", "run", "--alert-every", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["packet-outputd", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
