//! stats-table - renders counter snapshots as a text table

use std::fmt::Write as _;
use std::sync::Mutex;

use contracts::{
    ContractError, ModuleDescriptor, OutputConfig, OutputContext, RecordHandler, SharedContext,
    StatsSnapshot, ThreadContext, TOTAL_SCOPE,
};
use tracing::{debug, info, warn};

use super::target::{lock, LineTarget, TargetSpec};

/// Module table key
pub const MODULE_NAME: &str = "stats-table";

const RULE_WIDTH: usize = 84;

/// Which counter scopes a table includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableScopes {
    /// Process-wide totals
    pub totals: bool,
    /// Per-thread values
    pub threads: bool,
}

impl Default for TableScopes {
    fn default() -> Self {
        Self {
            totals: true,
            threads: false,
        }
    }
}

impl TableScopes {
    fn includes(&self, scope: &str) -> bool {
        if scope == TOTAL_SCOPE {
            self.totals
        } else {
            self.threads
        }
    }
}

struct TableState {
    target: LineTarget,
    snapshots: u64,
}

/// Shared output state of one stats-table instance
pub struct StatsTableContext {
    output: String,
    scopes: TableScopes,
    state: Mutex<TableState>,
}

impl StatsTableContext {
    pub fn new(output: impl Into<String>, scopes: TableScopes, target: LineTarget) -> Self {
        Self {
            output: output.into(),
            scopes,
            state: Mutex::new(TableState {
                target,
                snapshots: 0,
            }),
        }
    }

    /// Build from an output's params (`target`, `totals`, `threads`)
    pub fn from_config(config: &OutputConfig) -> Result<Self, ContractError> {
        let defaults = TableScopes::default();
        let scopes = TableScopes {
            totals: parse_flag(config, "totals", defaults.totals)?,
            threads: parse_flag(config, "threads", defaults.threads)?,
        };
        if !scopes.totals && !scopes.threads {
            return Err(ContractError::backend_init(
                &config.name,
                "at least one of 'totals' or 'threads' must be enabled",
            ));
        }

        let spec = TargetSpec::from_params(&config.params, TargetSpec::Stdout);
        let target = LineTarget::open(spec)
            .map_err(|e| ContractError::backend_init(&config.name, e.to_string()))?;
        Ok(Self::new(&config.name, scopes, target))
    }

    pub fn scopes(&self) -> TableScopes {
        self.scopes
    }

    /// Tables written by all workers
    pub fn snapshots(&self) -> u64 {
        lock(&self.state).snapshots
    }

    fn write(&self, table: &str) {
        let mut state = lock(&self.state);
        match state.target.write_all(table.as_bytes()) {
            Ok(()) => state.snapshots += 1,
            Err(e) => warn!(output = %self.output, error = %e, "Write failed"),
        }
    }
}

impl OutputContext for StatsTableContext {
    fn close(&self) {
        let mut state = lock(&self.state);
        if let Err(e) = state.target.flush() {
            warn!(output = %self.output, error = %e, "Flush failed on close");
        }
        info!(
            output = %self.output,
            snapshots = state.snapshots,
            "stats-table output closed"
        );
    }
}

fn parse_flag(config: &OutputConfig, key: &str, default: bool) -> Result<bool, ContractError> {
    match config.param(key) {
        None => Ok(default),
        Some("true" | "yes" | "on") => Ok(true),
        Some("false" | "no" | "off") => Ok(false),
        Some(other) => Err(ContractError::backend_init(
            &config.name,
            format!("'{key}' must be a boolean, got '{other}'"),
        )),
    }
}

/// Per-worker state
pub struct TableThread {
    shared: SharedContext,
    table: String,
    snapshots: u64,
}

impl TableThread {
    /// Snapshots this worker has rendered
    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }
}

/// Module table entry
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_NAME)
        .with_thread_init(|worker, shared| {
            if shared.downcast_ref::<StatsTableContext>().is_none() {
                return Err(ContractError::thread_init(
                    MODULE_NAME,
                    "shared context is missing or not a stats-table output",
                ));
            }
            debug!(worker = %worker, "stats-table thread ready");
            Ok(ThreadContext::new(TableThread {
                shared: shared.clone(),
                table: String::new(),
                snapshots: 0,
            }))
        })
        .with_exit_stats_print(|worker, ctx| {
            if let Some(thread) = ctx.downcast_ref::<TableThread>() {
                info!(
                    worker = %worker,
                    snapshots = thread.snapshots,
                    "({worker}) Stats tables written"
                );
            }
        })
}

/// Build the shared context and record handler for one output
pub fn open(config: &OutputConfig) -> Result<(RecordHandler, SharedContext), ContractError> {
    let ctx = StatsTableContext::from_config(config)?;
    Ok((RecordHandler::stats(log_snapshot), SharedContext::new(ctx)))
}

fn log_snapshot(ctx: &mut ThreadContext, snapshot: &StatsSnapshot) {
    let Some(thread) = ctx.downcast_mut::<TableThread>() else {
        return;
    };
    let Some(shared) = thread.shared.downcast_ref::<StatsTableContext>() else {
        return;
    };

    thread.table.clear();
    render_table(&mut thread.table, snapshot, shared.scopes());
    shared.write(&thread.table);
    thread.snapshots += 1;
}

/// Render a snapshot as a table
pub fn render_table(out: &mut String, snapshot: &StatsSnapshot, scopes: TableScopes) {
    let secs = snapshot.uptime_secs;
    let (days, hours, mins, secs) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );

    let _ = writeln!(out, "{:-<RULE_WIDTH$}", "");
    let _ = writeln!(
        out,
        "Date: {} (uptime: {days}d, {hours:02}h {mins:02}m {secs:02}s)",
        snapshot.captured_at.format("%m/%d/%Y -- %H:%M:%S")
    );
    let _ = writeln!(out, "{:-<RULE_WIDTH$}", "");
    let _ = writeln!(out, "{:<45} | {:<25} | Value", "Counter", "TM Name");
    let _ = writeln!(out, "{:-<RULE_WIDTH$}", "");

    for counter in &snapshot.counters {
        if scopes.includes(&counter.scope) {
            let _ = writeln!(
                out,
                "{:<45} | {:<25} | {}",
                counter.name, counter.scope, counter.value
            );
        }
    }
}
