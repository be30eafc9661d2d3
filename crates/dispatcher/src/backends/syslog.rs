//! syslog-alert - one syslog-style line per alert

use std::fmt::Write as _;
use std::sync::Mutex;

use contracts::{
    AlertBatch, AlertContext, ContractError, DecoderEvent, FlowAddressing, ModuleDescriptor,
    OutputConfig, OutputContext, PacketAlert, RecordHandler, SharedContext, ThreadContext,
    WorkerInfo,
};
use tracing::{debug, info, warn};

use super::protocol_name;
use super::target::{lock, LineTarget, TargetSpec};

/// Module table key
pub const MODULE_NAME: &str = "syslog-alert";

/// Syslog severity "err"
const SEVERITY_ERR: u8 = 3;

/// Raw bytes printed for decoder events
const RAW_PREVIEW_LEN: usize = 32;

/// Syslog facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facility(u8);

impl Facility {
    pub const LOCAL0: Facility = Facility(16);

    const NAMES: [(&'static str, u8); 20] = [
        ("kern", 0),
        ("user", 1),
        ("mail", 2),
        ("daemon", 3),
        ("auth", 4),
        ("syslog", 5),
        ("lpr", 6),
        ("news", 7),
        ("uucp", 8),
        ("cron", 9),
        ("authpriv", 10),
        ("ftp", 11),
        ("local0", 16),
        ("local1", 17),
        ("local2", 18),
        ("local3", 19),
        ("local4", 20),
        ("local5", 21),
        ("local6", 22),
        ("local7", 23),
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, code)| Facility(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// PRI value for `severity`
    pub fn priority(self, severity: u8) -> u16 {
        u16::from(self.0) * 8 + u16::from(severity)
    }
}

struct SyslogState {
    target: LineTarget,
    alerts: u64,
}

/// Shared output state of one syslog-alert instance
pub struct SyslogAlertContext {
    output: String,
    facility: Facility,
    state: Mutex<SyslogState>,
}

impl SyslogAlertContext {
    pub fn new(output: impl Into<String>, facility: Facility, target: LineTarget) -> Self {
        Self {
            output: output.into(),
            facility,
            state: Mutex::new(SyslogState { target, alerts: 0 }),
        }
    }

    /// Build from an output's params (`facility`, `target`)
    pub fn from_config(config: &OutputConfig) -> Result<Self, ContractError> {
        let facility = match config.param("facility") {
            None => Facility::LOCAL0,
            Some(name) => Facility::from_name(name).unwrap_or_else(|| {
                warn!(
                    output = %config.name,
                    facility = name,
                    "Invalid syslog facility, now using \"local0\""
                );
                Facility::LOCAL0
            }),
        };

        let spec = TargetSpec::from_params(&config.params, TargetSpec::Stderr);
        let target = LineTarget::open(spec)
            .map_err(|e| ContractError::backend_init(&config.name, e.to_string()))?;

        Ok(Self::new(&config.name, facility, target))
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    /// Alerts written by all workers
    pub fn alerts(&self) -> u64 {
        lock(&self.state).alerts
    }

    fn write(&self, lines: &str, count: u64) {
        let mut state = lock(&self.state);
        state.alerts += count;
        if let Err(e) = state.target.write_all(lines.as_bytes()) {
            warn!(output = %self.output, error = %e, "Write failed");
        }
    }
}

impl OutputContext for SyslogAlertContext {
    fn close(&self) {
        let mut state = lock(&self.state);
        if let Err(e) = state.target.flush() {
            warn!(output = %self.output, error = %e, "Flush failed on close");
        }
        info!(
            output = %self.output,
            target = %state.target.spec(),
            alerts = state.alerts,
            "syslog-alert output closed"
        );
    }
}

/// Per-worker state
pub struct SyslogThread {
    shared: SharedContext,
    lines: String,
    alerts: u64,
}

impl SyslogThread {
    /// Alerts this worker has written
    pub fn alerts(&self) -> u64 {
        self.alerts
    }
}

/// Module table entry
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_NAME)
        .with_thread_init(thread_init)
        .with_thread_deinit(thread_deinit)
        .with_exit_stats_print(exit_stats_print)
}

/// Build the shared context and record handler for one output
pub fn open(config: &OutputConfig) -> Result<(RecordHandler, SharedContext), ContractError> {
    let ctx = SyslogAlertContext::from_config(config)?;
    Ok((RecordHandler::alert(log_alerts), SharedContext::new(ctx)))
}

fn thread_init(
    worker: &WorkerInfo,
    shared: &SharedContext,
) -> Result<ThreadContext, ContractError> {
    if shared.downcast_ref::<SyslogAlertContext>().is_none() {
        return Err(ContractError::thread_init(
            MODULE_NAME,
            "shared context is missing or not a syslog-alert output",
        ));
    }
    debug!(worker = %worker, "syslog-alert thread ready");
    Ok(ThreadContext::new(SyslogThread {
        shared: shared.clone(),
        lines: String::new(),
        alerts: 0,
    }))
}

fn thread_deinit(worker: &WorkerInfo, ctx: ThreadContext) {
    if let Some(thread) = ctx.into_inner::<SyslogThread>() {
        debug!(worker = %worker, alerts = thread.alerts, "syslog-alert thread released");
    }
}

fn exit_stats_print(worker: &WorkerInfo, ctx: &ThreadContext) {
    let Some(thread) = ctx.downcast_ref::<SyslogThread>() else {
        return;
    };
    let total = thread
        .shared
        .downcast_ref::<SyslogAlertContext>()
        .map(SyslogAlertContext::alerts)
        .unwrap_or_default();
    info!(worker = %worker, alerts = thread.alerts, total, "({worker}) Alerts {total}");
}

fn log_alerts(ctx: &mut ThreadContext, batch: &AlertBatch) {
    if batch.is_empty() {
        return;
    }
    let Some(thread) = ctx.downcast_mut::<SyslogThread>() else {
        return;
    };
    let Some(shared) = thread.shared.downcast_ref::<SyslogAlertContext>() else {
        return;
    };

    let pri = shared.facility().priority(SEVERITY_ERR);
    thread.lines.clear();
    for alert in &batch.alerts {
        format_alert(&mut thread.lines, pri, alert, &batch.context);
        thread.lines.push('\n');
    }

    let count = batch.len() as u64;
    shared.write(&thread.lines, count);
    thread.alerts += count;
}

/// Render one alert line (without newline)
pub fn format_alert(out: &mut String, pri: u16, alert: &PacketAlert, context: &AlertContext) {
    let _ = write!(
        out,
        "<{pri}>[{}:{}:{}] {} [Classification: {}] [Priority: {}]",
        alert.gid, alert.sid, alert.rev, alert.msg, alert.class_msg, alert.priority
    );
    match context {
        AlertContext::Flow(flow) => format_flow(out, flow),
        AlertContext::Decoder(event) => format_decoder(out, event),
    }
}

fn format_flow(out: &mut String, flow: &FlowAddressing) {
    let _ = match protocol_name(flow.protocol) {
        Some(name) => write!(out, " {{{name}}}"),
        None => write!(out, " {{PROTO:{:03}}}", flow.protocol),
    };
    let _ = write!(
        out,
        " {}:{} -> {}:{}",
        flow.src_ip, flow.src_port, flow.dst_ip, flow.dst_port
    );
}

fn format_decoder(out: &mut String, event: &DecoderEvent) {
    out.push_str(" [**] [Raw pkt:");
    for byte in event.raw.iter().take(RAW_PREVIEW_LEN) {
        let _ = write!(out, " {byte:02X}");
    }
    out.push(']');
    if event.pcap_packet != 0 {
        let _ = write!(out, " [pcap file packet: {}]", event.pcap_packet);
    }
}
