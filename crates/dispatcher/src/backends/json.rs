//! json-alert - one JSON object per alert, one per line

use std::net::IpAddr;
use std::sync::Mutex;

use contracts::{
    AlertBatch, AlertContext, ContractError, ModuleDescriptor, OutputConfig, OutputContext,
    PacketAlert, RecordHandler, SharedContext, ThreadContext, WorkerInfo,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::protocol_name;
use super::target::{lock, LineTarget, TargetSpec};

/// Module table key
pub const MODULE_NAME: &str = "json-alert";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%z";

#[derive(Debug, Serialize)]
struct AlertEvent<'a> {
    timestamp: String,
    event_type: &'static str,
    packet_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    src_ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    src_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dest_ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dest_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pcap_cnt: Option<u64>,
    alert: AlertBody<'a>,
}

#[derive(Debug, Serialize)]
struct AlertBody<'a> {
    gid: u32,
    signature_id: u32,
    rev: u32,
    signature: &'a str,
    category: &'a str,
    severity: u32,
}

impl<'a> AlertEvent<'a> {
    fn new(batch: &AlertBatch, timestamp: &str, alert: &'a PacketAlert) -> Self {
        let mut event = Self {
            timestamp: timestamp.to_string(),
            event_type: "alert",
            packet_id: batch.packet_id,
            src_ip: None,
            src_port: None,
            dest_ip: None,
            dest_port: None,
            proto: None,
            pcap_cnt: None,
            alert: AlertBody {
                gid: alert.gid,
                signature_id: alert.sid,
                rev: alert.rev,
                signature: &alert.msg,
                category: &alert.class_msg,
                severity: alert.priority,
            },
        };

        match &batch.context {
            AlertContext::Flow(flow) => {
                event.src_ip = Some(flow.src_ip);
                event.src_port = Some(flow.src_port);
                event.dest_ip = Some(flow.dst_ip);
                event.dest_port = Some(flow.dst_port);
                event.proto = Some(match protocol_name(flow.protocol) {
                    Some(name) => name.to_string(),
                    None => flow.protocol.to_string(),
                });
            }
            AlertContext::Decoder(decoder) => {
                event.pcap_cnt = (decoder.pcap_packet != 0).then_some(decoder.pcap_packet);
            }
        }
        event
    }
}

struct JsonState {
    target: LineTarget,
    lines: u64,
}

/// Shared output state of one json-alert instance
pub struct JsonAlertContext {
    output: String,
    state: Mutex<JsonState>,
}

impl JsonAlertContext {
    pub fn new(output: impl Into<String>, target: LineTarget) -> Self {
        Self {
            output: output.into(),
            state: Mutex::new(JsonState { target, lines: 0 }),
        }
    }

    /// Build from an output's params (`target`, default stdout)
    pub fn from_config(config: &OutputConfig) -> Result<Self, ContractError> {
        let spec = TargetSpec::from_params(&config.params, TargetSpec::Stdout);
        let target = LineTarget::open(spec)
            .map_err(|e| ContractError::backend_init(&config.name, e.to_string()))?;
        Ok(Self::new(&config.name, target))
    }

    /// Lines written by all workers
    pub fn lines(&self) -> u64 {
        lock(&self.state).lines
    }

    fn write(&self, buf: &[u8], count: u64) {
        let mut state = lock(&self.state);
        match state.target.write_all(buf) {
            Ok(()) => state.lines += count,
            Err(e) => warn!(output = %self.output, error = %e, "Write failed"),
        }
    }
}

impl OutputContext for JsonAlertContext {
    fn close(&self) {
        let mut state = lock(&self.state);
        if let Err(e) = state.target.flush() {
            warn!(output = %self.output, error = %e, "Flush failed on close");
        }
        info!(output = %self.output, lines = state.lines, "json-alert output closed");
    }
}

/// Per-worker state: a reusable line buffer
struct JsonThread {
    shared: SharedContext,
    buffer: Vec<u8>,
    lines: u64,
}

/// Module table entry
pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_NAME)
        .with_thread_init(thread_init)
        .with_thread_deinit(|worker, ctx| {
            if let Some(thread) = ctx.into_inner::<JsonThread>() {
                debug!(worker = %worker, lines = thread.lines, "json-alert thread released");
            }
        })
        .with_exit_stats_print(|worker, ctx| {
            if let Some(thread) = ctx.downcast_ref::<JsonThread>() {
                info!(worker = %worker, lines = thread.lines, "({worker}) JSON alerts logged");
            }
        })
}

/// Build the shared context and record handler for one output
pub fn open(config: &OutputConfig) -> Result<(RecordHandler, SharedContext), ContractError> {
    let ctx = JsonAlertContext::from_config(config)?;
    Ok((RecordHandler::alert(log_alerts), SharedContext::new(ctx)))
}

fn thread_init(
    _worker: &WorkerInfo,
    shared: &SharedContext,
) -> Result<ThreadContext, ContractError> {
    if shared.downcast_ref::<JsonAlertContext>().is_none() {
        return Err(ContractError::thread_init(
            MODULE_NAME,
            "shared context is missing or not a json-alert output",
        ));
    }
    Ok(ThreadContext::new(JsonThread {
        shared: shared.clone(),
        buffer: Vec::with_capacity(1024),
        lines: 0,
    }))
}

fn log_alerts(ctx: &mut ThreadContext, batch: &AlertBatch) {
    if batch.is_empty() {
        return;
    }
    let Some(thread) = ctx.downcast_mut::<JsonThread>() else {
        return;
    };
    let Some(shared) = thread.shared.downcast_ref::<JsonAlertContext>() else {
        return;
    };

    let timestamp = batch.timestamp.format(TIMESTAMP_FORMAT).to_string();
    thread.buffer.clear();
    let mut count = 0;
    for alert in &batch.alerts {
        let event = AlertEvent::new(batch, &timestamp, alert);
        match serde_json::to_writer(&mut thread.buffer, &event) {
            Ok(()) => {
                thread.buffer.push(b'\n');
                count += 1;
            }
            Err(e) => warn!(error = %e, sid = alert.sid, "Alert serialization failed"),
        }
    }

    shared.write(&thread.buffer, count);
    thread.lines += count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{DecoderEvent, FlowAddressing};
    use std::net::Ipv4Addr;

    fn alert(sid: u32) -> PacketAlert {
        PacketAlert {
            gid: 1,
            sid,
            rev: 1,
            msg: "ET POLICY curl User-Agent".into(),
            class_msg: "Attempted Information Leak".into(),
            priority: 2,
        }
    }

    #[test]
    fn test_flow_event_shape() {
        let batch = AlertBatch::flow(
            42,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            FlowAddressing {
                src_ip: Ipv4Addr::new(10, 0, 0, 1).into(),
                dst_ip: Ipv4Addr::new(10, 0, 0, 2).into(),
                src_port: 5555,
                dst_port: 443,
                protocol: 6,
            },
        )
        .with_alert(alert(2013028));

        let event = AlertEvent::new(&batch, "ts", &batch.alerts[0]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "alert");
        assert_eq!(value["src_ip"], "10.0.0.1");
        assert_eq!(value["dest_port"], 443);
        assert_eq!(value["proto"], "TCP");
        assert_eq!(value["alert"]["signature_id"], 2013028);
        assert!(value.get("pcap_cnt").is_none());
    }

    #[test]
    fn test_decoder_event_has_no_addressing() {
        let batch = AlertBatch::decoder(
            1,
            Utc::now(),
            DecoderEvent {
                raw: contracts::Bytes::from_static(&[1, 2, 3]),
                pcap_packet: 9,
            },
        )
        .with_alert(alert(2200003));

        let event = AlertEvent::new(&batch, "ts", &batch.alerts[0]);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("src_ip").is_none());
        assert_eq!(value["pcap_cnt"], 9);
    }

    #[test]
    fn test_handler_writes_one_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eve.json");
        let config =
            OutputConfig::new("eve", MODULE_NAME).with_param("target", path.to_string_lossy());
        let (handler, shared) = open(&config).unwrap();

        let mut ctx = thread_init(&WorkerInfo::new(0, "W#00"), &shared).unwrap();
        let batch = AlertBatch::decoder(
            3,
            Utc::now(),
            DecoderEvent {
                raw: contracts::Bytes::new(),
                pcap_packet: 0,
            },
        )
        .with_alert(alert(1))
        .with_alert(alert(2));
        handler.deliver(&mut ctx, (&batch).into());
        shared.close();

        let written = std::fs::read_to_string(&path).unwrap();
        let sids: Vec<u64> = written
            .lines()
            .map(|line| {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                v["alert"]["signature_id"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(sids, vec![1, 2]);
        assert_eq!(
            shared.downcast_ref::<JsonAlertContext>().unwrap().lines(),
            2
        );
        assert_eq!(ctx.downcast_ref::<JsonThread>().unwrap().lines, 2);
    }
}
