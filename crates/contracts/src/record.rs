//! Records - Dispatch Engine payloads
//!
//! The two record kinds routed to output backends.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Scope label used for process-wide counters
pub const TOTAL_SCOPE: &str = "Total";

/// Record kind, fixed per registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Alert,
    Stats,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Stats => write!(f, "stats"),
        }
    }
}

/// One signature match on a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketAlert {
    /// Generator id
    pub gid: u32,

    /// Signature id
    pub sid: u32,

    /// Signature revision
    pub rev: u32,

    /// Signature message
    pub msg: String,

    /// Classification text
    pub class_msg: String,

    /// Numeric priority (1 = highest)
    pub priority: u32,
}

/// Addressing of an IP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAddressing {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,

    /// IP protocol number (IPv4 proto / IPv6 L4 next header)
    pub protocol: u8,
}

/// Raw context of a decoder-level event (no usable addressing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderEvent {
    /// Raw packet bytes
    pub raw: Bytes,

    /// Packet number within a pcap file, 0 for live capture
    pub pcap_packet: u64,
}

/// Packet context the alerts refer to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertContext {
    Flow(FlowAddressing),
    Decoder(DecoderEvent),
}

/// Alerts attached to one analyzed packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertBatch {
    /// Packet sequence number on the producing worker
    pub packet_id: u64,

    /// Packet timestamp
    pub timestamp: DateTime<Utc>,

    /// Addressing or raw-bytes context
    pub context: AlertContext,

    /// Zero or more alerts
    pub alerts: Vec<PacketAlert>,
}

impl AlertBatch {
    /// Create an empty batch for a flow packet
    pub fn flow(packet_id: u64, timestamp: DateTime<Utc>, addressing: FlowAddressing) -> Self {
        Self {
            packet_id,
            timestamp,
            context: AlertContext::Flow(addressing),
            alerts: Vec::new(),
        }
    }

    /// Create an empty batch for a decoder event
    pub fn decoder(packet_id: u64, timestamp: DateTime<Utc>, event: DecoderEvent) -> Self {
        Self {
            packet_id,
            timestamp,
            context: AlertContext::Decoder(event),
            alerts: Vec::new(),
        }
    }

    /// Append an alert
    pub fn with_alert(mut self, alert: PacketAlert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }
}

/// One named counter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounter {
    /// Counter name (e.g. "decoder.pkts")
    pub name: String,

    /// Owning thread name, or `TOTAL_SCOPE`
    pub scope: String,

    pub value: u64,
}

/// Counter table captured at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Capture time
    pub captured_at: DateTime<Utc>,

    /// Engine uptime at capture (seconds)
    pub uptime_secs: u64,

    /// Counters in capture order
    pub counters: Vec<StatsCounter>,
}

impl StatsSnapshot {
    /// Create an empty snapshot
    pub fn new(captured_at: DateTime<Utc>, uptime_secs: u64) -> Self {
        Self {
            captured_at,
            uptime_secs,
            counters: Vec::new(),
        }
    }

    /// Build a snapshot of process-wide counters
    pub fn from_totals<I, S>(captured_at: DateTime<Utc>, uptime_secs: u64, totals: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut snapshot = Self::new(captured_at, uptime_secs);
        for (name, value) in totals {
            snapshot.push(name, TOTAL_SCOPE, value);
        }
        snapshot
    }

    /// Append a counter
    pub fn push(&mut self, name: impl Into<String>, scope: impl Into<String>, value: u64) {
        self.counters.push(StatsCounter {
            name: name.into(),
            scope: scope.into(),
            value,
        });
    }

    /// Look up a process-wide counter
    pub fn total(&self, name: &str) -> Option<u64> {
        self.counters
            .iter()
            .find(|c| c.name == name && c.scope == TOTAL_SCOPE)
            .map(|c| c.value)
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Owned record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    Alert(AlertBatch),
    Stats(StatsSnapshot),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Alert(_) => RecordKind::Alert,
            Self::Stats(_) => RecordKind::Stats,
        }
    }
}

/// Borrowed record, as handed to the Dispatch Engine
#[derive(Debug, Clone, Copy)]
pub enum RecordRef<'a> {
    Alert(&'a AlertBatch),
    Stats(&'a StatsSnapshot),
}

impl RecordRef<'_> {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Alert(_) => RecordKind::Alert,
            Self::Stats(_) => RecordKind::Stats,
        }
    }
}

impl<'a> From<&'a AlertBatch> for RecordRef<'a> {
    fn from(batch: &'a AlertBatch) -> Self {
        Self::Alert(batch)
    }
}

impl<'a> From<&'a StatsSnapshot> for RecordRef<'a> {
    fn from(snapshot: &'a StatsSnapshot) -> Self {
        Self::Stats(snapshot)
    }
}

impl<'a> From<&'a Record> for RecordRef<'a> {
    fn from(record: &'a Record) -> Self {
        match record {
            Record::Alert(batch) => Self::Alert(batch),
            Record::Stats(snapshot) => Self::Stats(snapshot),
        }
    }
}
