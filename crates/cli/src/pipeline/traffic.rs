//! Synthetic traffic - stands in for the packet-processing pipeline.
//!
//! Each packet worker owns a `TrafficGenerator`; all workers share one
//! `EngineCounters` that the stats worker snapshots.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use contracts::{
    AlertBatch, AlertContext, Bytes, DecoderEvent, FlowAddressing, PacketAlert, StatsSnapshot,
};

/// IP protocols cycled through by generated flows (253 is reserved for testing)
const PROTOCOLS: [u8; 6] = [6, 17, 1, 58, 132, 253];

/// Every Nth packet is a decoder event instead of a flow packet
const DECODER_EVERY: u64 = 97;

const DECODER_RAW_LEN: usize = 48;

/// (sid, msg, classification, priority)
const SIGNATURES: [(u32, &str, &str, u32); 4] = [
    (
        2_100_498,
        "GPL ATTACK_RESPONSE id check returned root",
        "Potentially Bad Traffic",
        2,
    ),
    (
        2_013_028,
        "ET POLICY curl User-Agent Outbound",
        "Attempted Information Leak",
        2,
    ),
    (
        2_024_364,
        "ET SCAN Possible Nmap User-Agent Observed",
        "Web Application Attack",
        1,
    ),
    (
        2_210_044,
        "STREAM Packet with invalid timestamp",
        "Generic Protocol Command Decode",
        3,
    ),
];

/// Per-worker packet source
#[derive(Debug)]
pub struct TrafficGenerator {
    worker: usize,
    alert_every: u64,
    next_packet: u64,
}

impl TrafficGenerator {
    pub fn new(worker: usize, alert_every: u64) -> Self {
        Self {
            worker,
            alert_every: alert_every.max(1),
            next_packet: 1,
        }
    }

    /// Analyze the next packet; the batch may carry no alerts
    pub fn next_batch(&mut self, timestamp: DateTime<Utc>) -> AlertBatch {
        let packet_id = self.next_packet;
        self.next_packet += 1;

        if packet_id % DECODER_EVERY == 0 {
            let raw: Vec<u8> = (0..DECODER_RAW_LEN)
                .map(|i| (packet_id as u8).wrapping_add(i as u8))
                .collect();
            let event = DecoderEvent {
                raw: Bytes::from(raw),
                pcap_packet: 0,
            };
            return AlertBatch::decoder(packet_id, timestamp, event).with_alert(PacketAlert {
                gid: 1,
                sid: 2_200_003,
                rev: 2,
                msg: "DECODER IPv4 packet too small".to_string(),
                class_msg: "Generic Protocol Command Decode".to_string(),
                priority: 3,
            });
        }

        let batch = AlertBatch::flow(packet_id, timestamp, self.addressing(packet_id));
        if packet_id % self.alert_every == 0 {
            batch.with_alert(signature(packet_id))
        } else {
            batch
        }
    }

    fn addressing(&self, packet_id: u64) -> FlowAddressing {
        let protocol = PROTOCOLS[(packet_id % PROTOCOLS.len() as u64) as usize];
        let host = (packet_id % 250) as u8 + 1;
        let (src_ip, dst_ip): (IpAddr, IpAddr) = if protocol == 58 {
            (
                Ipv6Addr::new(0xfd00, 0, 0, self.worker as u16, 0, 0, 0, host as u16).into(),
                Ipv6Addr::new(0xfd00, 0, 0, 0xffff, 0, 0, 0, 1).into(),
            )
        } else {
            (
                Ipv4Addr::new(192, 168, self.worker as u8, host).into(),
                Ipv4Addr::new(10, 0, 0, 5).into(),
            )
        };
        let (src_port, dst_port) = match protocol {
            1 | 58 => (0, 0),
            _ => (1024 + (packet_id % 60_000) as u16, 80),
        };

        FlowAddressing {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            protocol,
        }
    }
}

fn signature(packet_id: u64) -> PacketAlert {
    let (sid, msg, class_msg, priority) =
        SIGNATURES[(packet_id % SIGNATURES.len() as u64) as usize];
    PacketAlert {
        gid: 1,
        sid,
        rev: 7,
        msg: msg.to_string(),
        class_msg: class_msg.to_string(),
        priority,
    }
}

/// Engine-wide decoder and detect counters
#[derive(Debug)]
pub struct EngineCounters {
    started: Instant,
    packets: AtomicU64,
    ipv4: AtomicU64,
    ipv6: AtomicU64,
    decoder_events: AtomicU64,
    alerts: AtomicU64,
    per_worker: Vec<(String, AtomicU64)>,
}

impl EngineCounters {
    /// One packet counter slot per worker name, in order
    pub fn new(workers: impl IntoIterator<Item = String>) -> Self {
        Self {
            started: Instant::now(),
            packets: AtomicU64::new(0),
            ipv4: AtomicU64::new(0),
            ipv6: AtomicU64::new(0),
            decoder_events: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            per_worker: workers
                .into_iter()
                .map(|name| (name, AtomicU64::new(0)))
                .collect(),
        }
    }

    /// Account one analyzed packet for the worker in `slot`
    pub fn observe(&self, slot: usize, batch: &AlertBatch) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        if let Some((_, count)) = self.per_worker.get(slot) {
            count.fetch_add(1, Ordering::Relaxed);
        }
        match &batch.context {
            AlertContext::Flow(flow) if flow.src_ip.is_ipv6() => {
                self.ipv6.fetch_add(1, Ordering::Relaxed);
            }
            AlertContext::Flow(_) => {
                self.ipv4.fetch_add(1, Ordering::Relaxed);
            }
            AlertContext::Decoder(_) => {
                self.decoder_events.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.alerts.fetch_add(batch.len() as u64, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Capture totals followed by per-worker packet counts
    pub fn snapshot(&self, captured_at: DateTime<Utc>) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::from_totals(
            captured_at,
            self.started.elapsed().as_secs(),
            [
                ("decoder.pkts", self.packets()),
                ("decoder.ipv4", self.ipv4.load(Ordering::Relaxed)),
                ("decoder.ipv6", self.ipv6.load(Ordering::Relaxed)),
                ("decoder.event", self.decoder_events.load(Ordering::Relaxed)),
                ("detect.alert", self.alerts.load(Ordering::Relaxed)),
            ],
        );
        for (name, count) in &self.per_worker {
            snapshot.push("decoder.pkts", name.as_str(), count.load(Ordering::Relaxed));
        }
        snapshot
    }
}
