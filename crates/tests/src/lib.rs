//! # Integration Tests
//!
//! Cross-crate tests of the output dispatch core.
//!
//! Covers:
//! - registry / dispatch store properties
//! - startup and worker scenarios against custom and built-in modules
//! - config file to output files, end to end

/// Test modules that journal every lifecycle call
#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{ContractError, ModuleDescriptor, RecordHandler, ThreadContext};
    use dispatcher::ModuleTable;

    pub type Journal = Arc<Mutex<Vec<String>>>;

    /// Per-worker state of a probe module
    pub struct ProbeThread {
        pub module: &'static str,
        pub worker: String,
        pub records: u64,
    }

    /// Module whose thread-init tags the context with the module name
    ///
    /// Thread-init fails for the worker named `fail_for`, if any.
    pub fn probe_module(
        name: &'static str,
        journal: &Journal,
        deinits: &Arc<AtomicUsize>,
        fail_for: Option<&'static str>,
    ) -> ModuleDescriptor {
        let exit_log = Arc::clone(journal);
        let deinits = Arc::clone(deinits);
        ModuleDescriptor::new(name)
            .with_thread_init(move |worker, _| {
                if fail_for == Some(worker.name.as_str()) {
                    return Err(ContractError::thread_init(name, "device unavailable"));
                }
                Ok(ThreadContext::new(ProbeThread {
                    module: name,
                    worker: worker.name.clone(),
                    records: 0,
                }))
            })
            .with_thread_deinit(move |_, ctx| {
                if ctx.into_inner::<ProbeThread>().is_some() {
                    deinits.fetch_add(1, Ordering::SeqCst);
                }
            })
            .with_exit_stats_print(move |worker, ctx| {
                if let Some(thread) = ctx.downcast_ref::<ProbeThread>() {
                    exit_log
                        .lock()
                        .unwrap()
                        .push(format!("{} {worker} {}", thread.module, thread.records));
                }
            })
    }

    /// Alert handler journaling `label worker packet_id`
    pub fn alert_probe(label: &'static str, journal: &Journal) -> RecordHandler {
        let journal = Arc::clone(journal);
        RecordHandler::alert(move |ctx, batch| {
            if let Some(thread) = ctx.downcast_mut::<ProbeThread>() {
                thread.records += 1;
                journal
                    .lock()
                    .unwrap()
                    .push(format!("{label} {} {}", thread.worker, batch.packet_id));
            }
        })
    }

    /// Stats handler journaling `label worker snapshot`
    pub fn stats_probe(label: &'static str, journal: &Journal) -> RecordHandler {
        let journal = Arc::clone(journal);
        RecordHandler::stats(move |ctx, _| {
            if let Some(thread) = ctx.downcast_mut::<ProbeThread>() {
                thread.records += 1;
                journal
                    .lock()
                    .unwrap()
                    .push(format!("{label} {} snapshot", thread.worker));
            }
        })
    }

    pub fn probe_table(
        names: &[&'static str],
        journal: &Journal,
        deinits: &Arc<AtomicUsize>,
        fail_for: Option<&'static str>,
    ) -> Arc<ModuleTable> {
        let mut table = ModuleTable::new();
        for &name in names {
            table
                .register(probe_module(name, journal, deinits, fail_for))
                .unwrap();
        }
        Arc::new(table)
    }
}

#[cfg(test)]
mod property_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use contracts::{AlertBatch, DecoderEvent, SharedContext, WorkerInfo};
    use dispatcher::{ModuleTable, RegistryBuilder};

    use super::support::*;

    fn batch(packet_id: u64) -> AlertBatch {
        AlertBatch::decoder(
            packet_id,
            Utc::now(),
            DecoderEvent {
                raw: contracts::Bytes::from_static(&[0x45, 0x00]),
                pcap_packet: 0,
            },
        )
    }

    fn three_loggers(journal: &Journal, deinits: &Arc<AtomicUsize>) -> RegistryBuilder {
        let table = probe_table(&["a", "b", "c"], journal, deinits, None);
        let mut builder = RegistryBuilder::new(table);
        for name in ["a", "b", "c"] {
            builder
                .register(name, alert_probe(name, journal), SharedContext::none())
                .unwrap();
        }
        builder
    }

    #[test]
    fn test_registration_order_is_stable() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let registry = three_loggers(&journal, &deinits).freeze();

        let before: Vec<String> = registry.names().map(str::to_string).collect();
        let mut store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        for id in 0..10 {
            registry.dispatch(&mut store, &batch(id)).unwrap();
        }
        registry.thread_deinit(store).unwrap();

        let after: Vec<String> = registry.names().map(str::to_string).collect();
        assert_eq!(before, vec!["a", "b", "c"]);
        assert_eq!(before, after);
    }

    #[test]
    fn test_store_entry_i_comes_from_registration_i() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let registry = three_loggers(&journal, &deinits).freeze();

        let store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert_eq!(store.len(), registry.len());
        for (i, registration) in registry.entries().iter().enumerate() {
            let thread = store
                .context(i)
                .and_then(|ctx| ctx.downcast_ref::<ProbeThread>())
                .unwrap();
            assert_eq!(thread.module, registration.name());
        }
        registry.thread_deinit(store).unwrap();
    }

    #[test]
    fn test_each_handler_once_in_order() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let registry = three_loggers(&journal, &deinits).freeze();

        let mut store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert_eq!(registry.dispatch(&mut store, &batch(42)).unwrap(), 3);
        registry.thread_deinit(store).unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["a W#01 42", "b W#01 42", "c W#01 42"]
        );
        for (_, metrics) in registry.metrics() {
            assert_eq!(metrics.delivered, 1);
            assert_eq!(metrics.skipped, 0);
        }
    }

    #[test]
    fn test_empty_registry_invokes_nothing() {
        let registry = RegistryBuilder::new(Arc::new(ModuleTable::new())).freeze();

        let mut store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert!(store.is_empty());
        assert_eq!(registry.dispatch(&mut store, &batch(1)).unwrap(), 0);
        registry.exit_report(&store).unwrap();
        registry.thread_deinit(store).unwrap();
    }

    #[test]
    fn test_deinit_once_per_context() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let registry = three_loggers(&journal, &deinits).freeze();

        for (id, name) in [(1, "W#01"), (2, "W#02")] {
            let store = registry.thread_init(WorkerInfo::new(id, name)).unwrap();
            registry.thread_deinit(store).unwrap();
        }

        assert_eq!(deinits.load(Ordering::SeqCst), 6);
        assert!(registry
            .metrics()
            .iter()
            .all(|(_, m)| m.active_threads == 0));
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use contracts::{
        AlertBatch, FlowAddressing, OutputConfig, PacketAlert, SharedContext, StatsSnapshot,
        WorkerInfo,
    };
    use dispatcher::backends::{SyslogThread, TableThread};
    use dispatcher::{factory, DispatchError, DispatchStore, ModuleTable, RegistryBuilder};

    use super::support::*;

    fn flow_batch(packet_id: u64) -> AlertBatch {
        AlertBatch::flow(
            packet_id,
            Utc::now(),
            FlowAddressing {
                src_ip: [192, 168, 1, 10].into(),
                dst_ip: [10, 0, 0, 5].into(),
                src_port: 44_321,
                dst_port: 80,
                protocol: 6,
            },
        )
        .with_alert(PacketAlert {
            gid: 1,
            sid: 2_100_498,
            rev: 7,
            msg: "GPL ATTACK_RESPONSE id check returned root".into(),
            class_msg: "Potentially Bad Traffic".into(),
            priority: 2,
        })
    }

    /// Stats-only and alert-only backends share one registry
    #[test]
    fn test_stats_record_reaches_only_stats_backend() {
        let dir = tempfile::tempdir().unwrap();
        let stats_path = dir.path().join("stats.log");
        let fast_path = dir.path().join("fast.log");

        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        factory::register_outputs(
            &mut builder,
            &[
                OutputConfig::new("stats-table", "stats-table")
                    .with_param("target", stats_path.to_string_lossy()),
                OutputConfig::new("syslog-alert", "syslog-alert")
                    .with_param("target", fast_path.to_string_lossy()),
            ],
        )
        .unwrap();
        let registry = builder.freeze();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["stats-table", "syslog-alert"]
        );

        let mut store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert_eq!(store.len(), 2);
        let table_thread = |store: &DispatchStore| {
            store
                .context(0)
                .and_then(|ctx| ctx.downcast_ref::<TableThread>())
                .map(TableThread::snapshots)
        };
        assert_eq!(table_thread(&store), Some(0));
        let syslog_thread = store
            .context(1)
            .and_then(|ctx| ctx.downcast_ref::<SyslogThread>());
        assert_eq!(syslog_thread.map(SyslogThread::alerts), Some(0));

        let snapshot = StatsSnapshot::from_totals(Utc::now(), 5, [("decoder.pkts", 10u64)]);
        assert_eq!(registry.dispatch(&mut store, &snapshot).unwrap(), 1);
        assert_eq!(table_thread(&store), Some(1));
        registry.exit_report(&store).unwrap();
        registry.thread_deinit(store).unwrap();

        let metrics = registry.metrics();
        assert_eq!((metrics[0].1.delivered, metrics[0].1.skipped), (1, 0));
        assert_eq!((metrics[1].1.delivered, metrics[1].1.skipped), (0, 1));

        assert_eq!(registry.shutdown().unwrap(), 2);
        let table = std::fs::read_to_string(&stats_path).unwrap();
        assert!(table.contains("decoder.pkts"));
        assert_eq!(std::fs::read_to_string(&fast_path).unwrap(), "");
    }

    #[test]
    fn test_no_outputs_configured() {
        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        assert_eq!(factory::register_outputs(&mut builder, &[]).unwrap(), 0);
        let registry = builder.freeze();

        let mut store = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert_eq!(registry.dispatch(&mut store, &flow_batch(1)).unwrap(), 0);
        registry.thread_deinit(store).unwrap();
        assert_eq!(registry.shutdown().unwrap(), 0);
    }

    #[test]
    fn test_unresolved_name_leaves_registry_unchanged() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let mut builder = RegistryBuilder::new(probe_table(&["a"], &journal, &deinits, None));

        builder
            .register("a", alert_probe("a", &journal), SharedContext::none())
            .unwrap();
        let err = builder
            .register(
                "nonexistent",
                alert_probe("nonexistent", &journal),
                SharedContext::none(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Resolution { ref module, .. } if module == "nonexistent"
        ));
        assert!(err.is_fatal());
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.freeze().names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_workers_keep_independent_contexts() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let mut builder = RegistryBuilder::new(probe_table(&["a", "s"], &journal, &deinits, None));
        builder
            .register("a", alert_probe("a", &journal), SharedContext::none())
            .unwrap();
        builder
            .register("s", stats_probe("s", &journal), SharedContext::none())
            .unwrap();
        let registry = builder.freeze();

        std::thread::scope(|scope| {
            for (id, records) in [(1usize, 3u64), (2, 5)] {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    let worker = WorkerInfo::new(id, format!("W#{id:02}"));
                    let mut store = registry.thread_init(worker).unwrap();
                    for packet in 0..records {
                        registry.dispatch(&mut store, &flow_batch(packet)).unwrap();
                    }
                    registry.exit_report(&store).unwrap();
                    registry.thread_deinit(store).unwrap();
                });
            }
        });

        let journal = journal.lock().unwrap();
        assert!(journal.contains(&"a W#01 3".to_string()));
        assert!(journal.contains(&"a W#02 5".to_string()));
        assert!(journal.contains(&"s W#01 0".to_string()));
        assert!(journal.contains(&"s W#02 0".to_string()));
        assert_eq!(deinits.load(Ordering::SeqCst), 4);

        let metrics = registry.metrics();
        assert_eq!(metrics[0].1.delivered, 8);
        assert_eq!(metrics[1].1.skipped, 8);
        drop(journal);
        assert_eq!(registry.shutdown().unwrap(), 2);
    }

    #[test]
    fn test_failing_thread_init_is_fatal_for_that_worker() {
        let journal = Journal::default();
        let deinits = Arc::new(AtomicUsize::new(0));
        let table = probe_table(&["a", "b"], &journal, &deinits, Some("W#02"));
        let mut builder = RegistryBuilder::new(table);
        for name in ["a", "b"] {
            builder
                .register(name, alert_probe(name, &journal), SharedContext::none())
                .unwrap();
        }
        let registry = builder.freeze();

        let healthy = registry.thread_init(WorkerInfo::new(1, "W#01")).unwrap();
        assert_eq!(healthy.len(), 2);

        let err = registry
            .thread_init(WorkerInfo::new(2, "W#02"))
            .unwrap_err();
        assert!(err.is_fatal());
        match err {
            DispatchError::ThreadInit {
                worker,
                logger,
                index,
                ..
            } => {
                assert_eq!(worker, "W#02");
                assert_eq!(logger, "a");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }

        registry.thread_deinit(healthy).unwrap();
        assert_eq!(deinits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shutdown_waits_for_last_holder() {
        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        factory::register_outputs(
            &mut builder,
            &[OutputConfig::new("stats", "stats-table").with_param("target", "stdout")],
        )
        .unwrap();
        let registry = builder.freeze();
        let worker_handle = Arc::clone(&registry);

        let err = registry.shutdown().unwrap_err();
        assert!(matches!(err, DispatchError::RegistryInUse { holders: 1 }));
        assert!(!err.is_fatal());

        assert_eq!(worker_handle.shutdown().unwrap(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;

    use chrono::Utc;
    use contracts::{AlertBatch, FlowAddressing, PacketAlert, StatsSnapshot, WorkerInfo};
    use dispatcher::{factory, ModuleTable, RegistryBuilder};

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let target = |name: &str| dir.join(name).to_string_lossy().into_owned();
        let config = format!(
            r#"
[engine]
workers = 3

[[outputs]]
name = "fast"
module = "syslog-alert"
[outputs.params]
facility = "local3"
target = '{fast}'

[[outputs]]
name = "eve"
module = "json-alert"
[outputs.params]
target = '{eve}'

[[outputs]]
name = "unused"
module = "json-alert"
enabled = false

[[outputs]]
name = "stats"
module = "stats-table"
[outputs.params]
target = '{stats}'
threads = "yes"
"#,
            fast = target("fast.log"),
            eve = target("eve.json"),
            stats = target("stats.log"),
        );
        let path = dir.join("outputs.toml");
        std::fs::write(&path, config).unwrap();
        path
    }

    fn batch(worker: usize, packet_id: u64) -> AlertBatch {
        AlertBatch::flow(
            packet_id,
            Utc::now(),
            FlowAddressing {
                src_ip: [192, 168, worker as u8, 7].into(),
                dst_ip: [10, 0, 0, 5].into(),
                src_port: 40_000,
                dst_port: 443,
                protocol: 17,
            },
        )
        .with_alert(PacketAlert {
            gid: 1,
            sid: 2_013_028,
            rev: 3,
            msg: "ET POLICY curl User-Agent Outbound".into(),
            class_msg: "Attempted Information Leak".into(),
            priority: 2,
        })
    }

    /// Config file -> registry -> three packet workers + stats worker -> files
    #[test]
    fn test_config_to_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint =
            config_loader::ConfigLoader::load_from_path(&write_config(dir.path())).unwrap();

        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        let registered = factory::register_outputs(&mut builder, &blueprint.outputs).unwrap();
        assert_eq!(registered, 3);
        let registry = builder.freeze();
        assert_eq!(
            registry.labels().collect::<Vec<_>>(),
            vec!["fast", "eve", "stats"]
        );

        let workers = blueprint.engine.workers;
        std::thread::scope(|scope| {
            for id in 1..=workers {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    let mut store = registry
                        .thread_init(WorkerInfo::new(id, format!("W#{id:02}")))
                        .unwrap();
                    for packet in 1..=10 {
                        assert_eq!(
                            registry.dispatch(&mut store, &batch(id, packet)).unwrap(),
                            2
                        );
                    }
                    registry.exit_report(&store).unwrap();
                    registry.thread_deinit(store).unwrap();
                });
            }
        });

        let mut stats_store = registry
            .thread_init(WorkerInfo::new(workers + 1, "ST#01"))
            .unwrap();
        let mut snapshot = StatsSnapshot::from_totals(Utc::now(), 3, [("decoder.pkts", 30u64)]);
        snapshot.push("decoder.pkts", "W#01", 10);
        registry.dispatch(&mut stats_store, &snapshot).unwrap();
        registry.thread_deinit(stats_store).unwrap();

        assert_eq!(registry.shutdown().unwrap(), 3);

        let fast = std::fs::read_to_string(dir.path().join("fast.log")).unwrap();
        assert_eq!(fast.lines().count(), 30);
        assert!(fast.lines().all(|line| line.starts_with("<155>[1:2013028:3]")));
        assert!(fast.contains("{UDP} 192.168.2.7:40000 -> 10.0.0.5:443"));

        let eve = std::fs::read_to_string(dir.path().join("eve.json")).unwrap();
        assert_eq!(eve.lines().count(), 30);
        for line in eve.lines() {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(event["event_type"], "alert");
            assert_eq!(event["alert"]["signature_id"], 2_013_028);
        }

        let table = std::fs::read_to_string(dir.path().join("stats.log")).unwrap();
        assert!(table.contains("| Total"));
        assert!(table.contains("| W#01"));
    }
}
