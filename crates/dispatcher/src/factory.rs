//! Factory - blueprint outputs to logger registrations

use contracts::{ContractError, OutputConfig, RecordHandler, SharedContext};
use tracing::{debug, info, instrument};

use crate::backends::{json, stats_table, syslog};
use crate::error::DispatchError;
use crate::registry::RegistryBuilder;

/// Register every enabled output, in blueprint order
///
/// Returns the number of registrations added. Any failure is a fatal
/// startup error naming the output.
#[instrument(
    name = "dispatcher_register_outputs",
    skip(builder, outputs),
    fields(outputs = outputs.len())
)]
pub fn register_outputs(
    builder: &mut RegistryBuilder,
    outputs: &[OutputConfig],
) -> Result<usize, DispatchError> {
    let mut registered = 0;
    for output in outputs {
        if !output.enabled {
            debug!(output = %output.name, "Output disabled, skipped");
            continue;
        }
        register_output(builder, output)?;
        registered += 1;
    }
    info!(registered, "Outputs registered");
    Ok(registered)
}

/// Register one output regardless of its `enabled` flag
#[instrument(
    name = "dispatcher_register_output",
    skip(builder, output),
    fields(output = %output.name, module = %output.module)
)]
pub fn register_output(
    builder: &mut RegistryBuilder,
    output: &OutputConfig,
) -> Result<(), DispatchError> {
    if builder.module_table().resolve(&output.module).is_none() {
        return Err(DispatchError::resolution(&output.name, &output.module));
    }

    let (handler, shared) =
        open_backend(output).map_err(|e| DispatchError::backend(&output.name, e))?;
    builder.register_as(&output.name, &output.module, handler, shared)
}

fn open_backend(output: &OutputConfig) -> Result<(RecordHandler, SharedContext), ContractError> {
    match output.module.as_str() {
        syslog::MODULE_NAME => syslog::open(output),
        json::MODULE_NAME => json::open(output),
        stats_table::MODULE_NAME => stats_table::open(output),
        other => Err(ContractError::backend_init(
            &output.name,
            format!("module '{other}' has no built-in backend"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_table::ModuleTable;
    use contracts::ModuleDescriptor;
    use std::sync::Arc;

    fn output(name: &str, module: &str, dir: &tempfile::TempDir) -> OutputConfig {
        OutputConfig::new(name, module).with_param(
            "target",
            dir.path().join(format!("{name}.log")).to_string_lossy(),
        )
    }

    #[test]
    fn test_registers_enabled_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut disabled = output("eve", "json-alert", &dir);
        disabled.enabled = false;
        let outputs = vec![
            output("stats", "stats-table", &dir),
            disabled,
            output("syslog", "syslog-alert", &dir),
        ];

        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        assert_eq!(register_outputs(&mut builder, &outputs).unwrap(), 2);

        let registry = builder.freeze();
        assert_eq!(
            registry.labels().collect::<Vec<_>>(),
            vec!["stats", "syslog"]
        );
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["stats-table", "syslog-alert"]
        );
    }

    #[test]
    fn test_unknown_module_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));

        let err = register_outputs(&mut builder, &[output("x", "pcap-log", &dir)]).unwrap_err();
        assert!(matches!(err, DispatchError::Resolution { .. }));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_module_without_backend_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = ModuleTable::builtin();
        table.register(ModuleDescriptor::new("custom")).unwrap();
        let mut builder = RegistryBuilder::new(Arc::new(table));

        let err = register_output(&mut builder, &output("c", "custom", &dir)).unwrap_err();
        assert!(matches!(err, DispatchError::Backend { ref output, .. } if output == "c"));
    }

    #[test]
    fn test_bad_params_name_the_output() {
        let mut builder = RegistryBuilder::new(Arc::new(ModuleTable::builtin()));
        let bad = OutputConfig::new("table", "stats-table").with_param("totals", "maybe");

        let err = register_output(&mut builder, &bad).unwrap_err();
        assert!(err.to_string().contains("'table'"));
        assert!(err.is_fatal());
    }
}
