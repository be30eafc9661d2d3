//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::OutputsBlueprint;
use dispatcher::ModuleTable;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    engine: EngineInfo,
    outputs: Vec<OutputInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    modules: Vec<ModuleInfo>,
}

#[derive(Serialize)]
struct EngineInfo {
    workers: usize,
    stats_interval_ms: u64,
}

#[derive(Serialize)]
struct OutputInfo {
    name: String,
    module: String,
    enabled: bool,
    resolved: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ModuleInfo {
    name: String,
    thread_init: bool,
    thread_deinit: bool,
    exit_stats_print: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let modules = ModuleTable::builtin();

    let info = build_config_info(&blueprint, &modules, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(
    blueprint: &OutputsBlueprint,
    modules: &ModuleTable,
    args: &InfoArgs,
) -> ConfigInfo {
    let outputs = blueprint
        .outputs
        .iter()
        .map(|o| OutputInfo {
            name: o.name.clone(),
            module: o.module.clone(),
            enabled: o.enabled,
            resolved: modules.resolve(&o.module).is_some(),
            params: if args.params {
                o.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    let modules = if args.modules {
        modules
            .descriptors()
            .map(|m| ModuleInfo {
                name: m.name().to_string(),
                thread_init: m.thread_init().is_some(),
                thread_deinit: m.thread_deinit().is_some(),
                exit_stats_print: m.exit_stats_print().is_some(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        engine: EngineInfo {
            workers: blueprint.engine.workers,
            stats_interval_ms: blueprint.engine.stats_interval_ms,
        },
        outputs,
        modules,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               packet-outputd Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Engine");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Packet workers: {}", info.engine.workers);
    println!("   └─ Stats interval: {} ms", info.engine.stats_interval_ms);

    println!("\n📤 Outputs ({})", info.outputs.len());
    for (i, output) in info.outputs.iter().enumerate() {
        let is_last = i == info.outputs.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let mut flags = Vec::new();
        if !output.enabled {
            flags.push("disabled");
        }
        if !output.resolved {
            flags.push("unknown module");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("   {} {} ({}){}", prefix, output.name, output.module, flags);

        for (j, (key, value)) in output.params.iter().enumerate() {
            let param_prefix = if j == output.params.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
        }
    }

    if !info.modules.is_empty() {
        println!("\n🧩 Module Table ({})", info.modules.len());
        for (i, module) in info.modules.iter().enumerate() {
            let prefix = if i == info.modules.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            let hooks: Vec<&str> = [
                (module.thread_init, "thread-init"),
                (module.thread_deinit, "thread-deinit"),
                (module.exit_stats_print, "exit-stats"),
            ]
            .into_iter()
            .filter_map(|(present, hook)| present.then_some(hook))
            .collect();
            println!("   {} {} [{}]", prefix, module.name, hooks.join(", "));
        }
    }

    println!();
}
