//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::OutputsBlueprint;
use dispatcher::ModuleTable;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    version: String,
    workers: usize,
    stats_interval_ms: u64,
    output_count: usize,
    enabled_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint, &ModuleTable::builtin());

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    workers: blueprint.engine.workers,
                    stats_interval_ms: blueprint.engine.stats_interval_ms,
                    output_count: blueprint.outputs.len(),
                    enabled_count: blueprint.enabled_outputs().count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
///
/// An unknown module is only a warning here; `run` refuses to start on it.
fn collect_warnings(blueprint: &OutputsBlueprint, modules: &ModuleTable) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.outputs.is_empty() {
        warnings.push("No outputs configured - records will not be written anywhere".to_string());
    }

    for output in &blueprint.outputs {
        if !output.enabled {
            warnings.push(format!("Output '{}' is disabled", output.name));
        }
        if modules.resolve(&output.module).is_none() {
            warnings.push(format!(
                "Output '{}' names unknown module '{}' (known: {})",
                output.name,
                output.module,
                modules.names().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Packet workers: {}", summary.workers);
            println!("  Stats interval: {} ms", summary.stats_interval_ms);
            println!(
                "  Outputs: {} ({} enabled)",
                summary.output_count, summary.enabled_count
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
