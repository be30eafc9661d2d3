//! Configuration validation
//!
//! Rules:
//! - field-level rules declared on the blueprint types (non-empty names, ranges)
//! - output names unique
//!
//! Module keys are not checked here; an unknown module is a registration error.

use std::collections::HashSet;

use contracts::{ContractError, OutputsBlueprint};
use ::validator::Validate;

/// Validate an OutputsBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &OutputsBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_output_names(blueprint)?;
    Ok(())
}

/// Run the declarative field rules
fn validate_fields(blueprint: &OutputsBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Output names must be unique
fn validate_output_names(blueprint: &OutputsBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, output) in blueprint.outputs.iter().enumerate() {
        if !seen.insert(output.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("outputs[{}].name", idx),
                format!("duplicate output name '{}'", output.name),
            ));
        }
    }
    Ok(())
}
