//! Output configuration for `packet-outputd`
//!
//! Reads an outputs file (TOML, or JSON for generated configs) into an
//! [`OutputsBlueprint`] and checks it before any backend is opened. The
//! blueprint only names modules; whether a name exists in the module table
//! is decided at registration.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("outputs.toml"))?;
//! for output in blueprint.enabled_outputs() {
//!     println!("{} -> {}", output.name, output.module);
//! }
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod parser;
mod validator;

pub use contracts::OutputsBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and check an outputs file; the extension picks the format
    pub fn load_from_path(path: &Path) -> Result<OutputsBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<OutputsBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &OutputsBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| {
                ContractError::config_parse(format!("cannot write outputs as TOML: {e}"))
            })
    }

    pub fn to_json(blueprint: &OutputsBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| {
                ContractError::config_parse(format!("cannot write outputs as JSON: {e}"))
            })
    }
}
