//! Outputs file formats

use std::path::Path;

use contracts::{ContractError, OutputsBlueprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    /// Accepted for configs produced by other tools
    Json,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "{} has no extension; expected .toml or .json",
                path.display()
            ))
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    pub(crate) fn parse(self, content: &str) -> Result<OutputsBlueprint, ContractError> {
        match self {
            Self::Toml => parse_toml(content),
            Self::Json => parse_json(content),
        }
    }
}

fn parse_toml(content: &str) -> Result<OutputsBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("invalid outputs TOML: {e}"),
        source: Some(Box::new(e)),
    })
}

fn parse_json(content: &str) -> Result<OutputsBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("invalid outputs JSON: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[engine]
workers = 4

[[outputs]]
name = "syslog"
module = "syslog-alert"
[outputs.params]
facility = "local1"

[[outputs]]
name = "stats"
module = "stats-table"
enabled = false
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.engine.workers, 4);
        assert_eq!(bp.outputs.len(), 2);
        assert_eq!(bp.outputs[0].param("facility"), Some("local1"));
        assert!(!bp.outputs[1].enabled);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "engine": { "workers": 1, "stats_interval_ms": 250 },
            "outputs": [
                { "name": "eve", "module": "json-alert", "params": { "target": "stdout" } }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().engine.stats_interval_ms, 250);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_missing_module_field() {
        let content = r#"
[[outputs]]
name = "syslog"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
