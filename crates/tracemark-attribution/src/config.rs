use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracemark_codec::JsonScheme;
use tracemark_ledger::SyncMode;

use crate::error::AttributionError;

/// Runtime settings for an attribution deployment.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Location of the durable issuance log.
    pub ledger_path: PathBuf,
    pub sync_mode: SyncMode,
    /// Code regenerations allowed per issuance before giving up.
    pub max_code_attempts: u32,
    /// JSON scheme for new issuances. Verification always tries both.
    pub json_scheme: JsonScheme,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("tracemark.ledger"),
            sync_mode: SyncMode::EveryWrite,
            max_code_attempts: 16,
            json_scheme: JsonScheme::Field,
        }
    }
}

impl AttributionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AttributionError> {
        let config: Self = toml::from_str(text).map_err(|e| AttributionError::Config(e.to_string()))?;
        if config.max_code_attempts == 0 {
            return Err(AttributionError::Config(
                "max_code_attempts must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, AttributionError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AttributionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = AttributionConfig::default();
        assert_eq!(c.ledger_path, PathBuf::from("tracemark.ledger"));
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.max_code_attempts, 16);
        assert_eq!(c.json_scheme, JsonScheme::Field);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(
            AttributionConfig::from_toml_str("").unwrap(),
            AttributionConfig::default()
        );
    }

    #[test]
    fn partial_toml_overrides() {
        let c = AttributionConfig::from_toml_str(
            r#"
            ledger_path = "/var/lib/tracemark/issued.log"
            sync_mode = "os_default"
            json_scheme = "zero_width"
            "#,
        )
        .unwrap();
        assert_eq!(c.ledger_path, PathBuf::from("/var/lib/tracemark/issued.log"));
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
        assert_eq!(c.json_scheme, JsonScheme::ZeroWidth);
        assert_eq!(c.max_code_attempts, 16);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AttributionConfig::from_toml_str("max_code_attempts = 0"),
            Err(AttributionError::Config(_))
        ));
        assert!(matches!(
            AttributionConfig::from_toml_str("json_scheme = \"emoji\""),
            Err(AttributionError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracemark.toml");
        fs::write(&path, "max_code_attempts = 3\n").unwrap();
        assert_eq!(AttributionConfig::load(&path).unwrap().max_code_attempts, 3);
        assert!(AttributionConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
