//! Configuration management for the CLI

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sweep_lib::PipelineConfig;

/// Operator defaults stored in `~/.config/cloud-sweep/settings.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Profile used when `--profile` is not given
    pub default_profile: Option<String>,
    /// Resource kind used when `--kind` is not given
    pub default_kind: Option<String>,
    /// Output format used when `--format` is not given
    pub default_format: Option<String>,
}

impl Settings {
    /// Load settings, falling back to defaults when the file is absent
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join("settings.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read settings file")?;

        serde_json::from_str(&content).context("Failed to parse settings file")
    }
}

/// `~/.config/cloud-sweep`
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("cloud-sweep"))
}

/// Account document for a profile, unless an explicit file overrides it
pub fn account_document_path(profile: Option<&str>, override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    let name = profile.unwrap_or("default");
    Ok(config_dir()?.join("accounts").join(format!("{}.json", name)))
}

/// Pipeline tunables from the optional config file and `SWEEP_*` variables
pub fn load_pipeline_config() -> Result<PipelineConfig> {
    load_pipeline_config_from(&config_dir()?.join("config.json"))
}

pub fn load_pipeline_config_from(path: &Path) -> Result<PipelineConfig> {
    let config = config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Json).required(false))
        .add_source(
            Environment::with_prefix("SWEEP")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("candidate_regions"),
        )
        .build()
        .context("Failed to load pipeline configuration")?;

    config
        .try_deserialize()
        .context("Invalid pipeline configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_settings_file_is_default() {
        let settings = Settings::load_from(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "default_profile": "staging", "default_kind": "db-instance" }"#)
            .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.default_profile.as_deref(), Some("staging"));
        assert_eq!(settings.default_kind.as_deref(), Some("db-instance"));
        assert_eq!(settings.default_format, None);
    }

    #[test]
    fn test_account_document_path() {
        let explicit = account_document_path(Some("dev"), Some(Path::new("/tmp/account.json"))).unwrap();
        assert_eq!(explicit, PathBuf::from("/tmp/account.json"));

        let by_profile = account_document_path(Some("dev"), None).unwrap();
        assert!(by_profile.ends_with("cloud-sweep/accounts/dev.json"));

        let fallback = account_document_path(None, None).unwrap();
        assert!(fallback.ends_with("cloud-sweep/accounts/default.json"));
    }

    #[test]
    fn test_pipeline_config_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "deletion_delay": 1, "candidate_regions": ["eu-west-1"] }"#)
            .unwrap();

        let config = load_pipeline_config_from(file.path()).unwrap();
        assert_eq!(config.deletion_delay, Duration::from_secs(1));
        assert_eq!(config.candidate_regions, Some(vec!["eu-west-1".to_string()]));
        assert_eq!(config.max_delete_attempts, 3);
    }

    #[test]
    fn test_pipeline_config_rejects_unrepresentable_delay() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "deletion_delay": 1e30 }"#).unwrap();

        let err = load_pipeline_config_from(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid pipeline configuration"));
    }
}
