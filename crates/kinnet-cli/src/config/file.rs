use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileThresholdConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barrier_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imaginary_threshold: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_families: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_product_redirects: Option<usize>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRefinementConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_level: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conformer_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conformer_seed: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_intermediate_files: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simultaneous_jobs: Option<usize>,
}

/// The configuration file. Every value is optional; missing values fall back
/// to the built-in defaults.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<FileThresholdConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<FileSearchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<FileRefinementConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<FileRunConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
